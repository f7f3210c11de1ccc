//! Package archive creation.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::Builder;

use crate::core::manifest::MANIFEST_NAME;
use crate::util::fs::{ensure_dir, sanitize_file_name};

/// Where builds leave the Wasm binary, relative to the project root.
pub const WASM_BINARY_PATH: &str = "bin/main.wasm";

/// Directory that holds package archives, relative to the project root.
pub const PACKAGE_DIR: &str = "pkg";

/// Default archive path for a package name: `<root>/pkg/<sanitized>.tar.gz`.
pub fn package_path(project_root: &Path, name: &str) -> PathBuf {
    project_root
        .join(PACKAGE_DIR)
        .join(format!("{}.tar.gz", sanitize_file_name(name)))
}

/// Write `pkg/<name>.tar.gz` holding the manifest and the Wasm binary.
///
/// Members are stored under a top-level directory named after the package:
/// `<name>/fastedge.toml` and `<name>/bin/main.wasm`.
pub fn write_package(project_root: &Path, name: &str) -> Result<PathBuf> {
    let manifest = project_root.join(MANIFEST_NAME);
    let wasm = project_root.join(WASM_BINARY_PATH);
    for required in [&manifest, &wasm] {
        if !required.is_file() {
            bail!("cannot package missing file: {}", required.display());
        }
    }

    let dest = package_path(project_root, name);
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    let file = File::create(&dest)
        .with_context(|| format!("failed to create package: {}", dest.display()))?;
    let mut archive = Builder::new(GzEncoder::new(file, Compression::default()));

    let root_dir = sanitize_file_name(name);
    archive
        .append_path_with_name(&manifest, format!("{}/{}", root_dir, MANIFEST_NAME))
        .with_context(|| format!("failed to add {} to package", manifest.display()))?;
    archive
        .append_path_with_name(&wasm, format!("{}/{}", root_dir, WASM_BINARY_PATH))
        .with_context(|| format!("failed to add {} to package", wasm.display()))?;

    archive
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("failed to finish package: {}", dest.display()))?;

    tracing::debug!(path = %dest.display(), "wrote package");
    Ok(dest)
}
