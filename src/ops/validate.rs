//! Package validation and fingerprinting.
//!
//! A package is deployable when it exists, is no larger than
//! [`PACKAGE_SIZE_LIMIT`] and is a readable gzip-compressed tarball. Its
//! fingerprint is a SHA-512 over the contents of the manifest and Wasm
//! members only, so it ignores archive metadata and member order.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::builder::package::package_path;
use crate::core::errors::{Error, Result};
use crate::core::manifest::{ManifestData, ManifestFile, Source, MANIFEST_NAME};
use crate::util::archive::{extract_tarball, for_each_member};
use crate::util::fs::find_file_named;
use crate::util::hash::Fingerprint;

/// Largest accepted package, in bytes.
pub const PACKAGE_SIZE_LIMIT: u64 = 50_000_000;

/// Archive members that contribute to the fingerprint.
const FINGERPRINTED_MEMBERS: [&str; 2] = [MANIFEST_NAME, "main.wasm"];

/// A package that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPackage {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Hex SHA-512 over the fingerprinted members.
    pub fingerprint: String,
    /// The manifest was read from inside the archive.
    pub manifest_from_archive: bool,
}

/// Validate the package for a project, or the archive at `explicit_path`.
///
/// When the project manifest can't be read but an archive was given, the
/// manifest inside the archive is loaded into `manifest` instead.
pub fn validate_package(
    project_root: &Path,
    manifest: &mut ManifestData,
    explicit_path: Option<&Path>,
) -> Result<ValidatedPackage> {
    let mut manifest_from_archive = false;
    if let Some(failure) = manifest.read_failure() {
        let Some(archive) = explicit_path else {
            return Err(failure);
        };
        tracing::debug!("project manifest unusable ({}), reading it from the archive", failure);
        read_manifest_from_archive(manifest, archive)?;
        manifest_from_archive = true;
        tracing::info!(package_path = %archive.display(), "using {} within package archive", MANIFEST_NAME);
    }

    let (name, source) = manifest.name();
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None if source == Source::Undefined => {
            return Err(Error::ManifestUnreadable {
                path: manifest.path().to_path_buf(),
                reason: "package name is not set".to_string(),
            })
        }
        None => package_path(project_root, &name),
    };

    let size = match std::fs::metadata(&path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::PackageNotFound { path })
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read package: {}", path.display()))
                .into())
        }
    };
    check_size(size, PACKAGE_SIZE_LIMIT)?;

    let fingerprint = fingerprint_package(&path)?;
    tracing::debug!(package_path = %path.display(), size, %fingerprint, "validated package");

    Ok(ValidatedPackage {
        name,
        path,
        size,
        fingerprint,
        manifest_from_archive,
    })
}

/// Reject packages larger than `limit` bytes.
pub fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(Error::PackageTooLarge { size, limit });
    }
    Ok(())
}

/// Stream a package and fingerprint its manifest and Wasm members.
pub fn fingerprint_package(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open package: {}", path.display()))?;

    let mut fingerprint = Fingerprint::new();
    for_each_member(file, |name, reader| {
        if !FINGERPRINTED_MEMBERS.contains(&name) {
            return Ok(());
        }
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .with_context(|| format!("error reading {}", name))?;
        fingerprint.append(name, &buf);
        Ok(())
    })
    .with_context(|| format!("error validating package: {}", path.display()))?;

    Ok(fingerprint.finish())
}

fn read_manifest_from_archive(manifest: &mut ManifestData, archive: &Path) -> Result<()> {
    let file = match File::open(archive) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::PackageNotFound {
                path: archive.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to open package: {}", archive.display()))
                .into())
        }
    };

    let scratch = tempfile::Builder::new()
        .prefix("fastedge-package-")
        .tempdir()
        .context("failed to create scratch directory")?;
    extract_tarball(file, scratch.path())
        .with_context(|| format!("error extracting package '{}'", archive.display()))?;

    let found = find_file_named(scratch.path(), MANIFEST_NAME)?.ok_or_else(|| {
        Error::ManifestUnreadable {
            path: archive.to_path_buf(),
            reason: format!("no {} within the package archive", MANIFEST_NAME),
        }
    })?;

    let file = ManifestFile::load(&found)?;
    manifest.replace_file(file, archive.to_path_buf());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::test_support::fixtures::{write_project, TarballBuilder};
    use sha2::{Digest, Sha512};
    use tempfile::TempDir;

    const MANIFEST: &str = "name = \"edge-app\"\nlanguage = \"rust\"\n";

    fn write_archive(path: &Path, data: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    #[test]
    fn test_fingerprint_covers_tracked_members_only() {
        let tmp = TempDir::new().unwrap();
        let root = write_project(tmp.path(), MANIFEST);
        let archive = TarballBuilder::new()
            .dir("edge-app/")
            .file("edge-app/fastedge.toml", MANIFEST.as_bytes())
            .file("edge-app/bin/main.wasm", b"\0asm")
            .file("edge-app/README.md", b"ignored")
            .finish();
        write_archive(&root.join("pkg/edge-app.tar.gz"), &archive);

        let mut manifest = ManifestData::load(&root);
        let pkg = validate_package(&root, &mut manifest, None).unwrap();

        let mut expected = Sha512::new();
        expected.update(MANIFEST.as_bytes());
        expected.update(b"\0asm");
        assert_eq!(pkg.fingerprint, hex::encode(expected.finalize()));
        assert_eq!(pkg.name, "edge-app");
        assert_eq!(pkg.path, root.join("pkg/edge-app.tar.gz"));
        assert_eq!(pkg.size, archive.len() as u64);
        assert!(!pkg.manifest_from_archive);
    }

    #[test]
    fn test_fingerprint_ignores_member_order_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.tar.gz");
        let b = tmp.path().join("b.tar.gz");
        write_archive(
            &a,
            &TarballBuilder::new()
                .file("app/fastedge.toml", b"name = \"x\"")
                .file("app/bin/main.wasm", b"\0asm")
                .finish(),
        );
        write_archive(
            &b,
            &TarballBuilder::new()
                .mtime(1_700_000_000)
                .mode(0o600)
                .file("other/bin/main.wasm", b"\0asm")
                .file("other/fastedge.toml", b"name = \"x\"")
                .finish(),
        );

        assert_eq!(
            fingerprint_package(&a).unwrap(),
            fingerprint_package(&b).unwrap()
        );
    }

    #[test]
    fn test_missing_manifest_without_package() {
        let tmp = TempDir::new().unwrap();
        let mut manifest = ManifestData::load(tmp.path());
        let err = validate_package(tmp.path(), &mut manifest, None).unwrap_err();
        assert!(matches!(err, Error::ManifestUnreadable { .. }));
        assert_eq!(err.to_string(), "error reading package manifest");
    }

    #[test]
    fn test_manifest_read_from_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("elsewhere/package.tar.gz");
        write_archive(
            &archive,
            &TarballBuilder::new()
                .dir("deep/")
                .dir("deep/nested/")
                .file("deep/nested/fastedge.toml", MANIFEST.as_bytes())
                .file("deep/nested/bin/main.wasm", b"\0asm")
                .finish(),
        );

        let project = tmp.path().join("empty");
        std::fs::create_dir_all(&project).unwrap();
        let mut manifest = ManifestData::load(&project);
        let pkg = validate_package(&project, &mut manifest, Some(&archive)).unwrap();

        assert!(pkg.manifest_from_archive);
        assert_eq!(pkg.name, "edge-app");
        assert_eq!(pkg.path, archive);
        assert_eq!(manifest.file.language, "rust");
        assert!(manifest.read_error().is_none());
    }

    #[test]
    fn test_archive_without_manifest() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("package.tar.gz");
        write_archive(
            &archive,
            &TarballBuilder::new().file("app/bin/main.wasm", b"\0asm").finish(),
        );

        let project = tmp.path().join("empty");
        std::fs::create_dir_all(&project).unwrap();
        let mut manifest = ManifestData::load(&project);
        let err = validate_package(&project, &mut manifest, Some(&archive)).unwrap_err();
        assert!(matches!(err, Error::ManifestUnreadable { .. }));
    }

    #[test]
    fn test_missing_package_suggests_build() {
        let tmp = TempDir::new().unwrap();
        let root = write_project(tmp.path(), MANIFEST);
        let mut manifest = ManifestData::load(&root);

        let err = validate_package(&root, &mut manifest, None).unwrap_err();
        assert!(matches!(err, Error::PackageNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.remediation().unwrap().contains("fastedge build"));
    }

    #[test]
    fn test_undefined_name() {
        let tmp = TempDir::new().unwrap();
        let root = write_project(tmp.path(), "language = \"rust\"\n");
        let mut manifest = ManifestData::load(&root);

        let err = validate_package(&root, &mut manifest, None).unwrap_err();
        assert!(matches!(err, Error::ManifestUnreadable { .. }));
    }

    #[test]
    fn test_name_flag_selects_package() {
        let tmp = TempDir::new().unwrap();
        let root = write_project(tmp.path(), MANIFEST);
        write_archive(
            &root.join("pkg/renamed.tar.gz"),
            &TarballBuilder::new()
                .file("renamed/fastedge.toml", MANIFEST.as_bytes())
                .finish(),
        );

        let mut manifest = ManifestData::load(&root).with_name_flag(Some("renamed".to_string()));
        let pkg = validate_package(&root, &mut manifest, None).unwrap();
        assert_eq!(pkg.name, "renamed");
    }

    #[test]
    fn test_size_limit_boundary() {
        assert!(check_size(50_000_000, PACKAGE_SIZE_LIMIT).is_ok());

        let err = check_size(50_000_001, PACKAGE_SIZE_LIMIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeLimit);
        assert_eq!(err.to_string(), "package size is too large (50000001 bytes)");
    }

    #[test]
    fn test_corrupt_package() {
        let tmp = TempDir::new().unwrap();
        let root = write_project(tmp.path(), MANIFEST);
        write_archive(&root.join("pkg/edge-app.tar.gz"), b"not a tarball");

        let mut manifest = ManifestData::load(&root);
        let err = validate_package(&root, &mut manifest, None).unwrap_err();
        assert!(err.to_string().contains("error validating package"));
    }
}
