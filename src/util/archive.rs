//! Gzip-compressed tar archive reading.

use std::io::Read;
use std::path::{Component, Path};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extract a `.tar.gz` stream into `dest`.
///
/// Entries with absolute paths or `..` components are rejected.
pub fn extract_tarball(reader: impl Read, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(reader));

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        if entry_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }

        let output_path = dest.join(&entry_path);
        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                if let Some(parent) = output_path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            _ => {
                tracing::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}

/// Stream every regular file in a `.tar.gz` archive through `f`.
///
/// `f` receives the member's file name (last path component) and a reader
/// over its contents. Nothing is written to disk.
pub fn for_each_member<R, F>(reader: R, mut f: F) -> Result<()>
where
    R: Read,
    F: FnMut(&str, &mut dyn Read) -> Result<()>,
{
    let mut archive = Archive::new(GzDecoder::new(reader));

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        if !matches!(
            entry.header().entry_type(),
            tar::EntryType::Regular | tar::EntryType::Continuous
        ) {
            continue;
        }

        let file_name = match entry.path()?.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        f(&file_name, &mut entry)?;
    }

    Ok(())
}
