//! Test fixtures for common test scenarios.
//!
//! Scratch projects on disk and in-memory package archives.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::manifest::MANIFEST_NAME;

/// Manifest for a Rust project with no setup tables.
pub const RUST_MANIFEST: &str = "manifest_version = 2\nname = \"edge-app\"\nlanguage = \"rust\"\n";

/// Write `fastedge.toml` into `dir` and return the project root.
pub fn write_project(dir: &Path, manifest: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(MANIFEST_NAME), manifest).unwrap();
    dir.to_path_buf()
}

/// Write a project plus its built package, as `fastedge build` would leave it.
pub fn write_built_project(dir: &Path, manifest: &str, name: &str, wasm: &[u8]) -> PathBuf {
    let root = write_project(dir, manifest);
    let archive = TarballBuilder::new()
        .dir(&format!("{}/", name))
        .file(&format!("{}/{}", name, MANIFEST_NAME), manifest.as_bytes())
        .file(&format!("{}/bin/main.wasm", name), wasm)
        .finish();
    std::fs::create_dir_all(root.join("pkg")).unwrap();
    std::fs::write(root.join(format!("pkg/{}.tar.gz", name)), archive).unwrap();
    root
}

/// Builds a gzip-compressed tarball in memory.
///
/// Metadata applies to the entries added after it is set.
pub struct TarballBuilder {
    builder: tar::Builder<GzEncoder<Vec<u8>>>,
    mtime: u64,
    mode: u32,
}

impl Default for TarballBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TarballBuilder {
    pub fn new() -> Self {
        TarballBuilder {
            builder: tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default())),
            mtime: 0,
            mode: 0o644,
        }
    }

    /// Modification time for following entries.
    pub fn mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    /// Permission bits for following file entries.
    pub fn mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Add a directory entry. `path` should end in `/`.
    pub fn dir(mut self, path: &str) -> Self {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_size(0);
        header.set_mode(0o755);
        header.set_mtime(self.mtime);
        self.builder
            .append_data(&mut header, path, std::io::empty())
            .unwrap();
        self
    }

    /// Add a regular file.
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = self.file_header(data.len());
        self.builder.append_data(&mut header, path, data).unwrap();
        self
    }

    /// Add a regular file without path validation, for hostile archives.
    pub fn raw_file(mut self, path: &str, data: &[u8]) -> Self {
        let mut header = self.file_header(data.len());
        let name = &mut header.as_old_mut().name;
        name[..path.len()].copy_from_slice(path.as_bytes());
        header.set_cksum();
        self.builder.append(&header, data).unwrap();
        self
    }

    /// Finish the archive and return its compressed bytes.
    pub fn finish(self) -> Vec<u8> {
        self.builder.into_inner().unwrap().finish().unwrap()
    }

    fn file_header(&self, size: usize) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(size as u64);
        header.set_mode(self.mode);
        header.set_mtime(self.mtime);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::archive::for_each_member;
    use std::io::Read;

    #[test]
    fn test_tarball_builder_roundtrip_names() {
        let data = TarballBuilder::new()
            .mtime(42)
            .dir("app/")
            .file("app/fastedge.toml", b"name = \"app\"")
            .finish();

        let mut names = Vec::new();
        for_each_member(data.as_slice(), |name, reader| {
            let mut buf = String::new();
            reader.read_to_string(&mut buf)?;
            names.push(name.to_string());
            Ok(())
        })
        .unwrap();
        assert_eq!(names, ["fastedge.toml"]);
    }
}
