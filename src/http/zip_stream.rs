//! Builds the response body ZIP archive from an orchestrator output directory (§6). Directory
//! entries are written before any file entries, and every file uses DEFLATE compression, per the
//! archive-structure contract.

use crate::error::{Error, Result};
use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Walks `root` and returns the archive bytes. Entries are archive-root-relative; directories
/// are written first (as trailing-slash entries), then files, both in sorted order so the result
/// is byte-identical across runs with identical contents (property P6).
pub fn build_archive(root: &Path) -> Result<Vec<u8>> {
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::internal(format!("walking {}: {e}", root.display())))?;
        if entry.path() == root {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| Error::internal(format!("relativizing {}: {e}", entry.path().display())))?;
        let name = relative.to_string_lossy().replace('\\', "/");
        if entry.file_type().is_dir() {
            dirs.push(name);
        } else {
            files.push((name, entry.path().to_path_buf()));
        }
    }

    for dir in dirs {
        writer
            .add_directory(format!("{dir}/"), options)
            .map_err(|e| Error::internal(format!("adding directory {dir}: {e}")))?;
    }

    for (name, path) in files {
        writer
            .start_file(&name, options)
            .map_err(|e| Error::internal(format!("starting file {name}: {e}")))?;
        let contents = std::fs::read(&path)
            .map_err(|e| Error::internal(format!("reading {}: {e}", path.display())))?;
        writer
            .write_all(&contents)
            .map_err(|e| Error::internal(format!("writing {name} into archive: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| Error::internal(format!("finalizing archive: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn directory_entries_precede_file_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("gpu-operator")).unwrap();
        std::fs::write(dir.path().join("gpu-operator/values.yaml"), b"a: 1\n").unwrap();
        std::fs::write(dir.path().join("Chart.yaml"), b"apiVersion: v2\n").unwrap();

        let bytes = build_archive(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut dir_index = None;
        let mut file_index = None;
        for i in 0..archive.len() {
            let entry = archive.by_index(i).unwrap();
            if entry.name() == "gpu-operator/" {
                dir_index = Some(i);
            } else if entry.name() == "gpu-operator/values.yaml" {
                file_index = Some(i);
            }
        }
        assert!(dir_index.unwrap() < file_index.unwrap());
    }

    #[test]
    fn archive_contains_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Chart.yaml"), b"apiVersion: v2\n").unwrap();

        let bytes = build_archive(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("Chart.yaml").unwrap();
        let mut contents = String::new();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "apiVersion: v2\n");
    }
}
