//! Deterministic SHA-256 checksums over the files an orchestrator run produced (§6).
//!
//! `checksums.txt` lists one `<hex digest>  <relative path>` pair per line, sorted by path, so
//! that byte-for-byte reproduction (property P6) extends to the checksum file itself.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Computes SHA-256 digests for every file in `paths` (relative to `root`), sorted by path.
pub fn compute(root: &Path, paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();

    let mut digests = Vec::with_capacity(sorted.len());
    for relative in sorted {
        let absolute = root.join(relative);
        let bytes = fs::read(&absolute)
            .map_err(|e| Error::internal(format!("reading {}: {e}", absolute.display())))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex_encode(&hasher.finalize());
        digests.push((relative.clone(), digest));
    }
    Ok(digests)
}

/// Renders [`compute`]'s output as the `checksums.txt` contents: digest first, path last.
pub fn render(digests: &[(PathBuf, String)]) -> String {
    let mut out = String::new();
    for (path, digest) in digests {
        out.push_str(digest);
        out.push_str("  ");
        out.push_str(&path.to_string_lossy());
        out.push('\n');
    }
    out
}

/// Computes and writes `checksums.txt` at `root`, returning its byte size.
pub fn write_checksums_file(root: &Path, paths: &[PathBuf]) -> Result<u64> {
    let digests = compute(root, paths)?;
    let contents = render(&digests);
    let dest = root.join("checksums.txt");
    fs::write(&dest, &contents)
        .map_err(|e| Error::internal(format!("writing {}: {e}", dest.display())))?;
    Ok(contents.len() as u64)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn digests_are_sorted_by_path_and_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), b"second").unwrap();
        fs::write(dir.path().join("a.yaml"), b"first").unwrap();

        let paths = vec![PathBuf::from("b.yaml"), PathBuf::from("a.yaml")];
        let digests = compute(dir.path(), &paths).unwrap();

        assert_eq!(digests[0].0, PathBuf::from("a.yaml"));
        assert_eq!(digests[1].0, PathBuf::from("b.yaml"));
        assert_eq!(digests[0].1.len(), 64);
    }

    /// P6: identical contents hash identically across independent runs.
    #[test]
    fn property_p6_same_contents_same_digest() {
        let dir1 = tempfile::tempdir().unwrap();
        let dir2 = tempfile::tempdir().unwrap();
        fs::write(dir1.path().join("values.yaml"), b"driver: 580\n").unwrap();
        fs::write(dir2.path().join("values.yaml"), b"driver: 580\n").unwrap();

        let paths = vec![PathBuf::from("values.yaml")];
        let d1 = compute(dir1.path(), &paths).unwrap();
        let d2 = compute(dir2.path(), &paths).unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn render_puts_digest_before_path() {
        let digests = vec![(PathBuf::from("a.yaml"), "deadbeef".to_string())];
        let rendered = render(&digests);
        assert_eq!(rendered, "deadbeef  a.yaml\n");
    }

    #[test]
    fn write_checksums_file_errors_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![PathBuf::from("missing.yaml")];
        assert!(write_checksums_file(dir.path(), &paths).is_err());
    }
}
