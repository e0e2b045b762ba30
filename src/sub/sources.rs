//! Input and output file plumbing around the pipeline

use crate::sub::classifier::ConfigPartition;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// Base name for output files; partitions land in `bisub_<tag>.txt`
pub const OUTPUT_BASE: &str = "bisub";

/// Read subscription URLs from a newline-delimited file
///
/// Blank lines and lines starting with `#` are skipped.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Write one file per non-empty partition plus the combined list
///
/// A file that cannot be written is reported and skipped; the remaining
/// files are still produced. Returns the paths actually written.
pub fn write_partitions(partition: &ConfigPartition, dir: &Path) -> Vec<PathBuf> {
    let mut written = Vec::new();

    for (tag, links) in partition.by_tag() {
        if links.is_empty() {
            continue;
        }
        let path = dir.join(format!("{OUTPUT_BASE}_{tag}.txt"));
        if write_links(&path, links) {
            written.push(path);
        }
    }

    let combined = partition.all();
    let path = dir.join(format!("{OUTPUT_BASE}.txt"));
    if write_links(&path, &combined) {
        written.push(path);
    }

    written
}

fn write_links(path: &Path, links: &[String]) -> bool {
    let mut content = links.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    match fs::write(path, content) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to write output file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read_lines_skips_blanks_and_comments() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("subs.txt");
        let mut file = fs::File::create(&path).expect("failed to create subs file");
        writeln!(file, "https://example.com/sub1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file, "  https://example.com/sub2  ").unwrap();

        let lines = read_lines(&path).expect("failed to read subs file");
        assert_eq!(
            lines,
            vec![
                "https://example.com/sub1".to_string(),
                "https://example.com/sub2".to_string(),
            ]
        );
    }

    #[test]
    fn test_read_lines_missing_file_is_an_error() {
        assert!(read_lines("/definitely/not/here.txt").is_err());
    }

    #[test]
    fn test_write_partitions_creates_expected_files() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let partition = ConfigPartition {
            vless: vec!["vless://a".to_string()],
            trojan: vec!["trojan://d".to_string(), "trojan://e".to_string()],
            ..Default::default()
        };

        let written = write_partitions(&partition, dir.path());

        // vless, trojan, and the combined file; empty categories skipped.
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("bisub_vless.txt").exists());
        assert!(dir.path().join("bisub_trojan.txt").exists());
        assert!(dir.path().join("bisub.txt").exists());
        assert!(!dir.path().join("bisub_vmess.txt").exists());

        let combined =
            fs::read_to_string(dir.path().join("bisub.txt")).expect("failed to read combined");
        assert_eq!(combined, "vless://a\ntrojan://d\ntrojan://e\n");

        let trojan =
            fs::read_to_string(dir.path().join("bisub_trojan.txt")).expect("failed to read trojan");
        assert_eq!(trojan, "trojan://d\ntrojan://e\n");
    }

    #[test]
    fn test_write_partitions_empty_still_writes_combined() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let written = write_partitions(&ConfigPartition::default(), dir.path());
        assert_eq!(written.len(), 1);
        assert!(dir.path().join("bisub.txt").exists());
    }

    #[test]
    fn test_unwritable_destination_does_not_abort_the_rest() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let partition = ConfigPartition {
            ss: vec!["ss://a".to_string()],
            ..Default::default()
        };

        // A directory standing where the category file should go makes that
        // one write fail; the combined file must still appear.
        fs::create_dir(dir.path().join("bisub_ss.txt")).expect("failed to create blocker");
        let written = write_partitions(&partition, dir.path());
        assert_eq!(written.len(), 1);
        assert!(dir.path().join("bisub.txt").exists());
    }
}
