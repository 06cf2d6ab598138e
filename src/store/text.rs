//! Sectioned key/value text parser
//!
//! Every backing store (Package, Working, Override, Extra, Staging) uses
//! the same INI-like format: `[section]` headers followed by `key = value`
//! lines. Parsing preserves document order, which the layer resolver and
//! diff engine both rely on.
//!
//! Two loading modes exist. Layer merging is fail-soft: a missing file
//! yields an empty document and a malformed line is skipped with a log
//! entry, so one broken file cannot block startup. Single-file operations
//! (diff, describe) load strictly and surface parse errors.

use crate::error::{Result, TuneError};
use std::path::{Path, PathBuf};

/// Section names that carry metadata rather than definition entries
pub const METADATA_SECTIONS: [&str; 2] = ["version", "reminder"];

/// One parsed `key = value` entry, tagged with its enclosing section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub section: String,
    pub key: String,
    pub value: String,
}

/// An ordered, parsed backing-store file
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Source path (empty for synthetic documents)
    pub path: PathBuf,
    /// Entries in document order
    pub entries: Vec<Entry>,
}

impl Document {
    /// Section names in first-appearance order, without duplicates
    pub fn sections(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.section.as_str()) {
                seen.push(entry.section.as_str());
            }
        }
        seen
    }

    /// Last value stored for a section/key pair
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.section == section && e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Entries belonging to one section, in document order
    pub fn section_entries<'a>(&'a self, section: &'a str) -> impl Iterator<Item = &'a Entry> {
        self.entries.iter().filter(move |e| e.section == section)
    }

    /// Whether a section name is one of the metadata sections
    pub fn is_metadata_section(section: &str) -> bool {
        METADATA_SECTIONS.contains(&section)
    }
}

/// Parse text into a document, skipping malformed lines with a warning
pub fn parse(path: &Path, text: &str) -> Document {
    parse_inner(path, text, false).unwrap_or_default()
}

/// Parse text into a document, failing on the first malformed line
pub fn parse_strict(path: &Path, text: &str) -> Result<Document> {
    parse_inner(path, text, true)
}

fn parse_inner(path: &Path, text: &str, strict: bool) -> Result<Document> {
    let mut entries = Vec::new();
    let mut section = String::new();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_string();
            continue;
        }

        // Reminder sections hold free text, not key/value pairs
        if section == "reminder" {
            entries.push(Entry {
                section: section.clone(),
                key: String::new(),
                value: line.to_string(),
            });
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            if strict {
                return Err(TuneError::parse(
                    path,
                    format!("line {}: expected 'key = value', got '{line}'", lineno + 1),
                ));
            }
            tracing::warn!(
                "skipping malformed line {} in {}: '{}'",
                lineno + 1,
                path.display(),
                line
            );
            continue;
        };

        if section.is_empty() {
            if strict {
                return Err(TuneError::parse(
                    path,
                    format!("line {}: entry before any section header", lineno + 1),
                ));
            }
            tracing::warn!(
                "skipping entry before any section header at line {} in {}",
                lineno + 1,
                path.display()
            );
            continue;
        }

        entries.push(Entry {
            section: section.clone(),
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        });
    }

    Ok(Document {
        path: path.to_path_buf(),
        entries,
    })
}

/// Load a file fail-soft: missing or unreadable files yield an empty
/// document so layer merging can continue
pub fn load(path: &Path) -> Document {
    match std::fs::read_to_string(path) {
        Ok(text) => parse(path, &text),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("cannot read {}: {}", path.display(), e);
            }
            Document {
                path: path.to_path_buf(),
                entries: Vec::new(),
            }
        }
    }
}

/// Load a file fail-loud: I/O and parse errors are surfaced
pub fn load_strict(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path).map_err(|e| TuneError::io(path, e))?;
    parse_strict(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# vendor catalogue
[version]
VERSION = 3
DATE = 2025-04-01

[ArchX86]
SOL1 = N1 N2
SOL2 = N3

[ArchPPC64LE]
SOL1 = N1
";

    #[test]
    fn test_parse_preserves_order() {
        let doc = parse(Path::new("sample"), SAMPLE);
        let ids: Vec<&str> = doc
            .entries
            .iter()
            .filter(|e| !Document::is_metadata_section(&e.section))
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(ids, vec!["SOL1", "SOL2", "SOL1"]);
        assert_eq!(doc.sections(), vec!["version", "ArchX86", "ArchPPC64LE"]);
    }

    #[test]
    fn test_get_returns_last_value() {
        let doc = parse(
            Path::new("dup"),
            "[s]\nkey = first\nkey = second\n",
        );
        assert_eq!(doc.get("s", "key"), Some("second"));
    }

    #[test]
    fn test_malformed_line_skipped_soft() {
        let doc = parse(Path::new("bad"), "[s]\nnot a pair\nok = 1\n");
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.get("s", "ok"), Some("1"));
    }

    #[test]
    fn test_malformed_line_fails_strict() {
        let err = parse_strict(Path::new("bad"), "[s]\nnot a pair\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_reminder_kept_as_free_text() {
        let doc = parse(Path::new("r"), "[reminder]\nre-run after reboot\n");
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].value, "re-run after reboot");
    }

    #[test]
    fn test_missing_file_yields_empty_document() {
        let dir = TempDir::new().unwrap();
        let doc = load(&dir.path().join("absent"));
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn test_missing_file_fails_strict() {
        let dir = TempDir::new().unwrap();
        assert!(load_strict(&dir.path().join("absent")).is_err());
    }
}
