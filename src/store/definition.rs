//! Definition model
//!
//! A definition is one catalogue object: a Note (atomic bundle of
//! parameter settings) or a Solution (named ordered list of Note IDs).
//! Definitions carry the layer they were resolved from so reports can
//! show provenance.

use crate::store::text::Document;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Filename suffix distinguishing Solution files from Note files
pub const SOLUTION_SUFFIX: &str = ".sol";

/// Definition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Note,
    Solution,
}

impl Kind {
    /// File name for an ID of this kind inside a working-shaped directory
    pub fn file_name(&self, id: &str) -> String {
        match self {
            Kind::Note => id.to_string(),
            Kind::Solution => format!("{id}{SOLUTION_SUFFIX}"),
        }
    }

    /// Split a working-shaped file name into kind and ID
    pub fn from_file_name(name: &str) -> (Kind, String) {
        match name.strip_suffix(SOLUTION_SUFFIX) {
            Some(id) => (Kind::Solution, id.to_string()),
            None => (Kind::Note, name.to_string()),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Note => write!(f, "note"),
            Kind::Solution => write!(f, "solution"),
        }
    }
}

/// Storage layer a definition was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    /// Vendor-shipped ground truth, read-only
    Package,
    /// Engine-owned, currently effective content
    Working,
    /// Customer overlay superseding specific package values
    Override,
    /// Customer-authored definition with no package counterpart
    Custom,
    /// Read-only advisory list of retired Solution IDs
    Deprecated,
    /// Vendor holding area for unreleased updates
    Staging,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Layer::Package => "package",
            Layer::Working => "working",
            Layer::Override => "override",
            Layer::Custom => "custom",
            Layer::Deprecated => "deprecated",
            Layer::Staging => "staging",
        };
        write!(f, "{name}")
    }
}

/// Version metadata read from a definition's `[version]` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    pub date: String,
    pub description: String,
}

impl VersionInfo {
    /// Extract version metadata from a parsed document
    pub fn from_document(doc: &Document) -> Self {
        Self {
            version: doc.get("version", "VERSION").unwrap_or_default().to_string(),
            date: doc.get("version", "DATE").unwrap_or_default().to_string(),
            description: doc
                .get("version", "DESCRIPTION")
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Ordered parameter content of a Note
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteContent {
    /// (section, key, value) in document order, metadata sections excluded
    pub params: Vec<(String, String, String)>,
}

impl NoteContent {
    /// Extract parameter content from a parsed document
    pub fn from_document(doc: &Document) -> Self {
        let params = doc
            .entries
            .iter()
            .filter(|e| !Document::is_metadata_section(&e.section))
            .map(|e| (e.section.clone(), e.key.clone(), e.value.clone()))
            .collect();
        Self { params }
    }

    /// Substitute values from an override document for matching
    /// section/key pairs; unmatched override entries are ignored
    pub fn apply_override(&mut self, over: &Document) -> bool {
        let mut touched = false;
        for (section, key, value) in &mut self.params {
            if let Some(replacement) = over.get(section, key) {
                if replacement != value {
                    *value = replacement.to_string();
                    touched = true;
                }
            }
        }
        touched
    }
}

/// Ordered member list of a Solution.
///
/// A list, not a set: definition order is the apply order and duplicates
/// are possible but inert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionContent {
    pub notes: Vec<String>,
}

impl SolutionContent {
    /// Parse the raw catalogue value (whitespace-separated Note IDs)
    pub fn parse(raw: &str) -> Self {
        Self {
            notes: raw.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn join(&self) -> String {
        self.notes.join(" ")
    }
}

/// Kind-specific definition content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Note(NoteContent),
    Solution(SolutionContent),
}

/// One resolved catalogue object
#[derive(Debug, Clone)]
pub struct Definition {
    pub id: String,
    pub kind: Kind,
    /// Architecture key the definition was resolved for
    pub arch: String,
    pub content: Content,
    pub version: VersionInfo,
    /// Layer that won the precedence decision for this ID
    pub source_layer: Layer,
}

impl Definition {
    /// Member Note IDs, empty for Notes
    pub fn member_notes(&self) -> &[String] {
        match &self.content {
            Content::Solution(s) => &s.notes,
            Content::Note(_) => &[],
        }
    }
}

/// Read the member list of a single-solution working/staging file.
///
/// Such files mirror the catalogue shape: architecture sections with one
/// `ID = members` entry each. Returns the entry for the given
/// architecture, if present.
pub fn solution_members_from_file(path: &Path, arch: &str, id: &str) -> Option<SolutionContent> {
    let doc = crate::store::text::load(path);
    doc.get(arch, id).map(SolutionContent::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::text::parse;
    use std::path::Path;

    #[test]
    fn test_kind_file_name_round_trip() {
        assert_eq!(Kind::Solution.file_name("HANA"), "HANA.sol");
        assert_eq!(Kind::Note.file_name("1410736"), "1410736");
        assert_eq!(
            Kind::from_file_name("HANA.sol"),
            (Kind::Solution, "HANA".to_string())
        );
        assert_eq!(
            Kind::from_file_name("1410736"),
            (Kind::Note, "1410736".to_string())
        );
    }

    #[test]
    fn test_note_content_skips_metadata() {
        let doc = parse(
            Path::new("n"),
            "[version]\nVERSION = 2\n[sysctl]\nvm.swappiness = 10\n[reminder]\nreboot\n",
        );
        let content = NoteContent::from_document(&doc);
        assert_eq!(
            content.params,
            vec![(
                "sysctl".to_string(),
                "vm.swappiness".to_string(),
                "10".to_string()
            )]
        );
        let version = VersionInfo::from_document(&doc);
        assert_eq!(version.version, "2");
    }

    #[test]
    fn test_apply_override_substitutes_matching_values() {
        let doc = parse(Path::new("n"), "[sysctl]\nX = 1\nY = 5\n");
        let over = parse(Path::new("o"), "[sysctl]\nX = 2\nZ = 9\n");
        let mut content = NoteContent::from_document(&doc);
        assert!(content.apply_override(&over));
        assert_eq!(content.params[0].2, "2");
        assert_eq!(content.params[1].2, "5");
        // Z from the override has no package counterpart and is ignored
        assert_eq!(content.params.len(), 2);
    }

    #[test]
    fn test_solution_content_preserves_order_and_duplicates() {
        let content = SolutionContent::parse("N2  N1 N2");
        assert_eq!(content.notes, vec!["N2", "N1", "N2"]);
        assert_eq!(content.join(), "N2 N1 N2");
    }
}
