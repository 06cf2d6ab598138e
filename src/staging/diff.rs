//! Field-level diff between staged and working content
//!
//! Single-file operation, so parsing is fail-loud: a malformed staged or
//! working file surfaces as a parse error instead of being skipped. An
//! UPDATED object may legitimately produce zero differences.

use crate::error::Result;
use crate::staging::{StageRecord, StagingContext};
use crate::store::text::{self, Document};
use std::path::Path;

/// One differing field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub section: String,
    pub key: String,
    /// Working-area value; None when the field only exists staged
    pub working: Option<String>,
    /// Staged value; None when the field was removed
    pub staged: Option<String>,
}

/// Computes field-level differences for staged objects
#[derive(Debug)]
pub struct DiffEngine<'a> {
    ctx: &'a StagingContext,
}

impl<'a> DiffEngine<'a> {
    pub fn new(ctx: &'a StagingContext) -> Self {
        Self { ctx }
    }

    /// Diff one staged object against its working counterpart
    pub fn diff(&self, record: &StageRecord) -> Result<Vec<FieldDiff>> {
        let staged = load_side(&record.staging_path)?;
        let working = load_side(&record.working_path)?;
        Ok(diff_documents(&working, &staged))
    }

    /// Diff every staged object, in record order
    pub fn diff_all(&self) -> Result<Vec<(String, Vec<FieldDiff>)>> {
        let mut out = Vec::new();
        for record in self.ctx.records() {
            out.push((record.name.clone(), self.diff(record)?));
        }
        Ok(out)
    }
}

/// A side that has no file (NEW has no working copy, a synthesized
/// DELETED may have no staged copy) diffs as an empty document
fn load_side(path: &Path) -> Result<Document> {
    if path.exists() {
        text::load_strict(path)
    } else {
        Ok(Document::default())
    }
}

/// Compare two documents field by field. Fields follow staged order,
/// with working-only fields appended; reminder free text is not a field.
pub fn diff_documents(working: &Document, staged: &Document) -> Vec<FieldDiff> {
    let mut diffs = Vec::new();
    let mut seen: Vec<(&str, &str)> = Vec::new();

    for entry in staged.entries.iter().filter(|e| e.section != "reminder") {
        let pair = (entry.section.as_str(), entry.key.as_str());
        if seen.contains(&pair) {
            continue;
        }
        seen.push(pair);

        let staged_value = staged.get(pair.0, pair.1);
        let working_value = working.get(pair.0, pair.1);
        if staged_value != working_value {
            diffs.push(FieldDiff {
                section: pair.0.to_string(),
                key: pair.1.to_string(),
                working: working_value.map(str::to_string),
                staged: staged_value.map(str::to_string),
            });
        }
    }

    for entry in working.entries.iter().filter(|e| e.section != "reminder") {
        let pair = (entry.section.as_str(), entry.key.as_str());
        if seen.contains(&pair) {
            continue;
        }
        seen.push(pair);

        diffs.push(FieldDiff {
            section: pair.0.to_string(),
            key: pair.1.to_string(),
            working: working.get(pair.0, pair.1).map(str::to_string),
            staged: None,
        });
    }

    diffs
}
