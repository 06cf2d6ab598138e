//! Persisted application state
//!
//! Records which Solutions and Notes are enabled and the order Notes were
//! applied in. Order matters: a later-applied Note may overwrite an
//! earlier one's effect on a shared parameter.
//!
//! The backing file is a flat key/value format, one `KEY="v1 v2"` line per
//! list. It is read at process start and rewritten wholesale on mutation.

use crate::error::{IoResultExt, Result};
use std::path::{Path, PathBuf};

const KEY_ENABLED_SOLUTIONS: &str = "TUNE_ENABLED_SOLUTIONS";
const KEY_ENABLED_NOTES: &str = "TUNE_ENABLED_NOTES";
const KEY_APPLY_ORDER: &str = "TUNE_NOTE_APPLY_ORDER";

/// Enabled definitions and Note apply order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationState {
    path: PathBuf,
    /// Enabled Solutions, in enable order (historically at most one entry)
    pub enabled_solutions: Vec<String>,
    /// Manually enabled Notes, unique
    pub enabled_notes: Vec<String>,
    /// Note IDs in the order their settings were materialized
    pub apply_order: Vec<String>,
}

impl ApplicationState {
    /// Load state from a file; a missing file yields the empty state
    pub fn load(path: &Path) -> Result<Self> {
        let mut state = Self {
            path: path.to_path_buf(),
            ..Default::default()
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(state),
            Err(e) => return Err(crate::error::TuneError::io(path, e)),
        };

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!("skipping malformed state line in {}: '{}'", path.display(), line);
                continue;
            };
            let values = split_list(value);
            match key.trim() {
                KEY_ENABLED_SOLUTIONS => state.enabled_solutions = values,
                KEY_ENABLED_NOTES => state.enabled_notes = values,
                KEY_APPLY_ORDER => state.apply_order = values,
                other => {
                    tracing::debug!("ignoring unknown state key '{}'", other);
                }
            }
        }

        Ok(state)
    }

    /// Rewrite the whole state file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        let text = format!(
            "{KEY_ENABLED_SOLUTIONS}=\"{}\"\n{KEY_ENABLED_NOTES}=\"{}\"\n{KEY_APPLY_ORDER}=\"{}\"\n",
            self.enabled_solutions.join(" "),
            self.enabled_notes.join(" "),
            self.apply_order.join(" "),
        );
        std::fs::write(&self.path, text).with_path(&self.path)
    }

    pub fn is_solution_enabled(&self, id: &str) -> bool {
        self.enabled_solutions.iter().any(|s| s == id)
    }

    pub fn is_note_enabled(&self, id: &str) -> bool {
        self.enabled_notes.iter().any(|n| n == id)
    }

    /// Whether a Note's settings are currently materialized
    pub fn is_note_applied(&self, id: &str) -> bool {
        self.apply_order.iter().any(|n| n == id)
    }

    /// Whether every member of a Solution is currently applied
    pub fn is_solution_applied(&self, members: &[String]) -> bool {
        !members.is_empty() && members.iter().all(|m| self.is_note_applied(m))
    }

    /// Add a Note to the manually-enabled set; the set stays sorted and
    /// de-duplicated. Returns true if the Note was newly added.
    pub fn enable_note(&mut self, id: &str) -> bool {
        if self.is_note_enabled(id) {
            return false;
        }
        self.enabled_notes.push(id.to_string());
        self.enabled_notes.sort();
        self.enabled_notes.dedup();
        true
    }

    /// Remove a Solution from the enabled record
    pub fn disable_solution(&mut self, id: &str) {
        self.enabled_solutions.retain(|s| s != id);
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_matches('"')
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_empty_state() {
        let dir = TempDir::new().unwrap();
        let state = ApplicationState::load(&dir.path().join("config")).unwrap();
        assert!(state.enabled_solutions.is_empty());
        assert!(state.apply_order.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");

        let mut state = ApplicationState::load(&path).unwrap();
        state.enabled_solutions.push("HANA".to_string());
        state.enabled_notes = vec!["100".to_string(), "200".to_string()];
        state.apply_order = vec!["200".to_string(), "100".to_string()];
        state.save().unwrap();

        let loaded = ApplicationState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.is_solution_enabled("HANA"));
        assert!(loaded.is_note_applied("200"));
    }

    #[test]
    fn test_enable_note_sorted_deduped() {
        let mut state = ApplicationState::default();
        assert!(state.enable_note("300"));
        assert!(state.enable_note("100"));
        assert!(!state.enable_note("300"));
        assert_eq!(state.enabled_notes, vec!["100", "300"]);
    }

    #[test]
    fn test_solution_applied_needs_all_members() {
        let mut state = ApplicationState::default();
        state.apply_order = vec!["N1".to_string()];
        let members = vec!["N1".to_string(), "N2".to_string()];
        assert!(!state.is_solution_applied(&members));
        state.apply_order.push("N2".to_string());
        assert!(state.is_solution_applied(&members));
        assert!(!state.is_solution_applied(&[]));
    }

    #[test]
    fn test_malformed_line_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "garbage line\nTUNE_ENABLED_NOTES=\"1 2\"\n").unwrap();
        let state = ApplicationState::load(&path).unwrap();
        assert_eq!(state.enabled_notes, vec!["1", "2"]);
    }
}
