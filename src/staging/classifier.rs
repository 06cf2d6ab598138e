//! Staging classification
//!
//! Builds the per-invocation staging snapshot: every staged object with
//! its lifecycle classification, descriptive metadata and membership
//! cross-references. Records live for one command invocation and are
//! never persisted.

use crate::config::StorePaths;
use crate::error::Result;
use crate::state::ApplicationState;
use crate::store::{
    list_files, solution_members_from_file, text, Kind, LayerResolver, ResolvedNotes,
    ResolvedSolutions, VersionInfo,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle classification of a staged object.
///
/// Mutually exclusive: NEW iff the ID is absent from Working, DELETED iff
/// present in Working but absent from Package, otherwise UPDATED. UPDATED
/// is the default even when the staged content is byte-identical to
/// Working.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    New,
    Updated,
    Deleted,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::New => "NEW",
            Classification::Updated => "UPDATED",
            Classification::Deleted => "DELETED",
        };
        write!(f, "{s}")
    }
}

/// One staged object and everything the analysis and release steps need
/// to know about it
#[derive(Debug, Clone)]
pub struct StageRecord {
    /// File name in the staging area (`<ID>` or `<ID>.sol`), the handle
    /// users address the object by
    pub name: String,
    pub id: String,
    pub kind: Kind,
    pub classification: Classification,
    pub staging_path: PathBuf,
    pub working_path: PathBuf,
    /// Description/version/date from the staged object's own version
    /// metadata; absent for DELETED (a removal carries no version)
    pub version: Option<VersionInfo>,
    /// An override file exists for this ID
    pub has_override: bool,
    pub is_enabled: bool,
    pub is_applied: bool,
    /// Solutions only: member Note IDs in definition order
    pub related_note_ids: Vec<String>,
    /// Notes only: Solutions referencing this Note, custom ones included
    pub referencing_solutions: Vec<String>,
    /// Solutions only: member Notes absent from every layer
    pub missing_notes: Vec<String>,
    /// Solutions only: member Notes that are themselves staged
    pub notes_in_staging: Vec<String>,
}

/// Per-invocation staging snapshot.
///
/// Resolved tables, state and records are computed once per run and
/// passed explicitly to the diff, analysis and release steps.
#[derive(Debug)]
pub struct StagingContext {
    pub paths: StorePaths,
    pub arch: String,
    pub notes: ResolvedNotes,
    pub solutions: ResolvedSolutions,
    pub state: ApplicationState,
    records: Vec<StageRecord>,
}

impl StagingContext {
    /// Build the snapshot: resolve layers, load state, classify every
    /// staged object
    pub fn build(paths: StorePaths, arch: impl Into<String>) -> Result<Self> {
        let arch = arch.into();
        let resolver = LayerResolver::new(&paths, arch.clone());
        let notes = resolver.resolve_notes();
        let solutions = resolver.resolve_solutions();
        let state = ApplicationState::load(&paths.state_file())?;

        let mut ctx = Self {
            paths,
            arch,
            notes,
            solutions,
            state,
            records: Vec::new(),
        };
        ctx.records = ctx.classify_all();
        Ok(ctx)
    }

    /// All staged records, ordered by name
    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by its staging file name
    pub fn record(&self, name: &str) -> Option<&StageRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Remove a record after its release
    pub fn forget(&mut self, name: &str) {
        self.records.retain(|r| r.name != name);
    }

    /// The staged set: files in the staging directory plus working IDs
    /// the package no longer ships (classified DELETED even when no
    /// staging file exists for them)
    fn staged_names(&self) -> Vec<String> {
        let mut names: BTreeMap<String, ()> = BTreeMap::new();

        for path in list_files(&self.paths.staging_dir()) {
            if let Some(name) = path.file_name() {
                names.insert(name.to_string_lossy().to_string(), ());
            }
        }

        for dir in [self.paths.working_notes_dir(), self.paths.working_sols_dir()] {
            for path in list_files(&dir) {
                let Some(name) = path.file_name() else { continue };
                let name = name.to_string_lossy().to_string();
                let (kind, id) = Kind::from_file_name(&name);
                if !self.in_package(kind, &id) {
                    names.insert(name, ());
                }
            }
        }

        names.into_keys().collect()
    }

    fn classify_all(&self) -> Vec<StageRecord> {
        self.staged_names()
            .into_iter()
            .map(|name| self.classify(&name))
            .collect()
    }

    /// Classify one staged name and assemble its record
    fn classify(&self, name: &str) -> StageRecord {
        let (kind, id) = Kind::from_file_name(name);
        let staging_path = self.paths.staging_path(kind, &id);
        let working_path = self.paths.working_path(kind, &id);

        let in_working = working_path.exists();
        let classification = if !in_working {
            Classification::New
        } else if !self.in_package(kind, &id) {
            Classification::Deleted
        } else {
            // UPDATED even for byte-identical content; downstream
            // messaging expects it to be reportable with zero diffs
            if files_identical(&staging_path, &working_path) {
                tracing::info!(
                    "staged '{}' is identical to working content, still classified UPDATED",
                    name
                );
            }
            Classification::Updated
        };

        let version = match classification {
            Classification::Deleted => None,
            _ => Some(VersionInfo::from_document(&text::load(&staging_path))),
        };

        let related_note_ids = match kind {
            Kind::Note => Vec::new(),
            Kind::Solution => {
                // DELETED solutions only exist in the working area
                let path = match classification {
                    Classification::Deleted => &working_path,
                    _ => &staging_path,
                };
                solution_members_from_file(path, &self.arch, &id)
                    .map(|c| c.notes)
                    .unwrap_or_default()
            }
        };

        let referencing_solutions = match kind {
            Kind::Note => self
                .solutions
                .referencing_note(&self.arch, &id)
                .iter()
                .map(|d| d.id.clone())
                .collect(),
            Kind::Solution => Vec::new(),
        };

        let missing_notes = related_note_ids
            .iter()
            .filter(|n| !self.note_exists_anywhere(n))
            .cloned()
            .collect();

        let notes_in_staging = related_note_ids
            .iter()
            .filter(|n| self.note_is_staged(n))
            .cloned()
            .collect();

        let (is_enabled, is_applied) = match kind {
            Kind::Note => (
                self.state.is_note_enabled(&id),
                self.state.is_note_applied(&id),
            ),
            Kind::Solution => (
                self.state.is_solution_enabled(&id),
                self.state.is_solution_enabled(&id)
                    && self.state.is_solution_applied(&related_note_ids),
            ),
        };

        StageRecord {
            name: name.to_string(),
            id: id.clone(),
            kind,
            classification,
            has_override: self.paths.override_path(kind, &id).exists(),
            staging_path,
            working_path,
            version,
            is_enabled,
            is_applied,
            related_note_ids,
            referencing_solutions,
            missing_notes,
            notes_in_staging,
        }
    }

    /// Whether the vendor package still ships this ID
    fn in_package(&self, kind: Kind, id: &str) -> bool {
        match kind {
            Kind::Note => self.paths.package_notes_dir().join(id).exists(),
            Kind::Solution => {
                let catalogue = text::load(&self.paths.package_solutions_file());
                catalogue
                    .entries
                    .iter()
                    .any(|e| !crate::store::Document::is_metadata_section(&e.section) && e.key == id)
            }
        }
    }

    /// A member Note belongs to the staged set. Staging-file presence is
    /// not enough: a synthesized deletion (working copy present, package
    /// dropped it) has no staging file but is staged all the same
    fn note_is_staged(&self, id: &str) -> bool {
        self.paths.staging_path(Kind::Note, id).exists()
            || (self.paths.working_path(Kind::Note, id).exists()
                && !self.in_package(Kind::Note, id))
    }

    /// A member Note resolves somewhere: working, extra, package or staging
    fn note_exists_anywhere(&self, id: &str) -> bool {
        self.paths.working_path(Kind::Note, id).exists()
            || self.paths.extra_note_path(id).exists()
            || self.paths.package_notes_dir().join(id).exists()
            || self.paths.staging_path(Kind::Note, id).exists()
    }
}

fn files_identical(a: &std::path::Path, b: &std::path::Path) -> bool {
    match (std::fs::read(a), std::fs::read(b)) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}
