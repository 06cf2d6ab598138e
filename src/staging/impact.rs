//! Pre-release impact analysis
//!
//! Read-only: decides whether releasing a staged object would break the
//! currently tuned system. Used both for the interactive report and as
//! the release precondition. Severity is the maximum over issues:
//! 0 none, 1 informational, 2 breaking. Breaking blocks the release
//! unconditionally; there is no override.

use crate::staging::{Classification, StageRecord, StagingContext};
use crate::store::Kind;

pub const SEVERITY_NONE: u8 = 0;
pub const SEVERITY_INFO: u8 = 1;
pub const SEVERITY_BREAKING: u8 = 2;

/// One finding about a staged object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: u8,
    pub message: String,
}

impl Issue {
    fn info(message: impl Into<String>) -> Self {
        Self {
            severity: SEVERITY_INFO,
            message: message.into(),
        }
    }

    fn breaking(message: impl Into<String>) -> Self {
        Self {
            severity: SEVERITY_BREAKING,
            message: message.into(),
        }
    }
}

/// Analysis verdict for one staged object
#[derive(Debug, Clone)]
pub struct Analysis {
    pub name: String,
    pub classification: Classification,
    pub issues: Vec<Issue>,
}

impl Analysis {
    /// Highest severity over all issues
    pub fn severity(&self) -> u8 {
        self.issues
            .iter()
            .map(|i| i.severity)
            .max()
            .unwrap_or(SEVERITY_NONE)
    }

    /// A release is only allowed when nothing breaking was found
    pub fn releasable(&self) -> bool {
        self.severity() < SEVERITY_BREAKING
    }
}

/// Analyzes staged objects against the enabled/applied state and the
/// resolved cross-references
#[derive(Debug)]
pub struct ImpactAnalyzer<'a> {
    ctx: &'a StagingContext,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(ctx: &'a StagingContext) -> Self {
        Self { ctx }
    }

    pub fn analyze(&self, record: &StageRecord) -> Analysis {
        let issues = match record.kind {
            Kind::Solution => self.analyze_solution(record),
            Kind::Note => self.analyze_note(record),
        };
        Analysis {
            name: record.name.clone(),
            classification: record.classification,
            issues,
        }
    }

    /// Analyze every staged record, in record order
    pub fn analyze_all(&self) -> Vec<Analysis> {
        self.ctx
            .records()
            .iter()
            .map(|r| self.analyze(r))
            .collect()
    }

    fn analyze_solution(&self, record: &StageRecord) -> Vec<Issue> {
        let mut issues = Vec::new();

        match record.classification {
            Classification::New => {
                issues.push(Issue::info(format!(
                    "solution '{}' is new, no action required",
                    record.id
                )));
            }
            Classification::Updated => {
                if record.is_applied {
                    issues.push(Issue::info(format!(
                        "solution '{}' is currently applied and must be re-applied \
                         for the update to take effect",
                        record.id
                    )));
                }
                // Enabled but not applied needs no action
            }
            Classification::Deleted => {
                if record.is_applied || record.is_enabled {
                    // Member notes stay enabled as a safety net; see the
                    // migration step in the release executor
                    issues.push(Issue::info(format!(
                        "solution '{}' is currently in use and must be reverted; \
                         its notes remain enabled",
                        record.id
                    )));
                }
            }
        }

        for note in &record.related_note_ids {
            if record.missing_notes.contains(note) {
                issues.push(Issue::breaking(format!(
                    "member note '{note}' of solution '{}' does not exist in any layer",
                    record.id
                )));
                continue;
            }
            if record.notes_in_staging.contains(note) {
                let member = self.ctx.record(note);
                match member.map(|m| m.classification) {
                    Some(Classification::Updated) => {
                        issues.push(Issue::info(format!(
                            "member note '{note}' has a staged update"
                        )));
                    }
                    Some(class @ (Classification::New | Classification::Deleted)) => {
                        issues.push(Issue::breaking(format!(
                            "member note '{note}' is staged as {class} and must be \
                             released together with its solution"
                        )));
                    }
                    None => {}
                }
            }
        }

        issues
    }

    fn analyze_note(&self, record: &StageRecord) -> Vec<Issue> {
        let mut issues = Vec::new();

        match record.classification {
            Classification::New => {
                issues.push(Issue::info(format!(
                    "note '{}' is new, no action required",
                    record.id
                )));
            }
            Classification::Updated => {
                if record.is_applied {
                    issues.push(Issue::info(format!(
                        "note '{}' is currently applied and must be re-applied \
                         for the update to take effect",
                        record.id
                    )));
                }
            }
            Classification::Deleted => {
                // Removing a note a solution still advertises would
                // desynchronize the solution's membership from reality
                for sol in &record.referencing_solutions {
                    issues.push(Issue::breaking(format!(
                        "note '{}' is still referenced by solution '{sol}'",
                        record.id
                    )));
                }
                if record.referencing_solutions.is_empty()
                    && (record.is_applied || record.is_enabled)
                {
                    issues.push(Issue::info(format!(
                        "note '{}' is currently in use and must be reverted",
                        record.id
                    )));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorePaths;
    use crate::store::Kind;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, StorePaths) {
        let dir = TempDir::new().unwrap();
        let paths = StorePaths::under_root(dir.path());
        for d in [
            paths.package_notes_dir(),
            paths.working_notes_dir(),
            paths.working_sols_dir(),
            paths.staging_dir(),
            paths.override_dir(),
            paths.extra_dir(),
        ] {
            fs::create_dir_all(d).unwrap();
        }
        fs::create_dir_all(paths.state_file().parent().unwrap()).unwrap();
        (dir, paths)
    }

    fn write(path: &Path, text: &str) {
        fs::write(path, text).unwrap();
    }

    fn build(paths: &StorePaths) -> StagingContext {
        StagingContext::build(paths.clone(), "ArchX86").unwrap()
    }

    #[test]
    fn test_new_solution_is_informational() {
        let (_dir, paths) = fixture();
        write(&paths.working_path(Kind::Note, "N1"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = N1\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = N1\n");

        let ctx = build(&paths);
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert_eq!(analysis.severity(), SEVERITY_INFO);
        assert!(analysis.releasable());
    }

    #[test]
    fn test_updated_applied_solution_must_reapply() {
        let (_dir, paths) = fixture();
        write(&paths.working_path(Kind::Note, "N1"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("N1"), "[sysctl]\nX = 1\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = N1\n",
        );
        write(
            &paths.working_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = N1\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = N1\n");
        write(
            &paths.state_file(),
            "TUNE_ENABLED_SOLUTIONS=\"S1\"\nTUNE_NOTE_APPLY_ORDER=\"N1\"\n",
        );

        let ctx = build(&paths);
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert_eq!(analysis.severity(), SEVERITY_INFO);
        assert!(analysis.releasable());
        assert!(analysis.issues[0].message.contains("re-applied"));
    }

    #[test]
    fn test_missing_member_note_blocks_release() {
        let (_dir, paths) = fixture();
        write(&paths.working_path(Kind::Note, "A"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("A"), "[sysctl]\nX = 1\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = A B\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = A B\n");

        let ctx = build(&paths);
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert_eq!(analysis.severity(), SEVERITY_BREAKING);
        assert!(!analysis.releasable());
    }

    #[test]
    fn test_member_deleted_in_staging_blocks_solution() {
        let (_dir, paths) = fixture();
        // Note B exists in working but the package dropped it: DELETED
        write(&paths.working_path(Kind::Note, "A"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("A"), "[sysctl]\nX = 1\n");
        write(&paths.working_path(Kind::Note, "B"), "[sysctl]\nY = 1\n");
        write(&paths.staging_path(Kind::Note, "B"), "[sysctl]\nY = 2\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = A B\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = A B\n");

        let ctx = build(&paths);
        assert_eq!(
            ctx.record("B").unwrap().classification,
            Classification::Deleted
        );
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert!(!analysis.releasable());
    }

    #[test]
    fn test_synthesized_deleted_member_blocks_solution() {
        let (_dir, paths) = fixture();
        write(&paths.working_path(Kind::Note, "A"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("A"), "[sysctl]\nX = 1\n");
        // B's deletion is synthesized: working copy exists, package
        // dropped it, and the vendor shipped no staging file for it
        write(&paths.working_path(Kind::Note, "B"), "[sysctl]\nY = 1\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = A B\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = A B\n");

        let ctx = build(&paths);
        assert_eq!(
            ctx.record("B").unwrap().classification,
            Classification::Deleted
        );
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert!(!analysis.releasable());
    }

    #[test]
    fn test_member_updated_in_staging_is_informational() {
        let (_dir, paths) = fixture();
        write(&paths.working_path(Kind::Note, "A"), "[sysctl]\nX = 1\n");
        write(&paths.package_notes_dir().join("A"), "[sysctl]\nX = 1\n");
        write(&paths.staging_path(Kind::Note, "A"), "[sysctl]\nX = 2\n");
        write(
            &paths.staging_path(Kind::Solution, "S1"),
            "[ArchX86]\nS1 = A\n",
        );
        write(&paths.package_solutions_file(), "[ArchX86]\nS1 = A\n");

        let ctx = build(&paths);
        let analysis = ImpactAnalyzer::new(&ctx).analyze(ctx.record("S1.sol").unwrap());
        assert_eq!(analysis.severity(), SEVERITY_INFO);
        assert!(analysis.releasable());
    }

    #[test]
    fn test_deleted_note_referenced_by_any_solution_blocks() {
        let (_dir, paths) = fixture();
        // N1 deleted from the package but a (not even enabled) custom
        // solution still references it
        write(&paths.working_path(Kind::Note, "N1"), "[sysctl]\nX = 1\n");
        write(&paths.extra_solutions_file(), "[ArchX86]\nS9 = N1\n");

        let ctx = build(&paths);
        let record = ctx.record("N1").unwrap();
        assert_eq!(record.classification, Classification::Deleted);
        let analysis = ImpactAnalyzer::new(&ctx).analyze(record);
        assert!(!analysis.releasable());
        assert!(analysis.issues[0].message.contains("S9"));
    }
}
