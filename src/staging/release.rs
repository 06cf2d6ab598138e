//! Release: promote staged objects into the working area
//!
//! The only mutating step of the staging lifecycle. A batch is rejected
//! before any mutation unless every requested object analyzes as
//! releasable; breaking findings have no override, `--force` only skips
//! the confirmation prompt. Within an accepted batch, per-ID filesystem
//! errors are collected and do not abort the remaining IDs; the batch is
//! best-effort, not atomic.

use crate::confirm::Confirmer;
use crate::error::{IoResultExt, Result, TuneError};
use crate::staging::{Analysis, Classification, ImpactAnalyzer, StageRecord, StagingContext};
use crate::store::{solution_members_from_file, Kind};
use std::path::Path;

/// Literal target token selecting every staged object
pub const ALL_TOKEN: &str = "all";

/// Release options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseOptions {
    /// Skip the confirmation prompt
    pub force: bool,
    /// Analyze and report only, mutate nothing
    pub dry_run: bool,
}

/// Per-object release outcome
#[derive(Debug, Clone)]
pub struct ReleaseOutcome {
    pub name: String,
    pub released: bool,
    pub message: String,
}

/// Result of one release batch
#[derive(Debug)]
pub struct ReleaseResult {
    pub analyses: Vec<Analysis>,
    pub outcomes: Vec<ReleaseOutcome>,
    pub dry_run: bool,
}

impl ReleaseResult {
    /// A batch succeeds only when every object released cleanly
    pub fn is_success(&self) -> bool {
        self.dry_run || self.outcomes.iter().all(|o| o.released)
    }

    /// Aggregate failed outcomes into one error
    pub fn into_result(self) -> Result<()> {
        let errors: Vec<Result<()>> = self
            .outcomes
            .iter()
            .filter(|o| !self.dry_run && !o.released)
            .map(|o| {
                Err(TuneError::config(format!(
                    "release of '{}' failed: {}",
                    o.name, o.message
                )))
            })
            .collect();
        crate::error::collect_errors(errors).map(|_| ())
    }
}

/// Performs the promotion and updates the enabled/apply bookkeeping
pub struct ReleaseExecutor<'a> {
    ctx: &'a mut StagingContext,
    confirmer: &'a dyn Confirmer,
}

impl<'a> ReleaseExecutor<'a> {
    pub fn new(ctx: &'a mut StagingContext, confirmer: &'a dyn Confirmer) -> Self {
        Self { ctx, confirmer }
    }

    /// Release the requested objects.
    ///
    /// Preconditions are checked against the whole batch before any
    /// mutation: every target must exist in the staged set and analyze
    /// as releasable. Dry runs stop after analysis and succeed even
    /// when the batch would be blocked.
    pub fn release(&mut self, targets: &[String], options: ReleaseOptions) -> Result<ReleaseResult> {
        let names = self.expand_targets(targets)?;

        let analyses: Vec<Analysis> = {
            let analyzer = ImpactAnalyzer::new(self.ctx);
            names
                .iter()
                .map(|n| analyzer.analyze(self.ctx.record(n).expect("expanded target exists")))
                .collect()
        };

        // Dry runs stop here and always succeed: the full report is the
        // product, blocked objects included
        if options.dry_run {
            let outcomes = names
                .iter()
                .zip(&analyses)
                .map(|(n, a)| ReleaseOutcome {
                    name: n.clone(),
                    released: false,
                    message: if a.releasable() {
                        "dry run, nothing changed".to_string()
                    } else {
                        "dry run, release would be blocked".to_string()
                    },
                })
                .collect();
            return Ok(ReleaseResult {
                analyses,
                outcomes,
                dry_run: true,
            });
        }

        if let Some(blocked) = analyses.iter().find(|a| !a.releasable()) {
            let reason = blocked
                .issues
                .iter()
                .find(|i| i.severity >= crate::staging::SEVERITY_BREAKING)
                .map(|i| i.message.clone())
                .unwrap_or_else(|| "breaking issue".to_string());
            return Err(TuneError::breaking(blocked.name.clone(), reason));
        }

        if !options.force {
            let prompt = format!(
                "Release {} staged object(s) [{}] into the working area?",
                names.len(),
                names.join(", ")
            );
            if !self.confirmer.confirm(&prompt) {
                return Err(TuneError::Cancelled);
            }
        }

        let mut outcomes = Vec::new();
        for name in &names {
            let outcome = self.release_one(name);
            if outcome.released {
                self.ctx.forget(name);
            }
            outcomes.push(outcome);
        }

        Ok(ReleaseResult {
            analyses,
            outcomes,
            dry_run: false,
        })
    }

    /// Expand the target list, validating the preconditions
    fn expand_targets(&self, targets: &[String]) -> Result<Vec<String>> {
        if targets.iter().any(|t| t == ALL_TOKEN) {
            if self.ctx.is_empty() {
                return Err(TuneError::not_found(ALL_TOKEN, "staging area (nothing is staged)"));
            }
            return Ok(self.ctx.records().iter().map(|r| r.name.clone()).collect());
        }

        let mut names = Vec::new();
        for target in targets {
            if self.ctx.record(target).is_none() {
                return Err(TuneError::not_found(target.clone(), "staging area"));
            }
            if !names.contains(target) {
                names.push(target.clone());
            }
        }
        Ok(names)
    }

    /// Release one object. Analysis is re-validated immediately before
    /// mutation; no stale verdict is trusted across the confirmation
    /// pause.
    fn release_one(&mut self, name: &str) -> ReleaseOutcome {
        let record = match self.ctx.record(name) {
            Some(r) => r.clone(),
            None => {
                return ReleaseOutcome {
                    name: name.to_string(),
                    released: false,
                    message: "no longer staged".to_string(),
                }
            }
        };

        let analysis = ImpactAnalyzer::new(self.ctx).analyze(&record);
        if !analysis.releasable() {
            return ReleaseOutcome {
                name: name.to_string(),
                released: false,
                message: "breaking issue found on re-validation".to_string(),
            };
        }

        let result = match record.classification {
            Classification::Deleted => self.release_deleted(&record),
            Classification::New | Classification::Updated => self.release_update(&record),
        };

        match result {
            Ok(message) => ReleaseOutcome {
                name: name.to_string(),
                released: true,
                message,
            },
            Err(e) => ReleaseOutcome {
                name: name.to_string(),
                released: false,
                message: e.to_string(),
            },
        }
    }

    /// Drop a definition the vendor no longer ships. An applied Solution
    /// first migrates its member Notes into the manually-enabled set so
    /// their tuning is not orphaned on the next apply cycle.
    fn release_deleted(&mut self, record: &StageRecord) -> Result<String> {
        if record.kind == Kind::Solution && (record.is_applied || record.is_enabled) {
            self.migrate_applied_solution(record)?;
        }

        std::fs::remove_file(&record.working_path).with_path(&record.working_path)?;
        remove_if_exists(&record.staging_path)?;
        tracing::info!("released removal of '{}'", record.name);
        Ok(format!("{} removed from the working area", record.name))
    }

    /// Promote new or updated content: the staging copy moves onto the
    /// working path and is consumed on success
    fn release_update(&mut self, record: &StageRecord) -> Result<String> {
        if let Some(parent) = record.working_path.parent() {
            std::fs::create_dir_all(parent).with_path(parent)?;
        }
        move_file(&record.staging_path, &record.working_path)?;
        tracing::info!(
            "released '{}' ({}) into the working area",
            record.name,
            record.classification
        );
        Ok(format!("{} released", record.name))
    }

    /// Migrate an in-use deleted Solution: every member Note not already
    /// manually enabled joins the enabled set (kept sorted and unique),
    /// then the Solution leaves the enabled record and the state is
    /// persisted before any file is removed.
    fn migrate_applied_solution(&mut self, record: &StageRecord) -> Result<()> {
        let members = solution_members_from_file(&record.working_path, &self.ctx.arch, &record.id)
            .map(|c| c.notes)
            .unwrap_or_else(|| record.related_note_ids.clone());

        for note in &members {
            if self.ctx.state.enable_note(note) {
                tracing::info!(
                    "migrating note '{}' of retired solution '{}' to the manually-enabled set",
                    note,
                    record.id
                );
            }
        }
        self.ctx.state.disable_solution(&record.id);
        self.ctx.state.save()
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TuneError::io(path, e)),
    }
}

/// Move a file, falling back to copy-and-remove across filesystems
fn move_file(from: &Path, to: &Path) -> Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            std::fs::copy(from, to).with_path(to)?;
            std::fs::remove_file(from).with_path(from)
        }
    }
}
