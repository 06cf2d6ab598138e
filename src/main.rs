//! tunelayer CLI - Layered Host-Tuning Definition Manager
//!
//! One command per process invocation; mutating commands hold the run
//! lock for the whole invocation.

use clap::Parser;
use console::style;
use tunelayer::arch::ArchSelector;
use tunelayer::config::{CliArgs, Commands, ListKind, StagingAction, StorePaths};
use tunelayer::confirm::StdinConfirmer;
use tunelayer::error::{Result, TuneError};
use tunelayer::lock::{FileLock, LockService, NullLock};
use tunelayer::staging::{
    Analysis, DiffEngine, ImpactAnalyzer, ReleaseExecutor, ReleaseOptions, ReleaseResult,
    StagingContext, ALL_TOKEN, SEVERITY_BREAKING, SEVERITY_INFO,
};
use tunelayer::store::{Content, Layer, LayerResolver};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = CliArgs::parse();

    // Initialize logging; -v raises the default level, RUST_LOG wins
    let default_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with_target(false)
        .init();

    let paths = StorePaths::under_root(&args.root);

    // Read-only commands get the no-op lock service
    let file_lock = FileLock::new(paths.lock_file());
    let lock: &dyn LockService = if args.command.needs_lock() {
        &file_lock
    } else {
        &NullLock
    };
    if let Err(e) = lock.acquire() {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    let result = run(&args, &paths);
    lock.release();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(args: &CliArgs, paths: &StorePaths) -> Result<()> {
    let arch = ArchSelector::native().resolve();
    tracing::debug!("resolved architecture key '{}'", arch);

    match &args.command {
        Commands::List { kind } => cmd_list(paths, &arch, *kind),
        Commands::Status => cmd_status(paths, &arch),
        Commands::Staging { action } => match action {
            StagingAction::List => cmd_staging_list(paths, &arch),
            StagingAction::Diff { ids } => cmd_staging_diff(paths, &arch, ids),
            StagingAction::Analysis { ids } => cmd_staging_analysis(paths, &arch, ids),
            StagingAction::Release {
                force,
                dry_run,
                ids,
            } => cmd_staging_release(paths, &arch, ids, *force, *dry_run, args.quiet),
        },
    }
}

fn cmd_list(paths: &StorePaths, arch: &str, kind: ListKind) -> Result<()> {
    let resolver = LayerResolver::new(paths, arch);

    match kind {
        ListKind::Notes => {
            let notes = resolver.resolve_notes();
            println!("Notes ({}):", notes.table.len());
            for def in notes.table.values() {
                let marker = layer_marker(def.source_layer);
                let params = match &def.content {
                    Content::Note(c) => c.params.len(),
                    Content::Solution(_) => 0,
                };
                println!(
                    "  {:<16} {:<10} {:>3} parameter(s)  {}",
                    def.id, marker, params, def.version.description
                );
            }
        }
        ListKind::Solutions => {
            let solutions = resolver.resolve_solutions();
            let table = solutions.for_arch(arch);
            let count = table.map(|t| t.len()).unwrap_or(0);
            println!("Solutions for {arch} ({count}):");
            if let Some(table) = table {
                for def in table.values() {
                    let mut marker = layer_marker(def.source_layer).to_string();
                    if solutions.is_deprecated(&def.id) {
                        marker.push_str(" deprecated");
                    }
                    println!(
                        "  {:<16} {:<20} -> {}",
                        def.id,
                        marker,
                        def.member_notes().join(" ")
                    );
                }
            }
        }
    }

    Ok(())
}

fn cmd_status(paths: &StorePaths, arch: &str) -> Result<()> {
    let ctx = StagingContext::build(paths.clone(), arch)?;

    println!("Architecture:      {arch}");
    println!(
        "Enabled solutions: {}",
        join_or_dash(&ctx.state.enabled_solutions)
    );
    println!(
        "Enabled notes:     {}",
        join_or_dash(&ctx.state.enabled_notes)
    );
    println!("Apply order:       {}", join_or_dash(&ctx.state.apply_order));
    println!("Staged objects:    {}", ctx.records().len());

    Ok(())
}

fn cmd_staging_list(paths: &StorePaths, arch: &str) -> Result<()> {
    let ctx = StagingContext::build(paths.clone(), arch)?;

    if ctx.is_empty() {
        println!("Nothing is staged.");
        return Ok(());
    }

    println!("Staged objects ({}):", ctx.records().len());
    for record in ctx.records() {
        let mut flags = Vec::new();
        if record.has_override {
            flags.push("override");
        }
        if record.is_enabled {
            flags.push("enabled");
        }
        if record.is_applied {
            flags.push("applied");
        }
        if ctx.solutions.is_deprecated(&record.id) {
            flags.push("deprecated");
        }

        let (version, date, description) = record
            .version
            .as_ref()
            .map(|v| (v.version.as_str(), v.date.as_str(), v.description.as_str()))
            .unwrap_or(("-", "-", ""));

        println!(
            "  {:<9} {:<20} v{:<6} {:<12} {:<24} {}",
            style_classification(&record.classification.to_string()),
            record.name,
            version,
            date,
            flags.join(","),
            description,
        );
    }

    Ok(())
}

fn cmd_staging_diff(paths: &StorePaths, arch: &str, ids: &[String]) -> Result<()> {
    let ctx = StagingContext::build(paths.clone(), arch)?;
    let engine = DiffEngine::new(&ctx);

    let diffs = if ids.is_empty() || ids.iter().any(|i| i == ALL_TOKEN) {
        engine.diff_all()?
    } else {
        let names = expand_targets(&ctx, ids)?;
        let mut out = Vec::new();
        for name in &names {
            let record = ctx.record(name).expect("expanded target exists");
            out.push((name.clone(), engine.diff(record)?));
        }
        out
    };

    for (name, fields) in &diffs {
        let record = ctx.record(name).expect("diffed record exists");
        println!("{} ({}):", style(name).bold(), record.classification);
        if fields.is_empty() {
            println!("  no field differences");
            continue;
        }
        for diff in fields {
            println!(
                "  [{}] {}: {} -> {}",
                diff.section,
                diff.key,
                diff.working.as_deref().unwrap_or("<absent>"),
                diff.staged.as_deref().unwrap_or("<removed>"),
            );
        }
    }

    Ok(())
}

fn cmd_staging_analysis(paths: &StorePaths, arch: &str, ids: &[String]) -> Result<()> {
    let ctx = StagingContext::build(paths.clone(), arch)?;
    let names = expand_targets(&ctx, ids)?;
    let analyzer = ImpactAnalyzer::new(&ctx);

    for name in &names {
        let record = ctx.record(name).expect("expanded target exists");
        print_analysis(&analyzer.analyze(record));
    }

    Ok(())
}

fn cmd_staging_release(
    paths: &StorePaths,
    arch: &str,
    ids: &[String],
    force: bool,
    dry_run: bool,
    quiet: bool,
) -> Result<()> {
    let mut ctx = StagingContext::build(paths.clone(), arch)?;

    // The executor skips confirmation itself when forced
    let confirmer = StdinConfirmer;

    if dry_run && !quiet {
        println!("=== Dry Run Mode ===");
        println!("Nothing will be released.");
        println!();
    }

    let options = ReleaseOptions { force, dry_run };
    let result = ReleaseExecutor::new(&mut ctx, &confirmer).release(ids, options)?;

    if !quiet {
        print_release_report(&result);
    }

    result.into_result()
}

fn print_analysis(analysis: &Analysis) {
    let verdict = if analysis.releasable() {
        style("releasable").green()
    } else {
        style("blocked").red().bold()
    };
    println!(
        "{} ({}): {}",
        style(&analysis.name).bold(),
        analysis.classification,
        verdict
    );
    for issue in &analysis.issues {
        let tag = match issue.severity {
            SEVERITY_BREAKING => style("breaking").red(),
            SEVERITY_INFO => style("note").yellow(),
            _ => style("ok").green(),
        };
        println!("  [{}] {}", tag, issue.message);
    }
    if analysis.issues.is_empty() {
        println!("  no findings");
    }
}

fn print_release_report(result: &ReleaseResult) {
    for analysis in &result.analyses {
        print_analysis(analysis);
    }

    println!();
    for outcome in &result.outcomes {
        let status = if result.dry_run {
            style("would release").yellow()
        } else if outcome.released {
            style("released").green()
        } else {
            style("failed").red().bold()
        };
        println!("{:<20} {} - {}", outcome.name, status, outcome.message);
    }
}

/// Expand a target list for the read-only staging commands: empty or
/// 'all' means every staged object
fn expand_targets(ctx: &StagingContext, ids: &[String]) -> Result<Vec<String>> {
    if ids.is_empty() || ids.iter().any(|i| i == ALL_TOKEN) {
        return Ok(ctx.records().iter().map(|r| r.name.clone()).collect());
    }
    for id in ids {
        if ctx.record(id).is_none() {
            return Err(TuneError::not_found(id.clone(), "staging area"));
        }
    }
    Ok(ids.to_vec())
}

fn layer_marker(layer: Layer) -> &'static str {
    match layer {
        Layer::Package => "",
        Layer::Working => "[working]",
        Layer::Override => "[override]",
        Layer::Custom => "[custom]",
        Layer::Deprecated => "[deprecated]",
        Layer::Staging => "[staging]",
    }
}

fn style_classification(class: &str) -> console::StyledObject<String> {
    let class = class.to_string();
    match class.as_str() {
        "NEW" => style(class).green(),
        "DELETED" => style(class).red(),
        _ => style(class).yellow(),
    }
}

fn join_or_dash(list: &[String]) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(" ")
    }
}
