use anchor_patcher::config::{apply_patch_set, check_patch_set, load_from_path, resolve_target};
use anchor_patcher::{ApplyOptions, CleanupReport, FileReport, StepOutcome, StepReport};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "anchor-patcher")]
#[command(about = "Idempotent, anchor-driven patching of source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Log engine decisions (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply patch sets to their target files
    Apply {
        /// Patch-set file or directory of patch sets (default: ./patches)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Target file (overrides meta.target of every patch set)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Directory meta.target is relative to (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Treat steps whose anchor matched nothing as failures
        #[arg(long)]
        strict: bool,

        /// Print a JSON report instead of console lines
        #[arg(long)]
        json: bool,
    },

    /// Check status of patch sets without applying
    Status {
        /// Patch-set file or directory of patch sets (default: ./patches)
        #[arg(short, long)]
        patches: Option<PathBuf>,

        /// Target file (overrides meta.target of every patch set)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Directory meta.target is relative to (default: current directory)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// List available patch sets and their steps
    List {
        /// Patch-set file or directory of patch sets (default: ./patches)
        #[arg(short, long)]
        patches: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Apply {
            patches,
            file,
            root,
            dry_run,
            diff,
            strict,
            json,
        } => cmd_apply(
            patches,
            file,
            root,
            ApplyFlags {
                dry_run,
                show_diff: diff,
                strict,
                json,
            },
        ),

        Commands::Status {
            patches,
            file,
            root,
        } => cmd_status(patches, file, root),

        Commands::List { patches } => cmd_list(patches),
    }
}

/// `-v` forces debug; otherwise `RUST_LOG` decides, defaulting to warn.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

struct ApplyFlags {
    dry_run: bool,
    show_diff: bool,
    strict: bool,
    json: bool,
}

#[derive(Default)]
struct Totals {
    applied: usize,
    already_applied: usize,
    unmatched: usize,
    cleaned: usize,
    failed: usize,
}

/// Helper: Discover .toml patch-set files.
///
/// A file path is used as-is; a directory is scanned one level deep and the
/// results are sorted so sets apply in a stable order.
fn discover_patch_files(patches: Option<PathBuf>) -> Result<Vec<PathBuf>> {
    let path = match patches {
        Some(path) => path,
        None => env::current_dir()?.join("patches"),
    };

    if path.is_file() {
        return Ok(vec![path]);
    }
    if !path.is_dir() {
        anyhow::bail!("Patch-set path does not exist: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&path).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .toml patch-set files found in {}", path.display());
    }
    Ok(files)
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path),
        None => Ok(env::current_dir()?),
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn print_step(step: &StepReport, dry_run: bool, totals: &mut Totals) {
    match &step.result {
        Ok(outcome @ StepOutcome::Applied { .. }) => {
            let verb = if dry_run { "Would apply" } else { "Applied" };
            let detail = outcome.to_string();
            let detail = detail.strip_prefix("Applied").unwrap_or(&detail);
            println!("{} {}: {}{}", "✓".green(), step.id, verb, detail);
            totals.applied += 1;
        }
        Ok(outcome @ StepOutcome::SkippedAlreadyApplied { .. }) => {
            println!("{} {}: {}", "⊙".yellow(), step.id, outcome);
            totals.already_applied += 1;
        }
        Ok(outcome @ StepOutcome::SkippedNoMatch { .. }) => {
            println!("{} {}: {}", "⊘".cyan(), step.id, outcome);
            totals.unmatched += 1;
        }
        Err(e) => {
            eprintln!("{} {}: Failed - {}", "✗".red(), step.id, e);
            totals.failed += 1;
        }
    }
}

fn print_cleanup(report: &CleanupReport, totals: &mut Totals) {
    match &report.result {
        Ok(outcome) if outcome.removed_lines() > 0 => {
            println!("{} {}: {}", "✓".green(), report.id, outcome);
            totals.cleaned += outcome.removed_lines();
        }
        Ok(outcome) => {
            println!("{} {}: {}", "⊙".dimmed(), report.id, outcome);
        }
        Err(e) => {
            eprintln!("{} {}: Failed - {}", "✗".red(), report.id, e);
            totals.failed += 1;
        }
    }
}

fn report_json(name: &str, file: &FileReport) -> Result<serde_json::Value> {
    let mut steps = Vec::with_capacity(file.report.run.steps.len());
    for step in &file.report.run.steps {
        let outcome = match &step.result {
            Ok(outcome) => serde_json::to_value(outcome)?,
            Err(e) => json!({ "status": "failed", "error": e.to_string() }),
        };
        steps.push(json!({ "id": step.id, "outcome": outcome }));
    }

    let mut cleanup = Vec::with_capacity(file.report.cleanup.len());
    for report in &file.report.cleanup {
        let outcome = match &report.result {
            Ok(outcome) => serde_json::to_value(outcome)?,
            Err(e) => json!({ "status": "failed", "error": e.to_string() }),
        };
        cleanup.push(json!({ "id": report.id, "outcome": outcome }));
    }

    Ok(json!({
        "patch_set": name,
        "file": file.path,
        "changed": file.changed(),
        "written": file.written,
        "fingerprint_before": format!("{:016x}", file.fingerprint_before()),
        "fingerprint_after": format!("{:016x}", file.fingerprint_after()),
        "steps": steps,
        "cleanup": cleanup,
    }))
}

fn tally_quiet(file: &FileReport, totals: &mut Totals) {
    let run = &file.report.run;
    totals.applied += run.applied();
    totals.already_applied += run.already_applied();
    totals.unmatched += run.unmatched();
    totals.failed += run.failures().count();
    totals.cleaned += file.report.removed_stale_lines();
    totals.failed += file
        .report
        .cleanup
        .iter()
        .filter(|c| c.result.is_err())
        .count();
}

fn cmd_apply(
    patches: Option<PathBuf>,
    file: Option<PathBuf>,
    root: Option<PathBuf>,
    flags: ApplyFlags,
) -> Result<()> {
    let patch_files = discover_patch_files(patches)?;
    let root = resolve_root(root)?;
    let options = ApplyOptions {
        dry_run: flags.dry_run,
    };

    let mut totals = Totals::default();
    let mut json_reports = Vec::new();

    for patch_file in patch_files {
        let set = load_from_path(&patch_file)?;
        let name = set.meta.name.clone();

        if !flags.json {
            println!("Loading patch set {} from {}...", name, patch_file.display());
            if flags.dry_run {
                println!("{}", "  [DRY RUN - showing what would be applied]".cyan());
            }
        }

        let report = match apply_patch_set(&set, &root, file.as_deref(), options) {
            Ok(report) => report,
            Err(e) => {
                if flags.json {
                    json_reports.push(json!({ "patch_set": name, "error": e.to_string() }));
                } else {
                    eprintln!("{} {}: Error - {}", "✗".red(), name, e);
                    println!();
                }
                totals.failed += 1;
                continue;
            }
        };

        if flags.json {
            json_reports.push(report_json(&name, &report)?);
            tally_quiet(&report, &mut totals);
            continue;
        }

        println!("Target: {}", report.path.display());
        for step in &report.report.run.steps {
            print_step(step, flags.dry_run, &mut totals);
        }
        for cleanup in &report.report.cleanup {
            print_cleanup(cleanup, &mut totals);
        }

        if flags.show_diff && report.changed() {
            display_diff(&report.path, &report.original, &report.patched);
        }

        println!();
    }

    let strict_failure = flags.strict && totals.unmatched > 0;

    if flags.json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    } else {
        println!("{}", "Summary:".bold());
        println!("  {} applied", format!("{}", totals.applied).green());
        println!(
            "  {} already applied",
            format!("{}", totals.already_applied).yellow()
        );
        println!("  {} no match", format!("{}", totals.unmatched).cyan());
        println!(
            "  {} stale line(s) removed",
            format!("{}", totals.cleaned).green()
        );
        println!("  {} failed", format!("{}", totals.failed).red());
        if strict_failure {
            eprintln!(
                "{}",
                "Strict mode: steps without a matching anchor count as failures".red()
            );
        }
    }

    if totals.failed > 0 || strict_failure {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_status(patches: Option<PathBuf>, file: Option<PathBuf>, root: Option<PathBuf>) -> Result<()> {
    let patch_files = discover_patch_files(patches)?;
    let root = resolve_root(root)?;

    println!("{}", "Patch Status Report".bold());
    println!();

    let mut applied = Vec::new();
    let mut not_applied = Vec::new();
    let mut unmatched = Vec::new();
    let mut failed = Vec::new();

    // Dry run only; never writes.
    for patch_file in patch_files {
        let set = load_from_path(&patch_file)?;
        let name = set.meta.name.clone();

        let report = match check_patch_set(&set, &root, file.as_deref()) {
            Ok(report) => report,
            Err(e) => {
                failed.push((name, e.to_string()));
                continue;
            }
        };

        for step in &report.report.run.steps {
            let id = format!("{}/{}", name, step.id);
            match &step.result {
                Ok(StepOutcome::SkippedAlreadyApplied { .. }) => applied.push(id),
                Ok(outcome @ StepOutcome::Applied { .. }) => {
                    not_applied.push((id, format!("would apply: {}", outcome)))
                }
                Ok(outcome @ StepOutcome::SkippedNoMatch { .. }) => {
                    unmatched.push((id, outcome.to_string()))
                }
                Err(e) => failed.push((id, e.to_string())),
            }
        }
        for cleanup in &report.report.cleanup {
            let id = format!("{}/{}", name, cleanup.id);
            match &cleanup.result {
                Ok(outcome) if outcome.removed_lines() > 0 => {
                    not_applied.push((id, outcome.to_string()))
                }
                Ok(_) => {}
                Err(e) => failed.push((id, e.to_string())),
            }
        }
    }

    if !applied.is_empty() {
        println!(
            "{} {} ({} steps)",
            "✓".green(),
            "APPLIED".green().bold(),
            applied.len()
        );
        for id in &applied {
            println!("  - {}", id);
        }
        println!();
    }

    if !not_applied.is_empty() {
        println!(
            "{} {} ({} steps)",
            "⊙".yellow(),
            "NOT APPLIED".yellow().bold(),
            not_applied.len()
        );
        for (id, reason) in &not_applied {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !unmatched.is_empty() {
        println!(
            "{} {} ({} steps)",
            "⊘".cyan(),
            "NO MATCH".cyan().bold(),
            unmatched.len()
        );
        for (id, reason) in &unmatched {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    if !failed.is_empty() {
        println!(
            "{} {} ({} steps)",
            "✗".red(),
            "FAILED".red().bold(),
            failed.len()
        );
        for (id, reason) in &failed {
            println!("  - {} ({})", id, reason.dimmed());
        }
        println!();
    }

    Ok(())
}

fn cmd_list(patches: Option<PathBuf>) -> Result<()> {
    let patch_files = discover_patch_files(patches)?;
    let root = env::current_dir()?;

    for patch_file in patch_files {
        let set = load_from_path(&patch_file)?;
        println!(
            "{} ({})",
            set.meta.name.as_str().bold(),
            patch_file.display()
        );
        if let Some(description) = &set.meta.description {
            println!("  {}", description.dimmed());
        }
        match resolve_target(&set, &root, None) {
            Ok(target) => println!("  Target: {}", target.display()),
            Err(_) => println!("  Target: {}", "(none; pass --file)".yellow()),
        }

        for step in &set.steps {
            println!(
                "  - {} [{}] anchor [{}] in {}",
                step.id,
                step.mutation.kind(),
                step.anchor,
                step.window
            );
        }
        for cleanup in &set.cleanup {
            println!(
                "  - {} [cleanup] stale [{}] after [{}]",
                cleanup.id, cleanup.stale, cleanup.boundary
            );
        }
        println!();
    }

    Ok(())
}
