//! Aliasgraph CLI: migrate contributor identity fields in a graph snapshot
//!
//! Loads the graph from a JSON snapshot, runs one command through the
//! migration driver and writes the snapshot back after mutating commands.

use aliasgraph::migration::{
    audit, resolve_contributor, AuditReport, ContributorView, PlannedEntity, PlannedOutcome,
};
use aliasgraph::{
    BatchReport, ContributorKey, Direction, FailurePolicy, GraphSession, GraphSnapshot, GraphStore,
    MemorySession, MigrationConfig, MigrationDriver, MigrationOutcome,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Exit status when a batch or an audit finished but reported problems
const EXIT_PARTIAL: i32 = 2;

#[derive(Parser)]
#[command(name = "aliasgraph", version, about = "Contributor identity alias migration")]
struct Cli {
    /// Graph snapshot (JSON)
    #[arg(long, global = true, env = "ALIASGRAPH_GRAPH", default_value = "graph.json")]
    graph: PathBuf,

    /// Migration config (YAML)
    #[arg(long, global = true, env = "ALIASGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Roll back every transaction instead of committing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Stop a batch at the first failing contributor
    #[arg(long, global = true)]
    abort_on_error: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Move one contributor's identity onto a primary alias
    MigrateOne {
        /// Contributor id
        id: String,
    },
    /// Migrate every contributor that still carries an openid
    MigrateAll,
    /// Fold one contributor's primary alias back onto it
    RevertOne {
        /// Contributor id
        id: String,
    },
    /// Revert every contributor with a primary alias
    RevertAll,
    /// Show what a batch pass would do without changing anything
    Plan {
        /// forward | backward
        direction: Direction,
    },
    /// Show a contributor's effective identity
    Show {
        /// Contributor id, or an OpenID URL
        key: String,
    },
    /// Check the alias invariants across the whole graph
    Audit,
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::MigrateOne { .. }
                | Commands::MigrateAll
                | Commands::RevertOne { .. }
                | Commands::RevertAll
        )
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = match &cli.config {
        Some(path) => MigrationConfig::from_yaml_file(path)?,
        None => MigrationConfig::default(),
    };
    if cli.dry_run {
        config = config.with_dry_run(true);
    }
    if cli.abort_on_error {
        config = config.with_failure_policy(FailurePolicy::Abort);
    }

    let store = load_graph(&cli.graph)?;
    let dry_run = config.dry_run;
    let driver = MigrationDriver::new(MemorySession::new(store), config);

    let code = match &cli.command {
        Commands::MigrateOne { id } => {
            let outcome = driver.migrate_one(id).await?;
            print_outcome(id, outcome, dry_run, &cli.format)?;
            0
        }
        Commands::RevertOne { id } => {
            let outcome = driver.revert_one(id).await?;
            print_outcome(id, outcome, dry_run, &cli.format)?;
            0
        }
        Commands::MigrateAll => {
            let report = driver.migrate_all().await?;
            print_batch(&report, &cli.format)?;
            batch_exit_code(&report)
        }
        Commands::RevertAll => {
            let report = driver.revert_all().await?;
            print_batch(&report, &cli.format)?;
            batch_exit_code(&report)
        }
        Commands::Plan { direction } => {
            let plan = driver.plan_all(*direction).await?;
            print_plan(&plan, &cli.format)?;
            0
        }
        Commands::Show { key } => {
            let key = ContributorKey::parse(key);
            let mut tx = driver.session().begin().await?;
            let view = resolve_contributor(tx.as_mut(), &key).await;
            tx.rollback().await?;
            match view? {
                Some(view) => print_view(&view, &cli.format)?,
                None => println!("No contributor for {}", key),
            }
            0
        }
        Commands::Audit => {
            let mut tx = driver.session().begin().await?;
            let report = audit(tx.as_mut()).await;
            tx.rollback().await?;
            let report = report?;
            print_audit(&report, &cli.format)?;
            if report.is_clean() {
                0
            } else {
                EXIT_PARTIAL
            }
        }
    };

    if cli.command.mutates() && !dry_run {
        let store = driver.session().store().read().await;
        store
            .snapshot()
            .save(&cli.graph)
            .with_context(|| format!("saving graph to {}", cli.graph.display()))?;
    }

    Ok(code)
}

fn load_graph(path: &Path) -> anyhow::Result<GraphStore> {
    let snapshot = GraphSnapshot::load(path)
        .with_context(|| format!("loading graph from {}", path.display()))?;
    let store = GraphStore::from_snapshot(snapshot)?;
    Ok(store)
}

fn batch_exit_code(report: &BatchReport) -> i32 {
    if report.has_failures() {
        EXIT_PARTIAL
    } else {
        0
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn outcome_line(id: &str, outcome: MigrationOutcome, dry_run: bool) -> String {
    match outcome {
        MigrationOutcome::Applied if dry_run => format!("{}: would apply (dry run)", id),
        MigrationOutcome::Applied => format!("{}: applied", id),
        MigrationOutcome::Skipped(reason) => format!("{}: skipped ({})", id, reason),
    }
}

fn outcome_json(id: &str, outcome: MigrationOutcome, dry_run: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "outcome": outcome,
        "applied": bool::from(outcome) && !dry_run,
        "dry_run": dry_run,
    })
}

fn print_outcome(
    id: &str,
    outcome: MigrationOutcome,
    dry_run: bool,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            let value = outcome_json(id, outcome, dry_run);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Table => println!("{}", outcome_line(id, outcome, dry_run)),
    }
    Ok(())
}

fn print_batch(report: &BatchReport, format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let mut table = new_table();
    table.set_header(vec!["id", "result", "detail"]);
    for id in &report.applied {
        table.add_row(vec![id.as_str(), "applied", ""]);
    }
    for skipped in &report.skipped {
        table.add_row(vec![
            skipped.id.clone(),
            "skipped".to_string(),
            skipped.reason.to_string(),
        ]);
    }
    for failed in &report.failed {
        table.add_row(vec![failed.id.as_str(), "failed", failed.error.as_str()]);
    }

    println!("{}", table);
    println!(
        "{} {}: {} applied, {} skipped, {} failed{}{}",
        report.direction,
        if report.dry_run { "(dry run)" } else { "pass" },
        report.applied.len(),
        report.skipped.len(),
        report.failed.len(),
        if report.aborted { ", aborted" } else { "" },
        if report.processed() == 0 { ", no candidates" } else { "" },
    );
    Ok(())
}

fn print_plan(plan: &[PlannedEntity], format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("(no candidates)");
        return Ok(());
    }

    let mut table = new_table();
    table.set_header(vec!["id", "would"]);
    for entry in plan {
        let would = match &entry.outcome {
            PlannedOutcome::Apply => "apply".to_string(),
            PlannedOutcome::Skip(reason) => format!("skip: {}", reason),
            PlannedOutcome::Fail(error) => format!("fail: {}", error),
        };
        table.add_row(vec![entry.id.clone(), would]);
    }
    println!("{}", table);
    println!("{} candidate(s)", plan.len());
    Ok(())
}

fn print_view(view: &ContributorView, format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    println!("Contributor: {}", view.id);
    println!("Migrated:    {}", view.migrated);

    let mut table = new_table();
    table.set_header(vec!["field", "value"]);
    for (name, value) in view.identity.fields() {
        table.add_row(vec![name, value.unwrap_or("null")]);
    }
    println!("{}", table);

    if !view.aliases.is_empty() {
        let mut aliases = new_table();
        aliases.set_header(vec!["primary", "openid", "email"]);
        for alias in &view.aliases {
            aliases.add_row(vec![
                alias.is_primary.to_string(),
                alias.identity.openid.clone().unwrap_or_default(),
                alias.identity.email.clone().unwrap_or_default(),
            ]);
        }
        println!("{}", aliases);
    }
    Ok(())
}

fn print_audit(report: &AuditReport, format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Contributors: {} ({} migrated), aliases: {}",
        report.contributors, report.migrated, report.aliases
    );
    if report.is_clean() {
        println!("No violations");
        return Ok(());
    }

    let mut table = new_table();
    table.set_header(vec!["entity", "violation"]);
    for violation in &report.violations {
        table.add_row(vec![violation.entity.clone(), violation.kind.to_string()]);
    }
    println!("{}", table);
    println!("{} violation(s)", report.violations.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliasgraph::SkipReason;

    #[test]
    fn test_outcome_line_marks_dry_run() {
        assert_eq!(outcome_line("u1", MigrationOutcome::Applied, false), "u1: applied");
        assert_eq!(
            outcome_line("u1", MigrationOutcome::Applied, true),
            "u1: would apply (dry run)"
        );
        let skipped = MigrationOutcome::Skipped(SkipReason::NoIdentity);
        assert!(outcome_line("u1", skipped, true).starts_with("u1: skipped ("));
    }

    #[test]
    fn test_outcome_json_marks_dry_run() {
        let value = outcome_json("u1", MigrationOutcome::Applied, true);
        assert_eq!(value["dry_run"], true);
        assert_eq!(value["applied"], false);

        let value = outcome_json("u1", MigrationOutcome::Applied, false);
        assert_eq!(value["dry_run"], false);
        assert_eq!(value["applied"], true);
    }

    #[test]
    fn test_mutating_commands() {
        assert!(Commands::MigrateAll.mutates());
        assert!(Commands::RevertOne { id: "u1".to_string() }.mutates());
        assert!(!Commands::Audit.mutates());
        assert!(!Commands::Show { key: "u1".to_string() }.mutates());
    }
}
