use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use acthistory::config::{Config, OutputFormat};
use acthistory::date::RelativeDateParser;
use acthistory::db::ActSnapshot;
use acthistory::hierarchy::{HierarchyEntry, MaxDepth};
use acthistory::history::{CategorySelection, PatientHistoryQuery};
use acthistory::models::SortDirection;

#[derive(Parser)]
#[command(name = "acthistory")]
#[command(about = "Browse the medical history of a patient from an act snapshot")]
struct Args {
    /// Settings file (TOML or JSON); ACTHISTORY_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the full history of a patient
    History(HistoryArgs),
    /// Print events with their immediate items only
    Summary(HistoryArgs),
    /// Resolve a relative date expression such as "-3y 6m" or "0qs"
    ParseDate {
        #[arg(allow_hyphen_values = true)]
        expression: String,
        /// Reference date, defaults to today
        #[arg(long)]
        relative_to: Option<NaiveDate>,
    },
}

#[derive(clap::Args)]
struct HistoryArgs {
    /// Snapshot file, defaults to ACTHISTORY_SNAPSHOT
    #[arg(long)]
    snapshot: Option<PathBuf>,

    #[arg(long)]
    patient: String,

    /// Earliest event date: YYYY-MM-DD or a relative expression
    #[arg(long, allow_hyphen_values = true)]
    from: Option<String>,

    /// Latest event date: YYYY-MM-DD or a relative expression
    #[arg(long, allow_hyphen_values = true)]
    to: Option<String>,

    /// Reference date for relative bounds, defaults to today
    #[arg(long)]
    relative_to: Option<NaiveDate>,

    /// "all" or a single item category such as "note" or "letter"
    #[arg(long, default_value = "all")]
    category: CategorySelection,

    /// Leave out invoice items
    #[arg(long)]
    no_charges: bool,

    /// Most recent items first
    #[arg(long)]
    descending: bool,

    /// -1 for unbounded
    #[arg(long, allow_hyphen_values = true)]
    max_depth: Option<MaxDepth>,

    #[arg(long)]
    format: Option<OutputFormat>,
}

#[derive(Serialize)]
struct EntryView<'a> {
    depth: usize,
    id: &'a str,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl<'a> From<&HierarchyEntry<'a>> for EntryView<'a> {
    fn from(entry: &HierarchyEntry<'a>) -> Self {
        Self {
            depth: entry.depth,
            id: entry.act.id.as_str(),
            category: entry.act.category.to_string(),
            start_time: entry.act.activity_start().map(|start| start.to_rfc3339()),
            description: entry.act.description.as_deref(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Config::from_env(),
    };

    init_tracing(config.log_json);

    match args.command {
        Command::History(history) => run_history(history, &config, false),
        Command::Summary(history) => run_history(history, &config, true),
        Command::ParseDate {
            expression,
            relative_to,
        } => {
            let reference = relative_to.unwrap_or_else(|| Local::now().date_naive());
            let date = RelativeDateParser::parse(&expression, reference)
                .ok_or_else(|| anyhow!("Invalid relative date: {}", expression))?;
            println!("{}", date);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "acthistory=info".into()),
    );
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run_history(args: HistoryArgs, config: &Config, summary: bool) -> anyhow::Result<()> {
    let path = args
        .snapshot
        .or_else(|| config.snapshot.clone())
        .ok_or_else(|| anyhow!("No snapshot given: pass --snapshot or set ACTHISTORY_SNAPSHOT"))?;
    let snapshot = ActSnapshot::from_path(&path)
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;

    let reference = args
        .relative_to
        .unwrap_or_else(|| Local::now().date_naive());
    let mut query =
        PatientHistoryQuery::from_config(args.patient, config)?.with_selection(args.category);
    if args.no_charges {
        query = query.with_charges(false);
    }
    if args.descending {
        query = query.with_direction(SortDirection::Descending);
    }
    if let Some(max_depth) = args.max_depth {
        query = query.with_max_depth(max_depth);
    }
    if let Some(from) = &args.from {
        query = query.with_from_expression(from, reference)?;
    }
    if let Some(to) = &args.to {
        query = query.with_to_expression(to, reference)?;
    }

    let iter = if summary {
        query.summary(&snapshot)
    } else {
        query.iter(&snapshot)
    };
    let entries: Vec<HierarchyEntry<'_>> = iter.entries().collect();
    tracing::info!(
        patient = query.patient(),
        events = iter.events().len(),
        acts = entries.len(),
        "Built patient history"
    );

    match args.format.unwrap_or(config.output) {
        OutputFormat::Text => {
            for entry in &entries {
                println!("{}", render_line(entry));
            }
        }
        OutputFormat::Json => {
            let views: Vec<EntryView<'_>> = entries.iter().map(EntryView::from).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
    }
    Ok(())
}

fn render_line(entry: &HierarchyEntry<'_>) -> String {
    let act = entry.act;
    let start = act
        .activity_start()
        .map(|start| start.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}{} [{}] {}",
        "  ".repeat(entry.depth.saturating_sub(1)),
        start,
        act.category,
        act.id
    );
    if let Some(description) = &act.description {
        line.push_str(": ");
        line.push_str(description);
    }
    line
}
