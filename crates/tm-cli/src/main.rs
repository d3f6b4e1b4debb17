use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Parser, Subcommand};
use tm_core::snapshot::WireEntry;
use tm_core::{AbsoluteDateTime, Date, Event, Marker, Relations, TimePoint, TimeSpec};
use tm_store::Database;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tm", about = "Temporal marker store")]
struct Cli {
    /// Data directory (defaults to $TM_DATA_DIR, then ~/.timemarks)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize an empty data directory
    Init,

    /// Add an absolute date and time
    AddDatetime {
        /// RFC 3339 timestamp, e.g. 2021-04-17T10:46:34+01:00
        #[arg(value_parser = parse_datetime)]
        at: DateTime<FixedOffset>,

        #[arg(long)]
        label: Option<String>,
    },

    /// Add a calendar date
    AddDate {
        /// YYYY-MM-DD
        date: NaiveDate,

        #[arg(long)]
        label: Option<String>,
    },

    /// Add an event, placed either by value (--at/--on) or by relations
    AddEvent {
        name: String,

        #[arg(long)]
        description: Option<String>,

        /// Event happened at this instant
        #[arg(
            long,
            value_parser = parse_datetime,
            conflicts_with_all = ["on", "before", "same", "after"]
        )]
        at: Option<DateTime<FixedOffset>>,

        /// Event happened on this date
        #[arg(long, conflicts_with_all = ["before", "same", "after"])]
        on: Option<NaiveDate>,

        /// Marker this event precedes (repeatable)
        #[arg(long)]
        before: Vec<Uuid>,

        /// Marker this event coincides with (repeatable)
        #[arg(long)]
        same: Vec<Uuid>,

        /// Marker this event follows (repeatable)
        #[arg(long)]
        after: Vec<Uuid>,
    },

    /// List all markers
    List,

    /// Show one marker as JSON
    Show { id: Uuid },

    /// Report dangling references and ordering conflicts
    Check,
}

fn parse_datetime(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

fn data_dir(cli: &Cli) -> PathBuf {
    cli.dir
        .clone()
        .or_else(|| std::env::var("TM_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(tm_store::default_base_dir)
}

fn open_db(cli: &Cli) -> Result<Database> {
    let dir = data_dir(cli);
    Database::open(&dir, true).with_context(|| format!("failed to open {}", dir.display()))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Init => cmd_init(&cli),
        Commands::AddDatetime { at, label } => {
            let mut marker = AbsoluteDateTime::new(*at);
            marker.label = label.clone();
            cmd_add(&cli, marker.into())
        }
        Commands::AddDate { date, label } => {
            let mut marker = Date::new(*date);
            marker.label = label.clone();
            cmd_add(&cli, marker.into())
        }
        Commands::AddEvent {
            name,
            description,
            at,
            on,
            before,
            same,
            after,
        } => {
            let timespec = match (at, on) {
                (Some(at), _) => TimeSpec::Implicit(TimePoint::Instant(*at)),
                (None, Some(on)) => TimeSpec::Implicit(TimePoint::Day(*on)),
                (None, None) => TimeSpec::Explicit(Relations {
                    befores: before.iter().copied().collect(),
                    sames: same.iter().copied().collect(),
                    afters: after.iter().copied().collect(),
                }),
            };
            let mut event = Event::new(name.as_str(), timespec);
            event.description = description.clone();
            cmd_add(&cli, event.into())
        }
        Commands::List => cmd_list(&cli),
        Commands::Show { id } => cmd_show(&cli, id),
        Commands::Check => cmd_check(&cli),
    }
}

fn cmd_init(cli: &Cli) -> Result<()> {
    let dir = data_dir(cli);
    Database::init(&dir).with_context(|| format!("failed to initialize {}", dir.display()))?;
    println!("initialized {}", dir.display());
    Ok(())
}

fn cmd_add(cli: &Cli, marker: Marker) -> Result<()> {
    let mut db = open_db(cli)?;
    let id = marker.id();
    db.collection_mut()
        .add_item(marker)
        .context("failed to add marker")?;
    db.write().context("failed to save collection")?;
    tracing::info!("added {id}");

    println!("{id}");
    if !db.collection().is_self_contained() {
        warn_dangling(db.dir(), db.collection().dangling_refs().len());
    }
    Ok(())
}

fn warn_dangling(dir: &Path, count: usize) {
    eprintln!(
        "note: {count} referenced marker(s) not yet in {}",
        dir.display()
    );
}

fn cmd_list(cli: &Cli) -> Result<()> {
    let db = open_db(cli)?;
    let mut markers: Vec<&Marker> = db.collection().markers().collect();
    markers.sort_by_key(|m| m.id());
    for marker in markers {
        println!("{}  {:<18}  {}", marker.id(), marker.kind(), marker.summary());
    }
    Ok(())
}

fn cmd_show(cli: &Cli, id: &Uuid) -> Result<()> {
    let db = open_db(cli)?;
    let marker = db.collection().get_item(id)?;
    let entry = WireEntry::from_marker(marker).context("failed to serialize marker")?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn cmd_check(cli: &Cli) -> Result<()> {
    let db = open_db(cli)?;
    let collection = db.collection();

    let mut missing: Vec<(&Uuid, usize)> = collection
        .dangling_refs()
        .iter()
        .map(|(id, referrers)| (id, referrers.len()))
        .collect();
    missing.sort();
    for (id, referrers) in &missing {
        println!("dangling: {id} (referenced by {referrers})");
    }

    let cycles = match collection.conflicts() {
        Ok(cycles) => cycles,
        Err(e) => bail!("cannot verify ordering: {e}"),
    };
    for cycle in &cycles {
        let path: Vec<String> = cycle.iter().map(Uuid::to_string).collect();
        println!("conflict: {}", path.join(" -> "));
    }

    if cycles.is_empty() {
        println!(
            "ok: {} markers, {} dangling, no conflicts",
            collection.len(),
            missing.len()
        );
        Ok(())
    } else {
        bail!("{} conflict(s) found", cycles.len())
    }
}
