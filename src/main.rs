//! Family Ledger CLI
//!
//! # Commands
//!
//! - `record` (default): enter members interactively
//! - `uid`: print one generated identifier
//! - `list`: print a generation's collection as YAML or JSON
//! - `stats`: summary counts over all collections

use std::io;
use std::path::PathBuf;
use std::process::{self, ExitCode};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use family_ledger::storage::scalar;
use family_ledger::{
    uid, EntrySession, Gender, GenerationStore, LedgerConfig, LedgerError, LedgerStats, Result,
    SessionSummary, YamlStore,
};

/// Exit status after Ctrl-C, as shells report SIGINT.
const INTERRUPTED: i32 = 130;

/// Genealogical record entry with per-generation YAML collections
#[derive(Parser)]
#[command(name = "family-ledger")]
#[command(version)]
#[command(about = "Enter family members and append them to per-generation YAML files")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML config file (defaults to ./family_ledger.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the generation files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enter members interactively (Ctrl-D to finish)
    Record,
    /// Print a freshly generated identifier
    Uid {
        #[arg(short, long)]
        generation: u32,
        #[arg(short, long)]
        name: String,
    },
    /// Print the members of one generation
    List {
        #[arg(short, long)]
        generation: u32,
        /// Emit JSON instead of the stored YAML
        #[arg(long)]
        json: bool,
    },
    /// Print summary counts over all generations
    Stats {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // stdout belongs to the prompts
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = LedgerConfig::discover(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.validate()?;
    info!(data_dir = %config.data_dir.display(), on_corrupt = ?config.on_corrupt, "config loaded");

    let store = YamlStore::from_config(&config);
    match cli.command.unwrap_or(Commands::Record) {
        Commands::Record => record(store),
        Commands::Uid { generation, name } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(LedgerError::MissingName);
            }
            println!("{}", uid::generate(generation, name));
            Ok(())
        }
        Commands::List { generation, json } => list(&store, generation, json),
        Commands::Stats { json } => stats(&store, json),
    }
}

fn record(store: YamlStore) -> Result<()> {
    println!("==========================================");
    println!("          Family Ledger: member entry      ");
    println!("==========================================");
    println!("Data directory: {}", store.base_dir().display());

    if !store.atomic_writes() {
        warn!("atomic_writes is off: Ctrl-C during a save can truncate a collection");
    }

    let stdin = io::stdin();
    let mut session = EntrySession::new(stdin.lock(), io::stdout(), store);
    spawn_interrupt_handler(session.progress())?;
    let summary = session.run()?;
    info!(saved = summary.saved, failed = summary.failed, "session finished");
    Ok(())
}

/// On Ctrl-C, wait for any save in progress, print the summary and exit.
fn spawn_interrupt_handler(progress: Arc<Mutex<SessionSummary>>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()?;
    thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!(error = %e, "Ctrl-C handler unavailable");
                    return;
                }
                // Held until exit so no further save can start.
                let summary = progress.lock().unwrap_or_else(PoisonError::into_inner);
                info!(saved = summary.saved, failed = summary.failed, "interrupted");
                println!("\nBye ({} saved, {} failed)", summary.saved, summary.failed);
                process::exit(INTERRUPTED);
            })
        })?;
    Ok(())
}

fn list(store: &YamlStore, generation: u32, json: bool) -> Result<()> {
    if json {
        let records = store.load(generation)?;
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        let entries = store.read_entries(generation)?;
        print!("{}", scalar::render(&entries)?);
    }
    Ok(())
}

fn stats(store: &YamlStore, json: bool) -> Result<()> {
    let stats = LedgerStats::collect(store)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Members:   {}", stats.total);
    println!("{}:        {}", Gender::Male.label(), stats.male);
    println!("{}:        {}", Gender::Female.label(), stats.female);
    println!("Alive:     {}", stats.alive);
    println!("Deceased:  {}", stats.deceased);
    println!("Per generation:");
    for (generation, count) in &stats.per_generation {
        println!("  G{generation}: {count}");
    }
    if !stats.generation_chars.is_empty() {
        let ranked: Vec<String> = stats
            .generation_chars
            .iter()
            .map(|(c, n)| format!("{c}×{n}"))
            .collect();
        println!("Generation characters: {}", ranked.join(" "));
    }
    println!("Living members by age:");
    for (band, count) in &stats.age_groups {
        println!("  {band:>5}: {count}");
    }
    Ok(())
}
