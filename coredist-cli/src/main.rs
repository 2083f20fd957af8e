//! coredist CLI
//!
//! Command-line interface for building the distribution catalog and
//! compiling per-system game identification databases.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use coredist_build::{BuildStepRegistry, Propagator, ScriptArchiveStep, Transformer};
use coredist_catalog::types::GameList;
use coredist_db::{SystemMetadata, create_database, ingest_system};

#[derive(Parser)]
#[command(name = "coredist")]
#[command(about = "Build versioned, integrity-verified distribution catalogs", long_about = None)]
struct Cli {
    /// Enable database query tracing and verbose diagnostics
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the distribution tree from a source tree and stamp the catalog
    Build {
        /// Source tree root
        #[arg(short, long)]
        source: PathBuf,

        /// Destination for the distribution tree
        #[arg(short, long)]
        dest: PathBuf,
    },

    /// Compile a system's game list into an identification database
    Gamedb {
        /// Game list JSON file
        #[arg(long)]
        games: PathBuf,

        /// Output database path
        #[arg(long)]
        out: PathBuf,

        /// Optional system metadata JSON file
        #[arg(long)]
        system_meta: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { source, dest } => run_build(&source, &dest),
        Commands::Gamedb {
            games,
            out,
            system_meta,
        } => run_gamedb(&games, &out, system_meta.as_deref(), cli.debug),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!(
                "{} {}",
                "\u{2718}".if_supports_color(Stdout, |t| t.red()),
                message,
            );
            ExitCode::FAILURE
        }
    }
}

/// Build steps, registered once at startup. The registry is the only
/// indirection point for directory-local build overrides.
fn create_registry() -> BuildStepRegistry {
    let mut registry = BuildStepRegistry::new();

    // The DOS system ships its loader script wrapped in a one-entry archive
    // alongside the usual catalog documents.
    registry.register(
        "systems/dos",
        Box::new(ScriptArchiveStep {
            script: "loader.js".to_string(),
            archive_name: "loader.json.zip".to_string(),
            entry_name: "loader.json".to_string(),
        }),
    );

    registry
}

fn run_build(source: &std::path::Path, dest: &std::path::Path) -> Result<(), String> {
    println!(
        "Building distribution tree: {} {} {}",
        source.display().if_supports_color(Stdout, |t| t.cyan()),
        "\u{2192}".if_supports_color(Stdout, |t| t.dimmed()),
        dest.display().if_supports_color(Stdout, |t| t.cyan()),
    );

    Transformer::new(source, create_registry())
        .run(dest)
        .map_err(|e| format!("transform failed: {e}"))?;
    println!(
        "{} source tree transformed",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
    );

    let catalog = Propagator::new(dest)
        .map_err(|e| format!("propagation setup failed: {e}"))?
        .run()
        .map_err(|e| format!("propagation failed: {e}"))?;

    println!(
        "{} catalog stamped (build {})",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        catalog.version,
    );
    println!(
        "  cores: {}, systems: {}, releases: {}",
        catalog.cores.version, catalog.systems.version, catalog.releases.version,
    );
    Ok(())
}

fn run_gamedb(
    games: &std::path::Path,
    out: &std::path::Path,
    system_meta: Option<&std::path::Path>,
    debug: bool,
) -> Result<(), String> {
    let text = fs::read_to_string(games)
        .map_err(|e| format!("cannot read {}: {e}", games.display()))?;
    let list: GameList = serde_json::from_str(&text)
        .map_err(|e| format!("invalid game list {}: {e}", games.display()))?;

    let meta = match system_meta {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("invalid system metadata {}: {e}", path.display()))?
        }
        None => SystemMetadata::default(),
    };

    let mut conn =
        create_database(out).map_err(|e| format!("cannot create {}: {e}", out.display()))?;
    if debug {
        conn.trace(Some(|sql| log::debug!("sql: {sql}")));
    }

    let pb = ProgressBar::new(list.games.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("  {bar:30.cyan} {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    let progress = |done: usize, _total: usize, name: &str| {
        pb.set_position(done as u64);
        pb.set_message(name.to_string());
    };

    let stats = ingest_system(&conn, &meta, &list, Some(&progress))
        .map_err(|e| format!("ingestion failed: {e}"))?;
    pb.finish_and_clear();

    println!(
        "{} {} written",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        out.display().if_supports_color(Stdout, |t| t.bold()),
    );
    println!(
        "  {} games, {} sources, {} tag links, {} region links, {} language links, {} playlist links",
        stats.games,
        stats.sources,
        stats.tag_links,
        stats.region_links,
        stats.language_links,
        stats.playlist_links,
    );
    Ok(())
}
