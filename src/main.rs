mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use music_indexer::config::load_configuration;
use music_indexer::hasher::AudioContentHasher;
use music_indexer::signals::SignalListener;
use music_indexer::storage::{CatalogStore, SqliteCatalog};
use music_indexer::tags::LoftyTagReader;
use music_indexer::{
    AppConfig, Daemon, FullScanResult, ReconcileOptions, Reconciler, ShutdownToken,
};
use std::process;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let mut config = match load_configuration(args.config.as_deref(), args.root.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };
    args.apply_overrides(&mut config);

    if let Some(Commands::PrintConfig) = args.command {
        println!("Configuration: {:#?}", config);
        return;
    }

    if !matches!(args.command, Some(Commands::Count)) {
        if let Err(err) = config.validate() {
            eprintln!("Invalid configuration: {}", err);
            process::exit(1);
        }
    }

    let _guard = match logging::init_logger(args.log_level.as_deref(), config.log_file.as_deref())
    {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Error initialising logging: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Count) => run_count(&config),
        Some(Commands::Scan) => run_scan(config),
        Some(Commands::Run) | None => run_daemon(config),
        Some(Commands::PrintConfig) => Ok(()),
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn open_catalog(config: &AppConfig) -> anyhow::Result<SqliteCatalog> {
    let mut catalog = SqliteCatalog::open(&config.database_path).with_context(|| {
        format!(
            "Error opening catalog {}",
            config.database_path.display()
        )
    })?;
    catalog.load_table_meta()?;
    Ok(catalog)
}

fn build_daemon(config: AppConfig, shutdown: ShutdownToken) -> anyhow::Result<Daemon> {
    let catalog = open_catalog(&config)?;
    let reconciler = Reconciler::new(
        Box::new(LoftyTagReader::new()),
        Box::new(AudioContentHasher::new()),
        ReconcileOptions {
            cleanup: config.cleanup,
            persist_hashes: false,
        },
    );
    Ok(Daemon::new(config, Box::new(catalog), reconciler, shutdown))
}

fn run_count(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    println!("{} songs in catalog", catalog.count()?);
    Ok(())
}

fn run_scan(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = ShutdownToken::new();
    let signals = SignalListener::install(shutdown.clone())?;
    let mut daemon = build_daemon(config, shutdown)?;

    let result = daemon.full_scan();
    signals.close();
    print_summary(&result?);
    Ok(())
}

fn run_daemon(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = ShutdownToken::new();
    let signals = SignalListener::install(shutdown.clone())?;
    let mut daemon = build_daemon(config, shutdown.clone())?;

    let result = start_and_run(&mut daemon);
    shutdown.trigger();
    signals.close();
    result
}

fn start_and_run(daemon: &mut Daemon) -> anyhow::Result<()> {
    // Watch first so changes made during the startup scan are not lost.
    let notifier = if daemon.config().watch {
        Some(daemon.start_notifier()?)
    } else {
        None
    };

    match daemon.startup() {
        Ok(Some(result)) => print_summary(&result),
        Ok(None) => {}
        Err(music_indexer::Error::Cancelled) => {
            info!("Shutdown requested during startup");
            if let Some(notifier) = notifier {
                notifier.stop();
            }
            return Ok(());
        }
        Err(err) => {
            if let Some(notifier) = notifier {
                notifier.stop();
            }
            return Err(err.into());
        }
    }

    daemon.run(notifier)?;
    Ok(())
}

fn print_summary(result: &FullScanResult) {
    let stats = &result.stats;
    info!(
        "Scanned {} file(s) in {}",
        format!("{}", stats.files_seen).cyan(),
        format!("{:.2}s", stats.duration.as_secs_f64()).green(),
    );
    info!(
        "{} inserted, {} updated, {} moved, {} touched, {} unchanged, {} failed",
        format!("{}", stats.inserted).green(),
        format!("{}", stats.updated).yellow(),
        format!("{}", stats.moved).yellow(),
        format!("{}", stats.touched).cyan(),
        format!("{}", stats.unchanged).cyan(),
        format!("{}", stats.failed).red(),
    );
    if stats.interrupted {
        info!("{}", "Scan interrupted before completion".red());
    }
    if let Some(removed) = result.removed_stale {
        info!(
            "{} stale row(s) removed (last seen before {})",
            format!("{}", removed).red(),
            result.watermark
        );
    }
}
