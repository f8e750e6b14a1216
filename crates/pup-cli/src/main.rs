use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pup_cli::commands::{
    delete, dismiss, events, history, log, patterns, status, streak, timeline,
};
use pup_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(pup_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = pup_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init so a subscriber installed by a test harness is not an error
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let now = Utc::now();
    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Log(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            log::run(&mut stdout, db, &config, args, now, &Local)?;
        }
        Some(Commands::Status { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, db, &config, *json, now, &Local)?;
        }
        Some(Commands::Timeline { date, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            timeline::run(&mut stdout, &db, &config, *date, *json, now, &Local)?;
        }
        Some(Commands::Streak) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            streak::run(&mut stdout, &db)?;
        }
        Some(Commands::Patterns { days }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            patterns::run(&mut stdout, &db, *days, now)?;
        }
        Some(Commands::Events { after, before }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            events::run(&mut stdout, &db, after.as_deref(), before.as_deref(), now)?;
        }
        Some(Commands::History { days, types }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            history::run(&mut stdout, &db, *days, types, now, &Local)?;
        }
        Some(Commands::Delete { id }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            delete::run(&mut stdout, db, &config, id, now)?;
        }
        Some(Commands::DismissSleep) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            dismiss::run(&mut stdout, db, &config, now)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
