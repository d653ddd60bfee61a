use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tidelog_cli::cli::{Cli, Commands};
use tidelog_cli::commands::{
    cmd_create, cmd_export, cmd_feed, cmd_filled, cmd_get, cmd_info, cmd_latest, cmd_list,
    cmd_submit,
};
use tidelog_cli::config::Config;
use tidelog_cli::format::FormatOptions;
use tidelog_store::Store;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = Config::load_validated(cli.config.as_deref())?;
    let db_path = cli.database.clone().unwrap_or_else(|| config.storage.path.clone());
    let caller = cli
        .caller
        .clone()
        .unwrap_or_else(|| config.identity.caller.clone());
    tracing::debug!("Using database {} as {}", db_path.display(), caller);

    let store = Store::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?
        .with_policy(config.policy());
    let opts = FormatOptions::new(cli.json);

    let content = match cli.command {
        Commands::Create { name, owner } => {
            let mut store = store;
            let owner = owner.unwrap_or_else(|| caller.clone());
            cmd_create(&mut store, &name, &owner, &opts)?
        }
        Commands::Submit { device, values, at } => {
            cmd_submit(store, device.device, values, at, &caller, &opts)?
        }
        Commands::Get {
            device,
            day,
            minute,
        } => cmd_get(&store, device.device, day, minute, &opts)?,
        Commands::Latest { device } => cmd_latest(&store, device.device, &opts)?,
        Commands::Filled { device, day } => cmd_filled(&store, device.device, day, &opts)?,
        Commands::List => cmd_list(&store, &opts)?,
        Commands::Info { device } => cmd_info(&store, device.device, &opts)?,
        Commands::Export { device, day } => {
            if cli.json {
                bail!("export always writes CSV; --json is not supported");
            }
            let stdout = io::stdout();
            let rows = cmd_export(&store, device.device, day, stdout.lock())?;
            if !cli.quiet {
                tracing::info!("Exported {} readings", rows);
            }
            return Ok(());
        }
        Commands::Feed { device, limit } => cmd_feed(&store, device, limit, &opts)?,
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
