mod cli;
mod commands;
mod config;
mod logging;
mod output;
mod params;

use anyhow::{Context, Result};
use clap::Parser;
use nautobot_client::NautobotClient;

use cli::{Cli, Commands};
use config::ConfigStore;
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level);

    let store = ConfigStore::default_location()?;
    let profile = store.load_profile(&cli.profile)?;
    let format = config::resolve_format(&cli, &profile)?;

    match &cli.command {
        Commands::Apply(args) => {
            let client_config = config::resolve_client_config(&cli, &profile)?;
            let client =
                NautobotClient::new(&client_config).context("Failed to create Nautobot client")?;
            commands::apply::run(&client, args, format).await?;
        }
        Commands::Kinds(args) => commands::kinds::run(args, format)?,
        Commands::Config(args) => commands::config::run(&store, &cli.profile, &args.command)?,
    }

    Ok(())
}
