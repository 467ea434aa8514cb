use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::ConfigStore;
use crate::output::print_success;

fn mask(token: &str) -> String {
    let count = token.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = token.chars().skip(count - 4).collect();
    format!("****{tail}")
}

pub fn run(store: &ConfigStore, profile: &str, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let cfg = store.load_profile(profile)?;
            println!("{}: {}", "Config file".cyan(), store.path().display());
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "URL".cyan(), cfg.url.as_deref().unwrap_or("(not set)"));
            println!(
                "{}: {}",
                "Token".cyan(),
                cfg.token.as_deref().map_or_else(|| "(not set)".to_string(), mask)
            );
            println!(
                "{}: {}",
                "Validate certs".cyan(),
                cfg.validate_certs.unwrap_or(true)
            );
            println!(
                "{}: {}s",
                "Timeout".cyan(),
                cfg.timeout.unwrap_or(nautobot_client::DEFAULT_TIMEOUT.as_secs())
            );
            println!(
                "{}: {}",
                "Format".cyan(),
                cfg.format.as_deref().unwrap_or("json")
            );
        }
        ConfigCommands::Set(args) => {
            let mut cfg = store.load_profile(profile)?;
            cfg.set(&args.key, &args.value)?;
            store.save_profile(profile, &cfg)?;
            let shown = if args.key == "token" {
                mask(&args.value)
            } else {
                args.value.clone()
            };
            print_success(&format!("Set {} = {} (profile {profile})", args.key, shown));
        }
    }
    Ok(())
}
