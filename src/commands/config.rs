use crate::core::config::{ConfigStore, FusionConfig};
use crate::ui::print_config_summary;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

pub fn handle_config(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", sub_matches)) => show(sub_matches.get_flag("json")),
        Some(("init", sub_matches)) => init(sub_matches.get_flag("force")),
        Some(("validate", sub_matches)) => validate(sub_matches.get_one::<String>("file")),
        Some(("path", _)) => {
            println!("{}", ConfigStore::get_config_path()?.display());
            Ok(())
        }
        _ => {
            println!("Use 'vigil config --help' for more information.");
            Ok(())
        }
    }
}

fn show(json: bool) -> Result<()> {
    let config = ConfigStore::load()?;
    if json {
        println!("{}", config.to_json_pretty()?);
    } else {
        print_config_summary(&config);
    }
    Ok(())
}

fn init(force: bool) -> Result<()> {
    let path = ConfigStore::get_config_path()?;
    if path.exists() && !force {
        println!(
            "{}",
            format!("Config already exists at {}", path.display()).yellow()
        );
        println!("{}", "Use --force to overwrite it with defaults.".dimmed());
        return Ok(());
    }

    let path = ConfigStore::save(&FusionConfig::default())?;
    println!(
        "{} {}",
        "✓ Wrote default configuration to".green(),
        path.display()
    );
    Ok(())
}

fn validate(file: Option<&String>) -> Result<()> {
    let path = match file {
        Some(f) => Path::new(f).to_path_buf(),
        None => ConfigStore::get_config_path()?,
    };

    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }

    let config = ConfigStore::load_from(&path)
        .with_context(|| format!("Validation failed for {}", path.display()))?;

    println!("{} {}", "✓ Valid configuration:".green(), path.display());
    print_config_summary(&config);
    Ok(())
}
