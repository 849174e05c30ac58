use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use song_identifier::cli::Cli;
use song_identifier::logging::init_logging;
use song_identifier::{Config, Pipeline, StdinPrompt};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::get_config_path().context("cannot locate the saved defaults")?,
    };
    let saved_config = Config::load_from(&config_path)?;

    if cli.show_saved_defaults {
        println!("Defaults file: {}", config_path.display());
        println!();
        saved_config.print("Saved configuration");
        return Ok(());
    }

    let cmdline_config = cli.to_config();

    if cli.save_defaults {
        let mut config_to_save = saved_config.clone();
        config_to_save.merge(&cmdline_config);
        config_to_save
            .save_to(&config_path)
            .with_context(|| format!("saving defaults to {}", config_path.display()))?;

        println!("Defaults saved to {}", config_path.display());
        println!();
        config_to_save.print("Saved configuration");
        return Ok(());
    }

    // Built-in defaults, then the saved file, then environment and flags.
    let mut effective_config = Config::builtin_defaults();
    effective_config.merge(&saved_config);
    effective_config.merge(&cmdline_config);

    let settings = effective_config.resolve()?;
    init_logging(settings.debug);
    if settings.debug {
        effective_config.print("Effective configuration");
    }

    let mut pipeline = Pipeline::from_settings(&settings)?;
    pipeline.run(&mut StdinPrompt);
    Ok(())
}
