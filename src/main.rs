//! Heroes Core - Entry Point
//!
//! Small command line front end over the data loader and the action core:
//! find the newest patch of a data file, dump a unit template, or play a
//! few turns of a scripted action against a unit and print the retained
//! outcomes.

use clap::{Parser, Subcommand};
use heroes_core::actions::Action;
use heroes_core::core::config::CoreConfig;
use heroes_core::core::error::{CoreError, Result};
use heroes_core::data::path::resolve_all;
use heroes_core::data::template::{JsonTemplateSource, TemplateSource};
use heroes_core::schedule::{Outcome, Timeline};
use heroes_core::unit::Unit;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Inspect unit data and run scripted actions
#[derive(Parser, Debug)]
#[command(name = "heroes-core")]
#[command(about = "Resolve versioned unit data and run scripted unit actions")]
struct Args {
    /// TOML config file (defaults plus HEROES_DATA_PATH otherwise)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data root directory
    #[arg(long)]
    data_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the newest data file matching a file-name glob
    Resolve {
        pattern: String,

        /// Print every match in resolution order instead
        #[arg(long)]
        all: bool,
    },

    /// Load a unit template and print it as JSON
    Inspect {
        pattern: String,

        /// Select the object stored under this key
        #[arg(long)]
        key: Option<String>,
    },

    /// Apply a numeric change to one field for a number of turns
    Simulate {
        pattern: String,

        #[arg(long)]
        key: Option<String>,

        /// Field to change each turn
        #[arg(long, default_value = "hp")]
        field: String,

        #[arg(long, default_value_t = -10, allow_hyphen_values = true)]
        delta: i64,

        #[arg(long, default_value_t = 3)]
        turns: u32,

        /// Reset the unit to its defaults after the last turn
        #[arg(long)]
        reset: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("heroes_core=info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!("Using data root {}", config.data_root.display());

    match args.command {
        Command::Resolve { pattern, all } => resolve(&config, &pattern, all),
        Command::Inspect { pattern, key } => inspect(&config, &pattern, key),
        Command::Simulate {
            pattern,
            key,
            field,
            delta,
            turns,
            reset,
        } => simulate(&config, &pattern, key, &field, delta, turns, reset),
    }
}

fn load_config(args: &Args) -> Result<CoreConfig> {
    let mut config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::from_env(),
    };
    if let Some(root) = &args.data_root {
        config.data_root = root.clone();
    }
    config.validate()?;
    Ok(config)
}

fn source_for(config: &CoreConfig, pattern: &str, key: Option<String>) -> JsonTemplateSource {
    let kind = key.clone().unwrap_or_else(|| pattern.to_string());
    let source = JsonTemplateSource::new(kind, pattern, config);
    match key {
        Some(key) => source.with_key(key),
        None => source,
    }
}

fn resolve(config: &CoreConfig, pattern: &str, all: bool) -> Result<()> {
    let mut matches = resolve_all(&config.data_root, &config.data_subdir, pattern)?;
    if !all {
        matches = matches.pop().into_iter().collect();
    }

    if matches.is_empty() {
        tracing::warn!("No data file matches '{}'", pattern);
    }
    for path in matches {
        println!("{}", path.display());
    }
    Ok(())
}

fn inspect(config: &CoreConfig, pattern: &str, key: Option<String>) -> Result<()> {
    let template = source_for(config, pattern, key).load()?;
    println!("{}", serde_json::to_string_pretty(&*template)?);
    Ok(())
}

fn simulate(
    config: &CoreConfig,
    pattern: &str,
    key: Option<String>,
    field: &str,
    delta: i64,
    turns: u32,
    reset: bool,
) -> Result<()> {
    let timeline = Arc::new(Timeline::auto().with_policy(config.retention));
    let unit = Unit::new(source_for(config, pattern, key))
        .with_config(config.clone())
        .with_schedule(timeline.clone())
        .into_shared();

    let field_name = field.to_string();
    let mut action = Action::bound(unit.clone(), move |unit| -> Result<Outcome> {
        let before = unit
            .get_as::<i64>(&field_name)?
            .ok_or_else(|| CoreError::InvalidAction(format!("'{}' is not a number", field_name)))?;
        let after = before + delta;
        unit.set(&field_name, after)?;
        Ok(unit.outcome(json!({ "field": field_name, "before": before, "after": after }), None))
    });

    for _ in 0..turns {
        let outcome = action.run()?;
        unit.borrow_mut().record(outcome);
    }

    if reset {
        unit.borrow_mut().reset()?;
    }

    println!("{}", serde_json::to_string_pretty(&timeline.history())?);
    println!("{}", serde_json::to_string_pretty(unit.borrow_mut().current()?)?);
    Ok(())
}
