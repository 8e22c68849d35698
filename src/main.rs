//! `ripe-resolve`: runs part changes for one product through the rules and
//! prints every resulting event.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ripe_customizer::{
    init_tracing_with, load_config, Configurator, CustomizeError, EngineOptions, Part, PartsChanged,
};

#[derive(Parser, Debug)]
#[command(name = "ripe-resolve")]
#[command(about = "Resolve product customization changes against restriction and sync rules")]
#[command(version)]
struct Args {
    /// Product configuration file (.toml or .json)
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,

    /// Part change as part=material:color, applied in order
    #[arg(short, long = "set", value_name = "CHANGE")]
    sets: Vec<String>,

    /// Optional part to drop, applied after all --set changes
    #[arg(short, long = "remove", value_name = "PART")]
    removes: Vec<String>,

    /// Apply all --set changes as a single bulk change
    #[arg(long)]
    bulk: bool,

    /// Key separator used by restriction rules
    #[arg(long, default_value = ":")]
    token: String,

    /// Do not register the restriction stage
    #[arg(long)]
    no_restrictions: bool,

    /// Do not register the sync stage
    #[arg(long)]
    no_sync: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_change(raw: &str) -> Result<Part> {
    let Some((part, value)) = raw.split_once('=') else {
        bail!("expected part=material:color, got '{}'", raw);
    };
    let Some((material, color)) = value.split_once(':') else {
        bail!("expected material:color for part '{}', got '{}'", part, value);
    };
    if part.is_empty() || material.is_empty() || color.is_empty() {
        bail!("empty component in change '{}'", raw);
    }
    Ok(Part::new(part, material, color))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing_with(if args.verbose { "debug" } else { "info" });

    let changes = args
        .sets
        .iter()
        .map(|raw| parse_change(raw))
        .collect::<Result<Vec<Part>>>()?;

    let config = load_config(&args.config)?;
    let options = EngineOptions {
        token: args.token.clone(),
        restrictions: !args.no_restrictions,
        sync: !args.no_sync,
    };

    let mut configurator = Configurator::new(options);
    let loaded = configurator
        .load_config(config)
        .with_context(|| format!("Invalid product configuration {}", args.config.display()))?;
    print_json(&loaded)?;

    let mut rejected = 0usize;
    let mut report = |result: Result<Option<PartsChanged>, CustomizeError>, request: &str| -> Result<()> {
        match result {
            Ok(Some(event)) => print_json(&event)?,
            Ok(None) => info!("{} left the parts unchanged", request),
            Err(err) => {
                warn!("{} rejected: {}", request, err);
                rejected += 1;
            }
        }
        Ok(())
    };

    if args.bulk && !changes.is_empty() {
        let result = configurator.set_parts(changes);
        report(result, "bulk change")?;
    } else {
        for (change, raw) in changes.into_iter().zip(&args.sets) {
            let result = configurator.set_part_with(change, false);
            report(result, raw.as_str())?;
        }
    }

    for part in &args.removes {
        let result = configurator.remove_part(part);
        report(result, part.as_str())?;
    }

    print_json(configurator.parts())?;
    if rejected > 0 {
        info!("{} requests were rejected", rejected);
    }
    Ok(())
}
