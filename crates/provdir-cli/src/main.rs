mod cli;
mod observability;
mod output;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use provdir_config::{Settings, SettingsLoader, SettingsStore};
use provdir_core::population_from_json;
use provdir_export::DirectoryExporter;
use tracing::info;

use cli::{Cli, Commands, ExportArgs};

#[tokio::main]
async fn main() {
    observability::init_tracing("info");

    if let Err(e) = run().await {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;

    match &cli.command {
        Commands::Export(args) => export(settings, args).await?,
        Commands::Config => {
            for key in settings.property_names() {
                output::print_setting(&key, settings.get(&key).as_deref());
            }
        }
    }

    Ok(())
}

/// Config files, then `--set` overrides, then validation of the final snapshot
fn resolve_settings(cli: &Cli) -> Result<Arc<Settings>> {
    let settings = SettingsLoader::new()
        .with_search_root(&cli.config_root)
        .load_unvalidated()
        .context("Failed to load exporter settings")?;
    let store = SettingsStore::new(settings);
    for (key, value) in &cli.overrides {
        store.set(key, value.as_str());
    }
    let settings = store.snapshot();
    settings.validate().context("Invalid exporter settings")?;
    Ok(settings)
}

async fn export(settings: Arc<Settings>, args: &ExportArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.population)
        .with_context(|| format!("Failed to read {}", args.population.display()))?;
    let providers = population_from_json(&text)
        .with_context(|| format!("Invalid population in {}", args.population.display()))?;
    let stop = args.stop.unwrap_or_else(now_millis);

    info!(providers = providers.len(), stop, "Starting directory exports");
    let exporter = DirectoryExporter::from_settings(settings)?;
    for report in exporter.export_all(&providers, stop).await {
        output::print_report(&report);
    }
    Ok(())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
