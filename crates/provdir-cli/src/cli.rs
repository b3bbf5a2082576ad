use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "provdir")]
#[command(about = "Export provider and practitioner directories from a simulated population")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory whose conf/ and ../conf/ hold provdir.toml overrides
    #[arg(long, global = true, env = "PROVDIR_CONFIG_ROOT", default_value = ".")]
    pub config_root: PathBuf,

    /// Override a setting, e.g. --set exporter.baseDirectory=./out/
    #[arg(long = "set", global = true, value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every enabled directory export
    Export(ExportArgs),
    /// Show the effective settings
    Config,
}

#[derive(clap::Args)]
pub struct ExportArgs {
    /// Population fixture: a JSON array of providers
    #[arg(short, long)]
    pub population: PathBuf,

    /// Simulation clock value appended to output file names (defaults to now, in ms)
    #[arg(long)]
    pub stop: Option<i64>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
