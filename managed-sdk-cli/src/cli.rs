//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use managed_sdk_core::Version;
use std::path::PathBuf;

/// managed-sdk - Install and inspect a managed Cloud SDK
#[derive(Parser, Debug)]
#[command(name = "managed-sdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the settings JSON file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download, extract and verify the SDK
    Install(InstallArgs),

    /// Show whether the SDK is installed
    Status(TargetArgs),

    /// Print the resolved install layout
    Paths(TargetArgs),
}

/// Which installation to act on. Unset fields come from the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Managed root directory
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// `latest` or a MAJOR.MINOR.PATCH release
    #[arg(long)]
    pub version: Option<Version>,
}

#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Enable usage reporting in the install script
    #[arg(long)]
    pub usage_reporting: bool,

    /// Install only this component (repeatable)
    #[arg(long = "component", value_name = "COMPONENT")]
    pub components: Vec<String>,

    /// Extra environment variable for the install script (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub environment: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}
