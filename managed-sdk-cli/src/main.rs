//! managed-sdk CLI
//!
//! Installs a managed Cloud SDK and reports on existing installations.

mod cli;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use managed_sdk_core::install::check_installation;
use managed_sdk_core::{
    FileResourceProvider, InstallerError, LogSink, MessageListener, OsInfo, Progress,
    SdkInstaller, Settings,
};
use std::io::IsTerminal;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, InstallArgs, TargetArgs};
use render::BarSink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    tracing::debug!("Starting managed-sdk v{}", managed_sdk_core::VERSION);

    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_from(&config_path)
        .with_context(|| format!("Failed to load settings from {}", config_path.display()))?;
    let os = OsInfo::detect().ok_or(InstallerError::UnsupportedPlatform)?;

    match cli.command {
        Commands::Install(args) => install(settings, args, os).await,
        Commands::Status(target) => status(apply_target(settings, &target), os),
        Commands::Paths(target) => paths(apply_target(settings, &target), os),
    }
}

/// Initialize tracing; `-v` shows pipeline stages, `-vv` everything.
fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("managed_sdk_core={}", level).parse()?)
                .add_directive(format!("managed_sdk={}", level).parse()?),
        )
        .with_target(false)
        .init();

    Ok(())
}

fn apply_target(mut settings: Settings, target: &TargetArgs) -> Settings {
    if let Some(root) = &target.root {
        settings.managed_root = root.clone();
    }
    if let Some(version) = &target.version {
        settings.version = version.clone();
    }
    settings
}

fn provider(settings: &Settings, os: OsInfo) -> FileResourceProvider {
    FileResourceProvider::new(&settings.managed_root, settings.version.clone(), os)
        .with_base_url(&settings.download_base_url)
}

async fn install(settings: Settings, args: InstallArgs, os: OsInfo) -> Result<()> {
    let mut settings = apply_target(settings, &args.target);
    if args.usage_reporting {
        settings.usage_reporting = true;
    }
    if !args.components.is_empty() {
        settings.override_components = Some(args.components);
    }
    settings.environment.extend(args.environment);

    let installer = SdkInstaller::from_settings(&settings, os)?;
    let (progress, lines) = progress_renderer()?;

    let home = installer
        .install(progress, lines)
        .await
        .with_context(|| format!("Failed to install Cloud SDK {}", settings.version))?;

    println!("{}", home.display());
    Ok(())
}

/// Progress bar on a terminal, log lines otherwise.
fn progress_renderer() -> Result<(Progress, Arc<dyn MessageListener>)> {
    if std::io::stderr().is_terminal() {
        let sink = Arc::new(BarSink::new()?);
        let lines = sink.line_printer();
        Ok((Progress::new(sink), lines))
    } else {
        let lines: Arc<dyn MessageListener> = Arc::new(|line: &str| tracing::info!("{}", line));
        Ok((Progress::new(Arc::new(LogSink::new())), lines))
    }
}

fn status(settings: Settings, os: OsInfo) -> Result<()> {
    let provider = provider(&settings, os);
    let status = check_installation(&provider, &settings.version);

    println!("Version:    {}", settings.version);
    println!("Executable: {}", provider.executable().display());
    println!("Status:     {}", status);

    status.ensure_usable(&provider)?;
    Ok(())
}

fn paths(settings: Settings, os: OsInfo) -> Result<()> {
    let provider = provider(&settings, os);

    println!("Archive source:         {}", provider.archive_source());
    println!("Archive destination:    {}", provider.archive_destination().display());
    println!("Extraction destination: {}", provider.extraction_destination().display());
    println!("SDK home:               {}", provider.sdk_home().display());
    println!("Executable:             {}", provider.executable().display());
    Ok(())
}
