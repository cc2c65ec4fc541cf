mod cli;
mod commands;
mod config;

use bws_cache::SecretCache;
use bws_cache_core::Backend as _;
use bws_cache_exec::{BwsProcess, DEFAULT_PROGRAM};
use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

/// Entry point wiring the CLI to the cache facade and the `bws` backend.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        Command::List { values } => {
            let cache = connect(cli.project, &config)?;
            print!("{}", commands::list(&cache, values));
        }
        Command::Get { key } => {
            let cache = connect(cli.project, &config)?;
            println!("{}", commands::get(&cache, &key).map_err(to_eyre)?);
        }
        Command::Set { key, value } => {
            let mut cache = connect(cli.project, &config)?;
            println!("{}", commands::set(&mut cache, &key, &value).map_err(to_eyre)?);
        }
        Command::Delete { key } => {
            let mut cache = connect(cli.project, &config)?;
            println!("{}", commands::delete(&mut cache, &key).map_err(to_eyre)?);
        }
        Command::Raw { args } => {
            let backend = build_backend(&config)?;
            print!("{}", backend.invoke(&args).map_err(to_eyre)?);
        }
        Command::Health => {
            let backend = build_backend(&config)?;
            println!("{}", commands::health(&backend).map_err(to_eyre)?);
        }
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to warn so secret listings on
    // stdout stay clean.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn to_eyre(err: impl std::fmt::Display) -> color_eyre::Report {
    color_eyre::eyre::eyre!(err.to_string())
}

/// Build the subprocess backend from config overrides; token resolution
/// order is config file, then the `BWS_ACCESS_TOKEN` environment variable.
fn build_backend(config: &config::Config) -> Result<BwsProcess> {
    let program = config
        .bws_path
        .clone()
        .unwrap_or_else(|| DEFAULT_PROGRAM.into());
    tracing::debug!(program = %program.display(), "building bws backend");

    match &config.access_token {
        Some(token) => Ok(BwsProcess::new(program, token.clone())),
        None => BwsProcess::from_env(program).map_err(to_eyre),
    }
}

fn connect(
    project_flag: Option<String>,
    config: &config::Config,
) -> Result<SecretCache<BwsProcess>> {
    let project = project_flag
        .or_else(|| config.project.clone())
        .ok_or_else(|| {
            color_eyre::eyre::eyre!("no project given; pass --project or set it in the config file")
        })?;
    let backend = build_backend(config)?;
    SecretCache::connect(&project, backend).map_err(to_eyre)
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
