use anyhow::Context;
use clap::{Parser, Subcommand};
use discordpoll::config::{self, ConfigStatus};
use discordpoll::duration::parse_duration;
use discordpoll::poll::build_poll_request;
use discordpoll::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Post a Discord poll from config.yml, wait for it to finish and announce the winner
#[derive(Parser, Debug)]
#[command(name = "discordpoll")]
#[command(about = "Run a native Discord poll described by a YAML config")]
#[command(version)]
struct Args {
    /// Path to the config file
    #[arg(long, global = true, env = "DISCORDPOLL_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the poll, wait, end it and announce the result (default)
    Run {
        /// Wait this long instead of poll.duration before ending the poll (e.g. 30s)
        #[arg(long)]
        wait: Option<String>,
    },

    /// Write the default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the poll payload that would be sent, without contacting Discord
    Preview,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_command(config_path: &Path, wait: Option<String>) -> anyhow::Result<()> {
    if config::ensure_config(config_path)? == ConfigStatus::Created {
        info!(
            path = %config_path.display(),
            "wrote default config; edit it and run again"
        );
        return Ok(());
    }

    let config = config::load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let wait = wait
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Invalid --wait value")?;

    let runner = PollRunner::new(config)?.options(RunOptions {
        wait,
        ..RunOptions::default()
    });

    let report = runner.run().await.context("Poll run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_command(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    config::write_default_config(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

fn preview_command(config_path: &Path) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    // Preview stays offline, so credentials are not required here
    let mut config = Config::from_yaml(&contents)?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.poll.validate()?;

    let request = build_poll_request(&config.poll, &Placeholders::today())?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        None => run_command(&args.config, None).await,
        Some(Command::Run { wait }) => run_command(&args.config, wait).await,
        Some(Command::Init { force }) => init_command(&args.config, force),
        Some(Command::Preview) => preview_command(&args.config),
    }
}
