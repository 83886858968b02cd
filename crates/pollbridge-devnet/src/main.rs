//! Pollbridge Devnet - runs a poll from creation to L1 record and back.
//!
//! Wires the voting core, the L2 result sender, the L1 result registry and
//! a loopback relay in one process, then prints the settled outcome as
//! JSON on stdout. Logs go to stderr.

pub mod config;
pub mod devnet;
pub mod telemetry;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "pollbridge-devnet")]
#[command(about = "Pollbridge Devnet - polls on L2, records on L1")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Config file path
    #[arg(short, long, value_name = "FILE", env = "POLLBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level, overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the configured scenario (default)
    Run,
    /// Write the default configuration to a file
    InitConfig {
        #[arg(default_value = "devnet.toml")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::InitConfig { path }) = &args.command {
        config::DevnetConfig::default().to_file(path)?;
        println!("Wrote default config to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => config::DevnetConfig::from_file(path)?,
        None => config::DevnetConfig::default(),
    };

    // Override with CLI args
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.format = "json".to_string();
    }

    telemetry::init_telemetry(&config.logging.level, config.logging.format == "json")?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from: {:?}", path);
    } else {
        info!("Using default configuration");
    }
    config.validate()?;

    let mut devnet = devnet::Devnet::new(&config)?;
    let report = match devnet.run(&config.scenario) {
        Ok(report) => report,
        Err(e) => {
            error!("Scenario failed: {}", e);
            return Err(e);
        }
    };

    info!(
        poll_id = report.poll_id,
        status = ?report.result.status,
        acknowledged = report.acknowledged,
        "scenario complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
