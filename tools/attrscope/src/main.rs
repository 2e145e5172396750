//! attrscope - Interactive Attribute Explorer
//!
//! Reads, writes, scans, snapshots and diffs attributes of one target
//! namespace on a (simulated) device, either one command at a time or from
//! an interactive REPL.

mod output;
mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use attr_explorer::{Command, Explorer, ExplorerConfig, ReportListener};
use attr_link::SimulatedDevice;
use clap::{Parser, Subcommand};
use common::logging::{self, LogConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Level};

#[derive(Parser)]
#[command(name = "attrscope")]
#[command(about = "attrscope - interactive attribute explorer")]
#[command(long_about = "attrscope - interactive attribute explorer

Fields:
  read       ATTR                     Read one attribute
  write      ATTR[:TYPE]:VALUE        Write one attribute, then read it back
  batch      ID,ID,ID                 Read a list of attributes (max 64)
  scan       START-END                Read an inclusive range (max 128)
  bulk       SPEC;SPEC;...            Write a list of specs (max 32)
  snapshot   snapshot:START-END | compare | export | import:<json> | clear
  endpoint   N                        Select endpoint
  raw        on|off                   Raw hex display
  clusters                            List endpoint clusters
  history    [clear]                  Write history
  reports    [clear]                  Passive report log

Examples:
  attrscope exec scan 0515-0517
  attrscope exec write 0524:uint16:0014
  attrscope --raw exec batch 0001,0003,0004
  attrscope repl")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (YAML)
    #[arg(short = 'c', long, env = "ATTRSCOPE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Endpoint to select at startup (overrides configuration)
    #[arg(short, long, global = true)]
    endpoint: Option<u8>,

    /// Start with raw hex display
    #[arg(long, global = true)]
    raw: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Also write a daily-rolling log file to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one field command and print its result
    Exec {
        /// Field name (read, write, batch, scan, bulk, snapshot, ...)
        field: String,

        /// Field text
        #[arg(num_args = 0.., trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Start the interactive REPL
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut config = ExplorerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if cli.raw {
        config.raw_hex = true;
    }

    // Initialize logging
    let console_level = if cli.verbose {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };
    logging::init_with_config(LogConfig {
        console_level,
        log_dir: cli.log_dir.clone(),
        ansi: !cli.no_color,
        ..Default::default()
    })
    .map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

    let device = Arc::new(SimulatedDevice::seeded(config.namespace.clone()));
    let reports = ReportListener::new();
    let (listener, listener_token) = reports.spawn(device.subscribe(config.namespace.clone()));
    debug!(
        "Target {} (vendor 0x{:04X}), endpoint {}",
        config.namespace, config.vendor_qualifier, config.endpoint
    );

    let explorer = Explorer::new(device.clone(), config, reports);
    let result = match cli.command {
        Commands::Exec { field, text } => run_exec(&explorer, &field, &text.join(" ")).await,
        Commands::Repl => repl::run(&explorer, &device).await,
    };

    listener_token.cancel();
    let _ = listener.await;
    result
}

async fn run_exec(explorer: &Explorer<SimulatedDevice>, field: &str, text: &str) -> Result<()> {
    let command = Command::parse(field, text).with_context(|| format!("Invalid '{field}' command"))?;
    let mut state = explorer.new_state();
    let output = execute_cancellable(explorer, &mut state, command)
        .await
        .with_context(|| format!("'{field} {text}' failed"))?;
    output::print_output(&output);
    Ok(())
}

/// Execute a command; Ctrl+C aborts the remaining items of a batch
pub(crate) async fn execute_cancellable(
    explorer: &Explorer<SimulatedDevice>,
    state: &mut attr_explorer::ExplorerState,
    command: Command,
) -> attr_explorer::Result<attr_explorer::CommandOutput> {
    if !command.is_batch() {
        return explorer.execute(state, command, None).await;
    }

    let token = CancellationToken::new();
    let trigger = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let result = explorer.execute(state, command, Some(&token)).await;
    watcher.abort();
    result
}
