//! CLI argument parsing and command dispatch

mod fleet;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fleet_bench_core::{local_hostname, FleetConfig, Operation, Role, RoleResolver};
use fleet_bench_report::{render_text, tail_logs, DEFAULT_TAIL_LINES};

#[derive(Parser, Debug)]
#[command(name = "fleet-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the fleet configuration file (TOML)
    #[arg(short, long, global = true, env = "FLEET_BENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hostname used for role resolution (defaults to the OS hostname)
    #[arg(long, global = true)]
    pub hostname: Option<String>,

    /// Directory receiving the benchmark logs
    #[arg(long, global = true)]
    pub results_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the transfer-engine fleet, one batch per batch size
    Transfer(TransferArgs),
    /// Launch the write-bandwidth fleet
    WriteBw(WriteBwArgs),
    /// Validate the configuration and print the launch plan
    Validate,
    /// Show the tail of every result log
    Report(ReportArgs),
}

/// Options shared by the launching commands
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LaunchArgs {
    /// Launch and exit, leaving the benchmarks running
    #[arg(long)]
    pub detach: bool,

    /// Print the command lines without launching anything
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Default)]
pub struct TransferArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Batch sizes to sweep (overrides `transfer_engine.batch_sizes`)
    #[arg(long, value_delimiter = ',')]
    pub batch_size: Vec<u64>,

    /// Block size in bytes (overrides `transfer_engine.block_size`)
    #[arg(long)]
    pub block_size: Option<u64>,

    /// Transfer direction: read or write
    #[arg(long)]
    pub operation: Option<Operation>,
}

#[derive(Args, Debug, Default)]
pub struct WriteBwArgs {
    #[command(flatten)]
    pub launch: LaunchArgs,

    /// Use host memory instead of accelerator memory
    #[arg(long)]
    pub cpu: bool,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Lines to show from the end of each log
    #[arg(short = 'n', long, default_value_t = DEFAULT_TAIL_LINES)]
    pub lines: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl TransferArgs {
    fn apply(&self, config: &mut FleetConfig) {
        let te = &mut config.transfer_engine;
        if !self.batch_size.is_empty() {
            te.batch_sizes = self.batch_size.clone();
        }
        if let Some(block_size) = self.block_size {
            te.block_size = block_size;
        }
        if let Some(operation) = self.operation {
            te.operation = operation;
        }
    }
}

impl WriteBwArgs {
    fn apply(&self, config: &mut FleetConfig) {
        if self.cpu {
            config.write_bw.use_accelerator = false;
        }
    }
}

impl Cli {
    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        let mut config = self.load_config()?;
        let hostname = self.hostname.clone().unwrap_or_else(local_hostname);

        match &self.command {
            Commands::Transfer(args) => {
                args.apply(&mut config);
                let role = resolve_role(&config, &hostname)?;
                fleet::run_transfer(config, hostname, role, args.launch).await
            }
            Commands::WriteBw(args) => {
                args.apply(&mut config);
                let role = resolve_role(&config, &hostname)?;
                fleet::run_write_bw(config, hostname, role, args.launch).await
            }
            Commands::Validate => {
                let role = resolve_role(&config, &hostname)?;
                fleet::validate(config, hostname, role)
            }
            Commands::Report(args) => report(&config, args),
        }
    }

    fn load_config(&self) -> Result<FleetConfig> {
        let config = match &self.config {
            Some(path) => FleetConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => {
                tracing::debug!("No config file given, using built-in defaults");
                FleetConfig::default()
            }
        };

        Ok(match &self.results_dir {
            Some(dir) => config.with_results_dir(dir),
            None => config,
        })
    }
}

/// Resolve this host's role, failing on hosts in neither list
fn resolve_role(config: &FleetConfig, hostname: &str) -> Result<Role> {
    let role = RoleResolver::from_config(&config.hosts)
        .and_then(|resolver| resolver.resolve(hostname))
        .context("cannot determine the role of this host")?;
    tracing::info!(hostname, role = %role, "Resolved host role");
    Ok(role)
}

fn report(config: &FleetConfig, args: &ReportArgs) -> Result<()> {
    let dir = &config.output.results_dir;
    let tails = tail_logs(dir, args.lines)?;
    if tails.is_empty() {
        tracing::info!(dir = %dir.display(), "No result logs found");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tails)?);
    } else {
        print!("{}", render_text(&tails));
    }
    Ok(())
}
