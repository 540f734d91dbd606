use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally", about = "Tally: vote ledger service", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Run concurrent random votes against an in-memory ledger and audit the result
    Simulate(SimulateArgs),
    /// Recount every target in a snapshot file
    Audit(AuditArgs),
    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<String>,
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(long, default_value = "32")]
    pub voters: usize,
    #[arg(long, default_value = "4")]
    pub targets: usize,
    #[arg(long, default_value = "25")]
    pub rounds: usize,
    #[arg(long, default_value = "post")]
    pub target_type: String,
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args)]
pub struct AuditArgs {
    #[arg(long)]
    pub snapshot: PathBuf,
    /// Config file supplying the ledger retry budget
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overwrite drifted counters and save the snapshot back
    #[arg(long)]
    pub repair: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
