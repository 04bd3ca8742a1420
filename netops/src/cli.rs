use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "netops")]
#[command(version)]
#[command(about = "Operator-run configuration scripts for JUNOS devices", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file [default: <config dir>/netops/netops.toml]
    #[arg(long, global = true, env = "NETOPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Configure local accounts
    Usercfg(UsercfgArgs),

    /// Send a test email through the configured relay
    TestEmail(TestEmailArgs),
}

#[derive(Args)]
pub struct UsercfgArgs {
    /// Name of the inventory to run this script against
    pub inventory: String,

    /// Username to log in with
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password to log in with
    #[arg(short, long)]
    pub password: Option<String>,

    /// Email to send the output to
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(Args)]
pub struct TestEmailArgs {
    /// Recipient, prompted when omitted
    #[arg(short, long)]
    pub email: Option<String>,

    /// File to attach
    pub file: Option<PathBuf>,
}
