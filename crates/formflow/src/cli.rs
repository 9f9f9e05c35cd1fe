use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cmd::{
    self, check::CheckArgs, fill::FillArgs, schema::SchemaArgs, submissions::SubmissionsCommand,
};

#[derive(Parser, Debug)]
#[command(
    name = "formflow",
    about = "Fill, check and export sectioned forms with branching navigation",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Log navigation and pruning details
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a form section by section and submit it
    Fill(FillArgs),
    /// Report integrity issues in a form definition
    Check(CheckArgs),
    /// Inspect stored submissions
    #[command(subcommand)]
    Submissions(SubmissionsCommand),
    /// Print the JSON Schema of form definitions
    Schema(SchemaArgs),
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Fill(args) => cmd::fill::run(args),
        Commands::Check(args) => cmd::check::run(args),
        Commands::Submissions(command) => cmd::submissions::run(command),
        Commands::Schema(args) => cmd::schema::run(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "formflow=debug,formflow_lib=debug,formflow_spec=debug,warn"
    } else {
        "formflow=info,formflow_lib=info,formflow_spec=info,warn"
    };
    let filter = if verbose {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };
    // stdout carries command output; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
