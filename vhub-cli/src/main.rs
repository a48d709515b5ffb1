//! vhub: deployed-version registry server and client.
//!
//! # Usage
//!
//! ```text
//! vhub serve [--data-file P] [--backup-file P] [--health-config P] [--port N] [--no-seed]
//! vhub list [--region R] [--server URL]
//! vhub get <region> <environment> <app> [--json]
//! vhub set-version <region> <environment> <app> <version>
//! vhub health
//! ```

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    get::GetArgs, health::HealthArgs, list::ListArgs, serve::ServeArgs,
    set_version::SetVersionArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "vhub",
    version,
    about = "Track deployed application versions across regions and environments",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the registry server in the foreground.
    Serve(ServeArgs),

    /// List every app with its deployed version.
    List(ListArgs),

    /// Show a single app.
    Get(GetArgs),

    /// Record a new deployed version for an app.
    SetVersion(SetVersionArgs),

    /// Show the latest health-check results.
    Health(HealthArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::List(args) => args.run(),
        Commands::Get(args) => args.run(),
        Commands::SetVersion(args) => args.run(),
        Commands::Health(args) => args.run(),
    }
}
