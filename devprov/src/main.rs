//! devprov - development-environment provisioning CLI.
//!
//! Two subcommands cover the workspace lifecycle: `trust-host` provisions
//! the system-wide SSH trust store at image-build or first-boot time, and
//! `validate` repairs repository configuration on every environment
//! attach. Neither owns process lifecycle beyond its exit status; the
//! calling provisioning sequence decides whether to halt.

#![forbid(unsafe_code)]

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "devprov")]
#[command(author, version, about = "Development-environment provisioning for container workspaces")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit a machine-readable JSON report instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and repair repository configuration (idempotent, run on attach)
    Validate {
        /// Remote whose transport is validated and rewritten
        #[arg(long, default_value = "origin", env = "DEVPROV_REMOTE")]
        remote: String,

        /// Shared configuration file the local include should point at
        #[arg(
            long,
            default_value = ".gitconfig",
            env = "DEVPROV_SHARED_GITCONFIG"
        )]
        shared_config: PathBuf,

        /// Host expected inside the remote URL
        #[arg(long, default_value = "github.com", env = "DEVPROV_KEY_HOST")]
        key_host: String,

        /// Account used for the authentication probe
        #[arg(long, default_value = "git", env = "DEVPROV_PROBE_USER")]
        probe_user: String,

        /// Repository to operate on (defaults to the working directory)
        #[arg(short = 'C', long)]
        repo: Option<PathBuf>,
    },

    /// Install host keys and provision the SSH trust store (run at image build)
    TrustHost {
        /// Host specification: `domain|address[:port]`
        #[arg(default_value = "github.com")]
        host: String,

        /// Resolve and report without touching the store
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Operator text goes to stdout; diagnostics and warnings to stderr.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let ok = match cli.command {
        Commands::Validate {
            remote,
            shared_config,
            key_host,
            probe_user,
            repo,
        } => {
            commands::validate::run(remote, shared_config, key_host, probe_user, repo, cli.json)
                .await?
        }
        Commands::TrustHost { host, dry_run } => {
            commands::trust::run(&host, dry_run, cli.json).await?
        }
    };

    // The aggregate result gates the calling pipeline.
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
