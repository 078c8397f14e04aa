use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use backup_service::cli::{
    handle_backup, handle_chain, handle_config, handle_list, handle_prune, handle_restore,
    ServiceContext,
};

#[derive(Parser)]
#[command(
    name = "backup-service",
    version,
    about = "Full and incremental folder backups to object storage",
    long_about = "backup-service archives configured folders with tar, optionally \
                  encrypts them with gpg and uploads them to S3-compatible storage. \
                  The first backup of each month is full, later ones are incremental. \
                  Old backups are rotated by a daily and monthly retention policy."
)]
struct Cli {
    /// Config file
    #[arg(
        long,
        global = true,
        env = "BACKUP_SERVICE_CONFIG",
        default_value = "config.yaml"
    )]
    config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform an immediate backup and rotate old ones
    Backup {
        /// Create full archives even when this month already has one
        #[arg(long)]
        full: bool,
    },

    /// List backups in storage
    List,

    /// Restore a backup and everything it depends on
    Restore {
        /// Key of the backup to restore
        key: String,
        /// Directory to extract into
        target_dir: PathBuf,
    },

    /// Show the archives a restore of a backup would apply
    Chain {
        /// Key of the backup
        key: String,
    },

    /// Delete backups outside the retention policy
    Prune {
        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration and paths
    Config,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = ServiceContext::load(&cli.config)?;

    match cli.command {
        Commands::Backup { full } => handle_backup(&ctx, full)?,
        Commands::List => handle_list(&ctx)?,
        Commands::Restore { key, target_dir } => handle_restore(&ctx, &key, &target_dir)?,
        Commands::Chain { key } => handle_chain(&ctx, &key)?,
        Commands::Prune { dry_run } => handle_prune(&ctx, dry_run)?,
        Commands::Config => handle_config(&ctx, &cli.config),
    }

    Ok(())
}
