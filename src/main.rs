use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use snapmnt::modules::constants::{DEFAULT_EXPIRE_SECS, DEFAULT_SNAPSHOT_ROOT};
use snapmnt::{MountConfig, MountManager, SystemHelper, ZfsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seconds an idle automount stays mounted (0 disables expiry)
    #[arg(long, default_value_t = DEFAULT_EXPIRE_SECS)]
    expire: u64,

    /// Directory under which snapshot mount points are created
    #[arg(long, default_value = DEFAULT_SNAPSHOT_ROOT)]
    snapshot_root: PathBuf,

    /// Allow snapshot create/rename/destroy operations
    #[arg(long)]
    admin: bool,

    /// Mount snapshots with the nosuid option
    #[arg(long)]
    nosuid: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Automount a snapshot and manage it until interrupted
    Mount {
        /// Full dataset@snapshot name
        name: String,
    },
    /// Unmount an active automount
    Unmount {
        /// Full dataset@snapshot name
        name: String,
        /// Force the unmount
        #[arg(short, long)]
        force: bool,
    },
    /// Rename a snapshot
    Rename {
        /// Current dataset@snapshot name
        old: String,
        /// New dataset@snapshot name
        new: String,
    },
    /// Create a snapshot of a dataset
    Create {
        /// Dataset to snapshot
        dataset: String,
        /// Name of the new snapshot component
        component: String,
    },
    /// Destroy a snapshot, unmounting it first if needed
    Destroy {
        /// Full dataset@snapshot name
        name: String,
    },
    /// List active automounts as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger based on verbose flag
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new().filter_level(log_level).init();

    let config = MountConfig {
        expire_after: Duration::from_secs(cli.expire),
        admin_enabled: cli.admin,
        no_setuid: cli.nosuid,
        snapshot_root: cli.snapshot_root.clone(),
    };
    let manager = MountManager::new(config, Arc::new(ZfsStore::new()), Arc::new(SystemHelper));

    match &cli.command {
        Commands::Mount { name } => {
            let path = manager.ensure_mounted(name)?;
            println!("Mounted {} at {}", name, path.display());

            info!("Managing automount; press Ctrl-C to stop...");
            signal::ctrl_c().await?;
            manager.shutdown();
            info!("Expiry canceled; mount left in place");
        }
        Commands::Unmount { name, force } => {
            manager.unmount(name, *force)?;
            println!("Unmounted {}", name);
        }
        Commands::Rename { old, new } => {
            manager.rename(old, new)?;
            println!("Renamed {} to {}", old, new);
        }
        Commands::Create { dataset, component } => {
            manager.create(dataset, component)?;
            println!("Created {}@{}", dataset, component);
        }
        Commands::Destroy { name } => {
            manager.destroy(name)?;
            println!("Destroyed {}", name);
        }
        Commands::Status => {
            let rows = manager.active_snapshots();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
