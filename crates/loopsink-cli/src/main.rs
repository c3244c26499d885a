//! loopsink CLI — run the module-loader daemon or talk to a running one.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use loopsink_bus::{unix, BusClient, UnixBus};
use loopsink_daemon::{setup, Daemon, DaemonEvent};
use loopsink_kmod::linux::ModprobeSubsystem;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loopsink",
    about = "Load the v4l2 loopback module on request over a local bus",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon.
    Run {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Disable the idle auto-exit.
        #[arg(long)]
        no_timeout: bool,
    },

    /// Ask the running daemon to ensure the module is loaded.
    Call {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Read the daemon's module-in-kernel property.
    Status {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, no_timeout } => {
            let mut config = setup::load_config(config.as_deref())?;
            init_tracing(&config.daemon.log_level);
            if no_timeout {
                config.daemon.no_timeout = true;
            }

            let bus = UnixBus::new(&config.bus.name, &setup::socket_dir(&config));
            let modules = ModprobeSubsystem::new();
            let mut daemon = Daemon::new(config, Box::new(modules), Box::new(bus));

            let shutdown = daemon.control_sender();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received");
                    let _ = shutdown.send(DaemonEvent::Shutdown).await;
                }
            });

            daemon.run().await?;
        }
        Commands::Call { config } => {
            init_tracing("info");
            let mut client = connect(config).await?;
            match client.load_module().await {
                Ok(success) => println!("success: {success}"),
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { config } => {
            init_tracing("info");
            let mut client = connect(config).await?;
            let value = client.module_in_kernel().await?;
            println!("module in kernel: {value}");
        }
    }

    Ok(())
}

fn init_tracing(default: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

async fn connect(config: Option<PathBuf>) -> anyhow::Result<BusClient> {
    let config = setup::load_config(config.as_deref())?;
    let path = unix::socket_path(&setup::socket_dir(&config), &config.bus.name);
    Ok(BusClient::connect(&path).await?)
}
