//! peerlink: negotiate a peer connection and move one file across it.

mod commands;

use clap::{Parser, Subcommand};
use peerlink::PeerConfig;
use std::path::{Path, PathBuf};

/// Environment variable holding an inline JSON configuration.
const CONFIG_ENV: &str = "PEERLINK_CONFIG";
const CONFIG_FILE_NAME: &str = "peerlink.json";

#[derive(Parser)]
#[command(name = "peerlink")]
#[command(about = "Peer-to-peer session negotiation and chunked file transfer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer a file between two in-process peers
    Loopback {
        /// File to send
        file: PathBuf,

        /// Directory the received copy is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Connect to a waiting receiver and send a file
    Send {
        /// Signaling address of the receiver (host:port)
        #[arg(long)]
        connect: String,

        /// File to send
        file: PathBuf,
    },

    /// Wait for a sender and store the file it sends
    Receive {
        /// Signaling address to listen on (host:port)
        #[arg(long, default_value = "127.0.0.1:7878")]
        listen: String,

        /// Directory the received file is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref());
    let logger = initialize_logger(&config);
    logger.info("PeerLink starting");

    let result = match cli.command {
        Commands::Loopback { file, out_dir } => {
            commands::run_loopback(&config, &logger, &file, &out_dir)
        }
        Commands::Send { connect, file } => commands::run_send(&config, &logger, &connect, &file),
        Commands::Receive { listen, out_dir } => {
            commands::run_receive(&config, &logger, &listen, &out_dir)
        }
    };

    if let Err(e) = result {
        logger.error(&format!("Failed: {}", e));
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initializes the main logger from configuration
fn initialize_logger(config: &PeerConfig) -> logging::Logger {
    match config.logging.build_logger("Main") {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to create logger: {}", e);
            eprintln!("Cannot continue without logging system.");
            std::process::exit(1);
        }
    }
}

/// Loads configuration, in this order:
/// 1. `PEERLINK_CONFIG` environment variable (inline JSON)
/// 2. `--config` path
/// 3. `peerlink.json` found by `config_loader`
/// 4. Defaults
fn load_config(path: Option<&Path>) -> PeerConfig {
    if let Ok(json) = std::env::var(CONFIG_ENV) {
        match PeerConfig::from_json(&json, CONFIG_ENV) {
            Ok(config) => return config,
            Err(e) => eprintln!("{} is not a valid configuration: {}", CONFIG_ENV, e),
        }
    }

    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => config_loader::find_config_file(CONFIG_FILE_NAME).ok(),
    };

    match path {
        Some(path) => match PeerConfig::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration from {}: {}", path.display(), e);
                eprintln!("Using default values...");
                PeerConfig::default()
            }
        },
        None => PeerConfig::default(),
    }
}
