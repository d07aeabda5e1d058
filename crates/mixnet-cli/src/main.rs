//! Mixnet CLI
//!
//! Sphinx-style mix network simulator

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mixnet_cli::config::Config;
use mixnet_cli::server::{self, AppState};
use mixnet_core::{DEFAULT_DESTINATION, Mixnet};
use tracing_subscriber::EnvFilter;

/// Mixnet - anonymous message delivery through layered encryption
#[derive(Parser)]
#[command(name = "mixnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (defaults to ~/.config/mixnet/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of mix nodes
    #[arg(long, global = true)]
    nodes: Option<usize>,

    /// Hops per route
    #[arg(long, global = true)]
    path_length: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP mix endpoint
    Serve {
        /// Bind address (overrides host and port)
        #[arg(short, long)]
        bind: Option<SocketAddr>,

        /// Listen port
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Send one message through a fresh network
    Send {
        /// Message to send
        #[arg(required = true)]
        message: String,

        /// Destination label
        #[arg(short, long, default_value = DEFAULT_DESTINATION)]
        destination: String,
    },

    /// Explain how the mixnet protects anonymity
    Explain,

    /// Show effective configuration and node directory
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::resolve(cli.config.as_deref())?;
    if let Some(nodes) = cli.nodes {
        config.network.node_count = nodes;
    }
    if let Some(path_length) = cli.path_length {
        config.route.path_length = path_length;
    }
    if let Commands::Serve { port: Some(port), .. } = &cli.command {
        config.server.port = *port;
    }

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { bind, .. } => {
            let addr = match bind {
                Some(addr) => addr,
                None => config.listen_addr()?,
            };
            run_server(addr, &config).await?;
        }
        Commands::Send {
            message,
            destination,
        } => {
            send_message(&message, &destination, &config).await?;
        }
        Commands::Explain => explain(),
        Commands::Status => show_status(&config)?,
    }

    Ok(())
}

/// Serve the mix endpoint over one shared network
async fn run_server(addr: SocketAddr, config: &Config) -> anyhow::Result<()> {
    let mixnet = Arc::new(Mixnet::new(&config.to_mixnet_config())?);
    tracing::info!(
        nodes = mixnet.registry().len(),
        path_length = mixnet.selector().path_length(),
        "network ready"
    );

    server::serve(addr, AppState { mixnet }).await
}

/// Send a single message and print what the final hop recovered
async fn send_message(message: &str, destination: &str, config: &Config) -> anyhow::Result<()> {
    let mixnet = Mixnet::new(&config.to_mixnet_config())?;

    match mixnet
        .send_with_timeout(message, destination, mixnet.session_timeout())
        .await
    {
        Ok(delivery) => {
            println!("Destination: {}", delivery.destination);
            println!("Hops: {}", delivery.hops);
            println!("Message: {}", delivery.message);
            Ok(())
        }
        Err(e) if e.warrants_fresh_route() => {
            anyhow::bail!("Send failed ({}): {e}; retrying may pick a working route", e.kind())
        }
        Err(e) => anyhow::bail!("Send failed ({}): {e}", e.kind()),
    }
}

fn explain() {
    println!("How the mixnet keeps senders anonymous");
    println!();
    println!("1. Anonymity: every message travels through a random chain of mix nodes.");
    println!("   No node knows the whole path, only the hop before and the hop after.");
    println!();
    println!("2. Encryption: the message is wrapped like nested envelopes, one per node.");
    println!("   Each node opens only its own envelope to learn where to pass it next.");
    println!();
    println!("3. Security: each envelope is locked with a node's public key, so only that");
    println!("   node's private key can open it. Any tampering is detected and the");
    println!("   message is dropped instead of delivered.");
}

/// Show effective configuration and a fresh node directory
fn show_status(config: &Config) -> anyhow::Result<()> {
    let core = config.to_mixnet_config();
    let mixnet = Mixnet::new(&core)?;
    let params = mixnet.adapter().params();

    println!("Mixnet Status");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("Network:");
    println!("  Nodes: {}", core.node_count);
    println!("  Path length: {}", core.path_length);
    if core.excluded.is_empty() {
        println!("  Excluded: none");
    } else {
        let excluded: Vec<String> = core.excluded.iter().map(ToString::to_string).collect();
        println!("  Excluded: {}", excluded.join(", "));
    }
    println!("  Session timeout: {:?}", core.session_timeout);
    println!("  Replay cache: {} tags per node", core.replay_cache_capacity);
    println!();

    println!("Packet format:");
    println!("  Header hops: {}", params.max_hops());
    println!("  Payload: {} bytes", params.payload_size());
    println!("  Packet: {} bytes", params.packet_size());
    println!();

    println!("Server:");
    println!("  Listen: {}", config.listen_addr()?);
    println!();

    println!("Directory (generated for this run):");
    for (id, key) in mixnet.registry().public_directory() {
        println!("  {id}: {}…", hex::encode(&key.as_bytes()[..8]));
    }

    Ok(())
}
