/**
 * markvault API Server Binary
 *
 * Standalone HTTP REST API server for the zero-knowledge bookmark vault
 * engine. Configuration comes from the environment; flags override the
 * bind address.
 */
use clap::Parser;
use tracing_subscriber::EnvFilter;

use markvault::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "markvault-server")]
#[command(about = "Zero-knowledge bookmark vault REST API server", long_about = None)]
struct Args {
    /// Server host address (overrides HOST)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Server port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Setup logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // JWT_SECRET is mandatory; refuse to start without it
    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {}", err);
            std::process::exit(1);
        }
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    println!("{}", "=".repeat(60));
    println!("markvault REST API Server");
    println!("{}", "=".repeat(60));

    if let Err(err) = markvault::api_server::start_server(config).await {
        eprintln!("Server error: {}", err);
        std::process::exit(1);
    }
}
