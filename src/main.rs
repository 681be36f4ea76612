use clap::Parser;
use device_relay::cli::Cli;
use device_relay::config::Config;
use device_relay::logging::LoggingConfig;
use device_relay::registry::DeviceRegistry;
use device_relay::relay::server::RelayServer;
use std::path::PathBuf;

#[tokio::main]
async fn main() {
    // Parse CLI arguments first to get logging configuration
    let cli = Cli::parse();

    // Initialize logging system
    let mut log_config = LoggingConfig::from_args(cli.quiet, cli.verbose > 0, cli.json);

    // A --log-file flag or DEVICE_RELAY_LOG_FILE redirects logs to a file,
    // which supervised deployments use to keep stdout quiet
    let log_file = cli.log_file.clone().or_else(|| {
        std::env::var("DEVICE_RELAY_LOG_FILE")
            .ok()
            .map(PathBuf::from)
    });
    if log_file.is_some() {
        log_config.file_output = log_file;
    }

    if let Err(e) = device_relay::logging::init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::resolve(cli)?;

    // A corrupt device store is a startup error; an absent one is an empty
    // fleet and the file appears on the first write
    let registry = DeviceRegistry::load(&config.data_file)?;

    tracing::info!(
        "Starting device relay v{} with {} saved device(s)",
        env!("CARGO_PKG_VERSION"),
        registry.len()
    );

    RelayServer::new(config, registry).run().await
}
