use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::cli::Cli;
use crate::error::{RelayError, Result};

/// Port used when neither --port nor the PORT environment variable is set.
pub const DEFAULT_PORT: u16 = 3000;

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub data_file: PathBuf,
    pub static_dir: PathBuf,
}

impl Config {
    /// Resolve settings from CLI flags and the environment. A --port flag
    /// wins over the PORT variable; a PORT value that is not a valid port
    /// number is a startup error rather than a silent fallback.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let port = match cli.port {
            Some(port) => port,
            None => port_from_env()?.unwrap_or(DEFAULT_PORT),
        };

        Ok(Self {
            host: cli.host,
            port,
            data_file: cli.data_file.clone(),
            static_dir: cli.static_dir.clone(),
        })
    }
}

fn port_from_env() -> Result<Option<u16>> {
    match env::var("PORT") {
        Ok(raw) => raw.parse::<u16>().map(Some).map_err(|_| {
            RelayError::InvalidConfig(format!("PORT must be a port number, got {:?}", raw))
        }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(RelayError::InvalidConfig(format!(
            "PORT is not readable: {}",
            e
        ))),
    }
}
