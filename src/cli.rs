use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Device Relay - coordination hub for small IoT device fleets

What it does:
  - Keeps a durable list of saved devices in a JSON file
  - Serves the device API and the control page over HTTP
  - Relays every WebSocket message to every connected peer

Endpoints:
  GET    /devices          Devices currently visible on the network
  GET    /saved-devices    Devices in the persistent store
  POST   /devices          Save a device
  DELETE /devices/:id      Remove a saved device
  GET    /ws               Join the realtime message bus

The listen port can also be set with the PORT environment variable;
a --port flag wins over the environment.
"#;

#[derive(Parser, Clone)]
#[command(name = "devrelay")]
#[command(about = "IoT device relay - persistent device registry plus a WebSocket fan-out bus")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Port to listen on (overrides the PORT environment variable)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Path of the device store
    #[arg(long, default_value = "saved-devices.json")]
    pub data_file: PathBuf,

    /// Directory holding the control page assets
    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    /// Write logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,
}
