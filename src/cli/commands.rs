use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::client::geo::IP_API_URL;
use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "osint-terminal", version, about = "OSINT Lab Terminal", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional settings file; environment variables override it
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Open the terminal in this console against a running server
    Terminal {
        /// Base URL of the terminal server
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,

        /// Where the visitor id is kept (defaults to the user data directory)
        #[arg(long)]
        id_file: Option<PathBuf>,

        /// Do not look up the public IP location
        #[arg(long)]
        skip_geo: bool,

        /// IP geolocation endpoint
        #[arg(long, default_value = IP_API_URL)]
        geo_url: String,
    },

    /// Inspect stored visitors and their conversations
    Visitors {
        #[command(subcommand)]
        action: VisitorAction,
    },
}

#[derive(Subcommand)]
pub enum VisitorAction {
    /// List visitors, most recently seen first
    List {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show one visitor
    Show { id: Uuid },

    /// Show a visitor's most recent conversations
    History {
        id: Uuid,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
}
