use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Manage container registry access tokens
#[derive(Parser)]
#[command(name = "craas-token", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage registry tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Reconcile every tracked token once
    Refresh,

    /// Reconcile tracked tokens periodically until interrupted
    Watch {
        /// Seconds between passes (defaults to CRAAS_REFRESH_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Create a token and start tracking it
    Create {
        #[arg(long)]
        name: String,
        /// Defaults to CRAAS_PROJECT_ID
        #[arg(long)]
        project_id: Option<String>,
        /// Grant push access in addition to pull
        #[arg(long)]
        mode_rw: bool,
        #[arg(long, conflicts_with = "registry_ids")]
        all_registries: bool,
        #[arg(long = "registry-id", value_delimiter = ',')]
        registry_ids: Vec<String>,
        /// RFC 3339 expiry, e.g. 2030-01-01T00:00:00Z
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Show a token as the API reports it
    Get { id: String },
    /// List tokens visible to the configured credentials
    List,
    /// Change a tracked token
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mode_rw: Option<bool>,
        #[arg(long)]
        all_registries: Option<bool>,
        #[arg(long = "registry-id", value_delimiter = ',')]
        registry_ids: Option<Vec<String>>,
        #[arg(long, conflicts_with = "no_expiry")]
        expires_at: Option<DateTime<Utc>>,
        /// Remove the expiration
        #[arg(long)]
        no_expiry: bool,
    },
    /// Delete a token; succeeds if it is already gone
    Delete { id: String },
}
