use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tinywiki_core::AuthenticationMethod;

/// CLI for the wiki server and its user file.
#[derive(Debug, Clone, Parser)]
#[command(name = "tinywiki", version, about = "A small team wiki served as HTML")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = "TINYWIKI_CONFIG", default_value = "tinywiki.yml")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Serve the wiki over HTTP
    Serve(ServeArgs),

    /// Write a starter config and home page
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Manage accounts in the users file
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    /// Listen address for HTTP
    #[arg(long, env = "TINYWIKI_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: String,

    /// Secret for signing session cookies (HS256).
    /// If not set, a random secret is generated and sessions end on restart.
    #[arg(long, env = "TINYWIKI_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Session lifetime in hours
    #[arg(long, env = "TINYWIKI_SESSION_HOURS", default_value = "168")]
    pub session_hours: u64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum UserCommand {
    /// Add a user
    Add {
        name: String,

        #[arg(long, env = "TINYWIKI_PASSWORD", hide_env_values = true)]
        password: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,

        /// Create the account disabled
        #[arg(long)]
        inactive: bool,

        /// Password storage: "hash" or "cleartext" (defaults to the config)
        #[arg(long)]
        method: Option<AuthenticationMethod>,
    },

    /// Set a new password
    Passwd {
        name: String,

        #[arg(long, env = "TINYWIKI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Delete a user
    Delete { name: String },

    /// List users
    List,
}
