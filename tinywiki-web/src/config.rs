use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tinywiki_core::Config;

use crate::auth::SessionKeys;
use crate::cli::{Cli, ServeArgs};

/// Runtime configuration derived from CLI/env and the site config file.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub config_path: PathBuf,
    pub site: Config,
    pub secret: Option<String>,
    pub session_ttl: Duration,
}

impl ServerConfig {
    pub fn from_cli(cli: &Cli, args: &ServeArgs) -> Result<Self> {
        let config_path = absolute(&cli.config)?;
        let site = Config::from_file_or_default(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?;

        Ok(Self {
            listen_addr: args.listen.clone(),
            config_path,
            site,
            secret: args.secret.clone().filter(|s| !s.is_empty()),
            session_ttl: Duration::from_secs(args.session_hours.max(1) * 3600),
        })
    }

    /// Session keys from the configured secret, or a random one.
    pub fn session_keys(&self) -> SessionKeys {
        match &self.secret {
            Some(secret) => SessionKeys::new(secret.as_bytes(), self.session_ttl),
            None => {
                tracing::warn!(
                    "TINYWIKI_SECRET not set; using a random secret, sessions end on restart"
                );
                SessionKeys::random(self.session_ttl)
            }
        }
    }
}

/// Resolve `path` against the current directory.
pub fn absolute(path: &std::path::Path) -> Result<PathBuf> {
    Ok(if path.is_relative() {
        std::env::current_dir()?.join(path)
    } else {
        path.to_path_buf()
    })
}
