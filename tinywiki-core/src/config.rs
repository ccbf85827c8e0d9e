//! Configuration parsing and management.

use crate::users::AuthenticationMethod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the tinywiki.yml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub auth: AuthSettings,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// Page shown at `/`
    #[serde(default = "default_home")]
    pub home: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            home: default_home(),
        }
    }
}

fn default_title() -> String {
    String::from("tinywiki")
}

fn default_home() -> String {
    String::from("home")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content")]
    pub content: PathBuf,

    #[serde(default = "default_users")]
    pub users: PathBuf,

    /// Extra static files served under `/assets`
    #[serde(default, rename = "static")]
    pub static_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            users: default_users(),
            static_dir: None,
        }
    }
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_users() -> PathBuf {
    PathBuf::from("users.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Require login to read pages, not only to change them
    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub default_authentication_method: AuthenticationMethod,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the file if it exists, otherwise defaults relative to its directory.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Self {
            config_path: Some(path.to_path_buf()),
            ..Self::default()
        })
    }

    fn base_dir(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .and_then(|p| p.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve(&self.paths.content)
    }

    pub fn users_path(&self) -> PathBuf {
        self.resolve(&self.paths.users)
    }

    pub fn static_dir(&self) -> Option<PathBuf> {
        self.paths.static_dir.as_deref().map(|p| self.resolve(p))
    }

    /// YAML written by `tinywiki init`.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.site.title, "tinywiki");
        assert_eq!(config.site.home, "home");
        assert_eq!(config.paths.content, PathBuf::from("content"));
        assert!(!config.auth.private);
        assert_eq!(
            config.auth.default_authentication_method,
            AuthenticationMethod::Hash
        );
    }

    #[test]
    fn test_paths_relative_to_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tinywiki.yml");
        std::fs::write(
            &path,
            r#"
site:
  title: "Team Wiki"
paths:
  content: "pages"
  users: "/etc/tinywiki/users.json"
  static: "public"
auth:
  private: true
  default_authentication_method: cleartext
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.site.title, "Team Wiki");
        assert_eq!(config.content_dir(), dir.path().join("pages"));
        assert_eq!(
            config.users_path(),
            PathBuf::from("/etc/tinywiki/users.json")
        );
        assert_eq!(config.static_dir(), Some(dir.path().join("public")));
        assert!(config.auth.private);
        assert_eq!(
            config.auth.default_authentication_method,
            AuthenticationMethod::Cleartext
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::from_file_or_default(dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.content_dir(), dir.path().join("content"));
    }
}
