use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::infra::session::Credentials;

const APPLICATION: &str = "subfetch";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub user_agent: String,
    pub endpoint: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub languages: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            user_agent: format!("subfetch v{}", env!("CARGO_PKG_VERSION")),
            endpoint: None,
            cache_dir: None,
            languages: vec!["en".to_string()],
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Config file from the platform config dir, then `SUBFETCH_*` overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path(), |key| env::var(key).ok())
    }

    pub fn load_from(path: &Path, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match fs::read_to_string(path) {
            Ok(content) => {
                debug!("Reading config from {}", path.display());
                Self::parse(&content)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(Error::io(path, e)),
        };
        config.apply_overrides(lookup);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("SUBFETCH_USERNAME") {
            self.username = username;
        }
        if let Some(password) = lookup("SUBFETCH_PASSWORD") {
            self.password = password;
        }
        if let Some(user_agent) = lookup("SUBFETCH_USER_AGENT") {
            self.user_agent = user_agent;
        }
        if let Some(endpoint) = lookup("SUBFETCH_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(cache_dir) = lookup("SUBFETCH_CACHE_DIR") {
            self.cache_dir = Some(PathBuf::from(cache_dir));
        }
    }

    pub fn endpoint(&self) -> Result<&str> {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => Ok(endpoint),
            _ => Err(Error::Config(format!(
                "catalog endpoint not set. Set SUBFETCH_ENDPOINT or add endpoint = \"https://...\" to {}",
                config_path().display()
            ))),
        }
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            ..Credentials::anonymous(self.user_agent.clone())
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

// Without a home directory, fall back to the current directory.
pub fn config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_default()
        .join("config.toml")
}

fn default_cache_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".subfetch-cache"))
}
