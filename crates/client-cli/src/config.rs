use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the core service origin
pub const CORE_URL_ENV: &str = "FRUIT_API_URL";

const DEFAULT_CORE_URL: &str = "http://localhost:8080";
const DEFAULT_STUDIES_URL: &str = "http://localhost:8082";
const DEFAULT_ROOMS_URL: &str = "http://localhost:8083";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    /// Auth, users, contacts and statuses
    #[serde(default = "default_core_url")]
    pub core_url: String,
    /// Lessons and studies
    #[serde(default = "default_studies_url")]
    pub studies_url: String,
    /// Rooms and reservations
    #[serde(default = "default_rooms_url")]
    pub rooms_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Contacts fetched per list request
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_core_url() -> String {
    DEFAULT_CORE_URL.to_string()
}
fn default_studies_url() -> String {
    DEFAULT_STUDIES_URL.to_string()
}
fn default_rooms_url() -> String {
    DEFAULT_ROOMS_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_page_size() -> u32 {
    20
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            core_url: default_core_url(),
            studies_url: default_studies_url(),
            rooms_url: default_rooms_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

impl ServicesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Per-invocation overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub core_url: Option<String>,
    pub studies_url: Option<String>,
    pub rooms_url: Option<String>,
}

impl Config {
    pub fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "fruit", "fruit")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let proj_dirs = Self::project_dirs()?;
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply `FRUIT_API_URL`, then command-line flags, on top of the file.
    pub fn with_overrides(mut self, env_core_url: Option<String>, overrides: &Overrides) -> Self {
        if let Some(url) = env_core_url.filter(|u| !u.trim().is_empty()) {
            self.services.core_url = url;
        }
        if let Some(url) = &overrides.core_url {
            self.services.core_url = url.clone();
        }
        if let Some(url) = &overrides.studies_url {
            self.services.studies_url = url.clone();
        }
        if let Some(url) = &overrides.rooms_url {
            self.services.rooms_url = url.clone();
        }
        self
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "core_url" => self.services.core_url.clone(),
            "studies_url" => self.services.studies_url.clone(),
            "rooms_url" => self.services.rooms_url.clone(),
            "request_timeout_secs" => self.services.request_timeout_secs.to_string(),
            "page_size" => self.ui.page_size.to_string(),
            _ => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, Self::KEYS.join(", ")),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<()> {
        match key {
            "core_url" => self.services.core_url = value,
            "studies_url" => self.services.studies_url = value,
            "rooms_url" => self.services.rooms_url = value,
            "request_timeout_secs" => self.services.request_timeout_secs = value.parse()?,
            "page_size" => self.ui.page_size = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {}. Valid keys: {}", key, Self::KEYS.join(", ")),
        }
        Ok(())
    }

    pub const KEYS: &'static [&'static str] =
        &["core_url", "studies_url", "rooms_url", "request_timeout_secs", "page_size"];
}
