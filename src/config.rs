use crate::data::{DataLocations, FetchMode, COUNTIES_URL, EDUCATION_URL};
use crate::projection::ProjectionKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or local path of the education records.
    pub education: String,
    /// URL or local path of the counties topology.
    pub topology: String,
    pub fetch_mode: FetchMode,
    pub timeout_secs: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            education: EDUCATION_URL.to_string(),
            topology: COUNTIES_URL.to_string(),
            fetch_mode: FetchMode::default(),
            timeout_secs: 30,
        }
    }
}

impl InputConfig {
    pub fn locations(&self) -> DataLocations {
        DataLocations {
            education: self.education.clone(),
            topology: self.topology.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RenderConfig {
    pub projection: ProjectionKind,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub svg: PathBuf,
    pub html: Option<PathBuf>,
    pub geojson_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            svg: PathBuf::from("map.svg"),
            html: None,
            geojson_dir: PathBuf::from("geojson"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Like `load_from_file`, but a missing file means built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(?path, "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }
}
