use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub layout: LayoutConfig,
    pub sync: SyncConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub push_addr: String,
    pub command_addr: String,
    pub connect_timeout_ms: u64,
    pub command_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            push_addr: "127.0.0.1:5001".to_string(),
            command_addr: "127.0.0.1:5000".to_string(),
            connect_timeout_ms: 3_000,
            command_timeout_ms: 10_000,
        }
    }
}

impl ServerConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub iterations: usize,
    pub node_radius: f32,
    pub initial_temperature_divisor: f32,
    pub cooling_factor: f32,
    pub reference_width: f32,
    pub reference_height: f32,
    pub spacing_factor: f32,
    pub minimizer_rounds: usize,
    pub collision_inflation: f32,
    pub nudge_fraction: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            node_radius: 20.0,
            initial_temperature_divisor: 10.0,
            cooling_factor: 0.95,
            reference_width: 800.0,
            reference_height: 600.0,
            spacing_factor: 1.3,
            minimizer_rounds: 5,
            collision_inflation: 1.5,
            nudge_fraction: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub flash_ms: u64,
    pub repaint_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            flash_ms: 1_500,
            repaint_ms: 100,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_keep_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"sync": {"max_attempts": 8}, "layout": {"iterations": 250}}"#,
        )
        .expect("config parses");
        assert_eq!(config.sync.max_attempts, 8);
        assert_eq!(config.sync.base_delay_ms, 1_000);
        assert_eq!(config.layout.iterations, 250);
        assert_eq!(config.layout.spacing_factor, 1.3);
        assert_eq!(config.server.command_addr, "127.0.0.1:5000");
    }

    #[test]
    fn missing_path_means_defaults() {
        let config = load_config(None).expect("defaults load");
        assert_eq!(config.view.flash_ms, 1_500);
    }
}
