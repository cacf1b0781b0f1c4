use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::workflow::DEFAULT_MAX_STEPS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub engine: EngineConfig,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Step budget for runs started over HTTP.
    pub max_steps: usize,
    /// Register the bundled code review graph at startup.
    pub sample_graph: bool,
    /// Optional YAML file of graphs to register at startup.
    pub graphs_file: Option<PathBuf>,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_steps = match lookup("MAX_STEPS") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                crate::Error::Config(format!("MAX_STEPS must be a positive integer: {}", e))
            })?,
            None => DEFAULT_MAX_STEPS,
        };

        let sample_graph = match lookup("SAMPLE_GRAPH") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                crate::Error::Config(format!("SAMPLE_GRAPH must be a boolean, got '{}'", raw))
            })?,
            None => true,
        };

        let config = Config {
            server: ServerConfig {
                addr: lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            },
            engine: EngineConfig {
                max_steps,
                sample_graph,
                graphs_file: lookup("GRAPHS_FILE")
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from),
            },
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        // Validate engine configuration
        if config.engine.max_steps == 0 {
            return Err(crate::Error::Config(
                "MAX_STEPS must be greater than zero".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                addr: "0.0.0.0:8080".to_string(),
            },
            engine: EngineConfig {
                max_steps: DEFAULT_MAX_STEPS,
                sample_graph: true,
                graphs_file: None,
            },
            log_level: "info".to_string(),
        }
    }
}
