use baitline_core::{Error, Result};
use baitline_ingress::HttpOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub http: HttpOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            logging: LoggingConfig::default(),
            http: HttpOptions::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file (by extension) or YAML otherwise
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Config` if it does not parse into a `ServerConfig`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let parsed = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents).map_err(|e| e.to_string())
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("BAITLINE_HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("BAITLINE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid BAITLINE_PORT '{}', using {}", val, self.port),
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("BAITLINE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("BAITLINE_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "text" => self.logging.format = LogFormat::Text,
                "json" => self.logging.format = LogFormat::Json,
                _ => eprintln!("Warning: Invalid BAITLINE_LOG_FORMAT '{}', using default", val),
            }
        }

        // HTTP settings
        if let Ok(val) = std::env::var("BAITLINE_CORS")
            && let Ok(enabled) = val.parse::<bool>()
        {
            self.http.cors_enabled = enabled;
        }

        if let Ok(val) = std::env::var("BAITLINE_MAX_BODY_BYTES")
            && let Ok(bytes) = val.parse::<usize>()
        {
            self.http.max_body_bytes = bytes;
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}
