//! Typed configuration surface for the agent fabric.
//!
//! Covers exactly the recognized keys a deployment uses to stand up a
//! registry or an agent runtime: `system.*`, `api_service.*`, `proxy.*`, and
//! one `mcp` entry per auxiliary tool service. Parsing a single TOML document
//! into these types is supported (`AppConfig::from_toml_str`); multi-source
//! precedence merging (XDG + `.env` layering, as the teacher's loader does)
//! is not part of this crate — callers that need a config *file* read one
//! path directly and hand it here.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("parse config toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("read config file: {0}")]
    Read(std::io::Error),
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AppConfig {
    pub system: SystemConfig,
    #[serde(default)]
    pub api_service: Option<ApiServiceConfig>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub mcp: HashMap<String, McpServiceConfig>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SystemConfig {
    pub port: u16,
    pub keep_alive_interval_secs: u64,
    pub keep_alive_threshold_secs: u64,
    #[serde(default)]
    pub supported_media_types: Vec<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl SystemConfig {
    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    pub fn keep_alive_threshold(&self) -> Duration {
        Duration::from_secs(self.keep_alive_threshold_secs)
    }

    /// The keep-alive contract requires `interval < threshold` strictly,
    /// recommended ratio 1:3.
    pub fn keep_alive_ratio_is_valid(&self) -> bool {
        self.keep_alive_interval_secs > 0 && self.keep_alive_interval_secs < self.keep_alive_threshold_secs
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ApiServiceConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    #[serde(default)]
    pub tools: bool,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub r#use: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct McpServiceConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_system_section() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [system]
            port = 8080
            keep_alive_interval_secs = 10
            keep_alive_threshold_secs = 30
            supported_media_types = ["text/plain", "image/png"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.system.port, 8080);
        assert_eq!(cfg.system.supported_media_types.len(), 2);
        assert!(cfg.system.keep_alive_ratio_is_valid());
    }

    #[test]
    fn parses_nested_api_service_proxy_and_mcp_sections() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [system]
            port = 9000
            keep_alive_interval_secs = 5
            keep_alive_threshold_secs = 20

            [api_service]
            api_key = "sk-test"
            model = "gpt-test"
            base_url = "https://api.example.com/v1"
            tools = true

            [proxy]
            enabled = true
            use = "socks5"

            [mcp.files]
            port = 7001
            "#,
        )
        .unwrap();
        let api = cfg.api_service.unwrap();
        assert_eq!(api.model, "gpt-test");
        assert!(api.tools);
        assert!(cfg.proxy.unwrap().enabled);
        assert_eq!(cfg.mcp["files"].port, 7001);
    }

    #[test]
    fn detects_invalid_keep_alive_ratio() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [system]
            port = 1
            keep_alive_interval_secs = 30
            keep_alive_threshold_secs = 10
            "#,
        )
        .unwrap();
        assert!(!cfg.system.keep_alive_ratio_is_valid());
    }

    #[test]
    fn reads_from_a_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[system]\nport = 1\nkeep_alive_interval_secs = 1\nkeep_alive_threshold_secs = 3\n",
        )
        .unwrap();
        let cfg = AppConfig::from_toml_file(&path).unwrap();
        assert_eq!(cfg.system.port, 1);
    }

    #[test]
    fn missing_file_surfaces_a_read_error() {
        let err = AppConfig::from_toml_file("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read(_)));
    }
}
