use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Result, SdkError};

/// Configuration for one Octane server connection.
///
/// Loaded from a TOML/JSON/YAML file or built programmatically by the hosting
/// CI plugin. Every REST URL the SDK builds is scoped by the shared space and
/// workspace identifiers configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OctaneConfig {
    /// Octane server base URL (e.g., 'https://octane.example.com')
    pub url: String,

    /// Shared space (tenant) identifier
    pub shared_space: String,

    /// Workspace identifier within the shared space
    #[serde(default)]
    pub workspace: Option<String>,

    /// CI server instance identifier, unique per plugin installation
    pub instance_id: String,

    /// API client ID used for sign-in
    pub client_id: String,

    /// API client secret used for sign-in
    pub client_secret: String,

    /// CI server type reported to Octane (e.g., 'jenkins', 'bamboo')
    #[serde(default = "default_server_type")]
    pub server_type: String,

    /// Optional HTTP(S) proxy
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Directory for durable work queues; queues stay in-memory when unset
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// Proxy URL (e.g., 'http://proxy.example.com:8080')
    pub url: String,

    /// Proxy username
    #[serde(default)]
    pub username: Option<String>,

    /// Proxy password
    #[serde(default)]
    pub password: Option<String>,
}

fn default_server_type() -> String {
    "jenkins".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    20
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl OctaneConfig {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./octane.toml
    /// 3. ./octane.json
    /// 4. ./octane.yaml
    /// 5. ./octane.yml
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["octane.toml", "octane.json", "octane.yaml", "octane.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Err(SdkError::Config(
            "no configuration file found (octane.toml/json/yaml)".to_string(),
        ))
    }

    /// Load configuration from a specific file path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?,
            "json" => serde_json::from_str(&contents)
                .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents).map_err(|e| e.to_string()))
                .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks the fields every service depends on.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.url)
            .map_err(|e| SdkError::Config(format!("invalid server URL '{}': {e}", self.url)))?;

        if self.shared_space.is_empty() {
            return Err(SdkError::Config("shared-space must not be empty".to_string()));
        }
        if self.instance_id.is_empty() {
            return Err(SdkError::Config("instance-id must not be empty".to_string()));
        }

        if let Some(proxy) = &self.proxy {
            Url::parse(&proxy.url)
                .map_err(|e| SdkError::Config(format!("invalid proxy URL '{}': {e}", proxy.url)))?;
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Workspace identifier, or an error when a workspace-scoped call is made
    /// without one configured.
    pub fn require_workspace(&self) -> Result<&str> {
        self.workspace
            .as_deref()
            .ok_or_else(|| SdkError::Config("workspace is not configured".to_string()))
    }
}
