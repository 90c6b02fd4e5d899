use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Catalog document configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Local path of the catalog document owned by the reconciler.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Path of the catalog document inside the registry repository.
    /// Submissions may touch this file and nothing else.
    #[serde(default = "default_document_name")]
    pub document_name: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            document_name: default_document_name(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("registry.json")
}

fn default_document_name() -> String {
    "registry.json".to_string()
}

/// Hosting platform configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostingConfig {
    /// Base URL serving raw file content (e.g., "https://raw.githubusercontent.com")
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
    /// Base URL of the REST API used for pull request lookups
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Branch manifests and entry files are read from
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Manifest path relative to the repository root
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// Per-fetch timeout in seconds (default: 15)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HostingConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            raw_base_url: default_raw_base_url(),
            api_base_url: default_api_base_url(),
            default_branch: default_branch(),
            manifest_path: default_manifest_path(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_manifest_path() -> String {
    "sop.toml".to_string()
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("sopreg/{}", env!("CARGO_PKG_VERSION"))
}

/// Health sweep configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepConfig {
    /// Run the periodic sweep from inside the server.
    /// When disabled, sweeps only happen through the trigger endpoint.
    #[serde(default)]
    pub enabled: bool,
    /// Seconds between scheduled sweeps (default: one day).
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Maximum entries being reconciled at once.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

fn default_interval() -> u64 {
    86_400
}

fn default_max_concurrent_fetches() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.catalog.path.to_str().unwrap(), "registry.json");
        assert_eq!(config.catalog.document_name, "registry.json");
        assert_eq!(config.hosting.default_branch, "main");
        assert_eq!(config.hosting.manifest_path, "sop.toml");
        assert_eq!(config.hosting.fetch_timeout_secs, 15);
        assert!(!config.sweep.enabled);
        assert_eq!(config.sweep.interval_secs, 86_400);
        assert_eq!(config.sweep.max_concurrent_fetches, 8);
    }

    #[test]
    fn test_deserialize_server_section() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_hosting_and_sweep() {
        let toml = r#"
[hosting]
raw_base_url = "http://localhost:9999/raw"
default_branch = "trunk"
fetch_timeout_secs = 3

[sweep]
enabled = true
interval_secs = 600
max_concurrent_fetches = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.hosting.raw_base_url, "http://localhost:9999/raw");
        assert_eq!(config.hosting.default_branch, "trunk");
        assert_eq!(config.hosting.fetch_timeout(), Duration::from_secs(3));
        // untouched fields keep defaults
        assert_eq!(config.hosting.manifest_path, "sop.toml");
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval_secs, 600);
        assert_eq!(config.sweep.max_concurrent_fetches, 2);
    }

    #[test]
    fn test_deserialize_custom_catalog_path() {
        let toml = r#"
[catalog]
path = "/data/registry.json"
document_name = "index/registry.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.path.to_str().unwrap(), "/data/registry.json");
        assert_eq!(config.catalog.document_name, "index/registry.json");
    }

    #[test]
    fn test_user_agent_mentions_crate_version() {
        let hosting = HostingConfig::default();
        assert!(hosting.user_agent.starts_with("sopreg/"));
    }
}
