use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL of the backend's OpenAI-compatible API, e.g. "http://vllm:8000/v1"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token attached to every backend call when set
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Directory holding the per-day llm-YYYY-MM-DD.jsonl files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8001/v1".to_string()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    10
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            probe_timeout_seconds: default_probe_timeout(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
        }
    }
}

/// Load configuration from an optional file plus LLM_RELAY__* env vars
/// (e.g. LLM_RELAY__BACKEND__BASE_URL overrides backend.base_url).
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    } else {
        builder = builder.add_source(config::File::with_name("config").required(false));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix("LLM_RELAY").separator("__"))
        .build()?;

    let mut cfg: Config = settings.try_deserialize()?;

    // A trailing slash would produce ".../v1//models" URLs
    while cfg.backend.base_url.ends_with('/') {
        cfg.backend.base_url.pop();
    }

    validate_config(&cfg)?;

    Ok(cfg)
}

fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.backend.base_url.is_empty() {
        anyhow::bail!("backend.base_url cannot be empty");
    }
    if cfg.backend.probe_timeout_seconds == 0 {
        anyhow::bail!("backend.probe_timeout_seconds must be greater than zero");
    }
    if cfg.backend.request_timeout_seconds == 0 {
        anyhow::bail!("backend.request_timeout_seconds must be greater than zero");
    }
    if cfg.health.poll_interval_seconds == 0 {
        anyhow::bail!("health.poll_interval_seconds must be greater than zero");
    }
    Ok(())
}
