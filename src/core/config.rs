use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Relay configuration, loaded once at startup.
///
/// Every field is optional in the file; the environment overlay and the
/// built-in defaults fill the gaps. Nothing reads configuration after
/// startup — the resolved values are threaded into the dispatcher when it
/// is constructed.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    /// Port for the HTTP listener (flag and `PORT` override this)
    pub port: Option<u16>,
    /// Bearer credential for the chat-completion endpoint
    pub api_key: Option<String>,
    /// URL of the basic fallback endpoint
    pub basic_endpoint: Option<String>,
    /// Override for the chat-completion API base URL
    pub chat_api_base: Option<String>,
    /// Override for the assistant persona sent as the system message
    pub persona: Option<String>,
    /// Per-mode model overrides (`pro`, `light`)
    #[serde(default)]
    pub models: HashMap<String, String>,
    /// Upstream request timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Config, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path();
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(config_path: &PathBuf) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables win over file values. These are the names the
    /// hosting environment has always used, so existing deployments keep
    /// working without a config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("OPENROUTER_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(endpoint) = env::var("BASIC_ENDPOINT") {
            if !endpoint.is_empty() {
                self.basic_endpoint = Some(endpoint);
            }
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse() {
                self.port = Some(port);
            }
        }
    }

    fn get_config_path() -> PathBuf {
        let proj_dirs = ProjectDirs::from("app", "genisi", "genisi-relay")
            .expect("Failed to determine config directory");
        proj_dirs.config_dir().join("config.toml")
    }
}
