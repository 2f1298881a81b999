use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt, fs,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable that overrides `provider.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Provider credential, validated non-blank and never printed.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(anyhow!("Provider API key is blank"));
        }
        Ok(Self(SecretString::new(raw)))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 8000)) }
    }
}

/// Upstream paths, relative to [`ProviderConfig::base_url`].
///
/// Provider API versions move independently of the gateway, so these are
/// configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocoding: String,
    pub current: String,
    pub forecast: String,
    pub one_call: String,
    pub time_machine: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocoding: "/geo/1.0/direct".into(),
            current: "/data/2.5/weather".into(),
            forecast: "/data/2.5/forecast".into(),
            one_call: "/data/2.5/onecall".into(),
            time_machine: "/data/2.5/onecall/timemachine".into(),
        }
    }
}

/// Settings for the upstream weather provider.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub endpoints: Endpoints,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 10,
            endpoints: Endpoints::default(),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// log_filter = "info"
///
/// [server]
/// bind = "127.0.0.1:8000"
///
/// [provider]
/// api_key = "..."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_filter: String,
    pub log_format: LogFormat,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "info".into(),
            log_format: LogFormat::default(),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl Config {
    /// Load config from `path`, or from the platform config file when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_file_path()?,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-gateway", "weather-gateway")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply overrides from a dotenv file; a missing file changes nothing.
    ///
    /// Call before [`Config::with_env_overrides`] so the process environment
    /// wins over the file.
    pub fn with_dotenv_overrides(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(self);
        }

        let vars = dotenvy::from_path_iter(path)
            .and_then(|iter| iter.collect::<Result<HashMap<String, String>, _>>())
            .with_context(|| format!("Failed to read env file: {}", path.display()))?;

        tracing::debug!(path = %path.display(), "applying env file");
        Ok(self.with_overrides_from(|name| vars.get(name).cloned()))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.provider.api_key = Some(key);
        }
        self
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.provider.api_key = Some(api_key);
    }

    /// The validated provider credential.
    pub fn api_key(&self) -> Result<ApiKey> {
        let raw = self.provider.api_key.as_deref().ok_or_else(|| {
            anyhow!(
                "No provider API key configured.\n\
                 Hint: set {API_KEY_ENV} or run `weather-gateway configure`."
            )
        })?;

        ApiKey::new(raw).with_context(|| {
            format!("Invalid provider API key.\nHint: set {API_KEY_ENV} to a non-empty value.")
        })
    }

    /// Upstream call bound; zero is rejected since every call would fail.
    pub fn timeout(&self) -> Result<Duration> {
        if self.provider.timeout_secs == 0 {
            return Err(anyhow!(
                "provider.timeout_secs must be greater than zero.\n\
                 Hint: remove it to use the default of 10 seconds."
            ));
        }
        Ok(Duration::from_secs(self.provider.timeout_secs))
    }
}
