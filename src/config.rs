//! Application-level configuration loading, including persisted store credentials.

use std::{
    env, fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    dao::{
        document_store::{
            StoreCredentials,
            github::{GithubConfig, credentials_from_env},
        },
        storefront::steam::SteamConfig,
    },
    services::{enrichment::RefreshSchedule, update_coordinator::RetryPolicy},
};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GAME_GALLERY_CONFIG_PATH";
/// Default location of the persisted store credentials.
const DEFAULT_CREDENTIALS_PATH: &str = "config/credentials.json";
/// Environment variable that overrides [`DEFAULT_CREDENTIALS_PATH`].
const CREDENTIALS_PATH_ENV: &str = "GAME_GALLERY_CREDENTIALS_PATH";

/// Which [`crate::dao::document_store::DocumentStore`] implementation backs the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// File in a hosted git repository.
    #[default]
    Github,
    /// Volatile in-process document.
    Memory,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub backend: StoreBackend,
    pub github: GithubConfig,
    pub refresh: RefreshSchedule,
    pub retry: RetryPolicy,
    pub storefront: SteamConfig,
    /// Where credentials saved from the settings surface are written.
    pub credentials_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            github: GithubConfig::default(),
            refresh: RefreshSchedule::default(),
            retry: RetryPolicy::default(),
            storefront: SteamConfig::default(),
            credentials_path: resolve_path(CREDENTIALS_PATH_ENV, DEFAULT_CREDENTIALS_PATH),
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_path(CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH);
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        backend = ?app_config.backend,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Credentials to start with: the environment wins over the persisted file.
    pub fn initial_credentials(&self) -> Option<StoreCredentials> {
        if let Some(credentials) = credentials_from_env() {
            info!("using store credentials from the environment");
            return Some(credentials);
        }
        load_credentials(&self.credentials_path)
    }
}

/// Read persisted credentials; a missing or unreadable file means "not configured".
pub fn load_credentials(path: &Path) -> Option<StoreCredentials> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read credentials");
            return None;
        }
    };
    match serde_json::from_str::<StoreCredentials>(&contents) {
        Ok(credentials) => Some(credentials),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to parse credentials");
            None
        }
    }
}

/// Persist credentials, creating the parent directory when needed.
pub fn save_credentials(path: &Path, credentials: &StoreCredentials) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(credentials).map_err(io::Error::other)?;
    fs::write(path, body)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    store: RawStore,
    refresh: RawRefresh,
    update: RawUpdate,
    storefront: RawStorefront,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStore {
    backend: StoreBackend,
    path: Option<String>,
    branch: Option<String>,
    api_base: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRefresh {
    initial_delay_ms: Option<u64>,
    interval_secs: Option<u64>,
    item_pause_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUpdate {
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
    backoff_max_ms: Option<u64>,
    /// `0` disables the overall deadline.
    deadline_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStorefront {
    store_base: Option<String>,
    language: Option<String>,
    country: Option<String>,
    timeout_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let mut github = defaults.github;
        let store = value.store;
        if let Some(path) = store.path {
            github.path = path;
        }
        if let Some(api_base) = store.api_base {
            github = github.with_api_base(api_base);
        }
        if let Some(branch) = store.branch {
            github = github.with_branch(branch);
        }
        if let Some(ms) = store.timeout_ms {
            github.timeout = Duration::from_millis(ms);
        }

        let mut refresh = defaults.refresh;
        if let Some(ms) = value.refresh.initial_delay_ms {
            refresh.initial_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = value.refresh.interval_secs {
            refresh.interval = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = value.refresh.item_pause_ms {
            refresh.item_pause = Duration::from_millis(ms);
        }

        let mut retry = defaults.retry;
        if let Some(attempts) = value.update.max_attempts {
            retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = value.update.backoff_base_ms {
            retry.backoff_base = Duration::from_millis(ms);
        }
        if let Some(ms) = value.update.backoff_max_ms {
            retry.backoff_max = Duration::from_millis(ms);
        }
        if let Some(ms) = value.update.deadline_ms {
            retry.deadline = (ms > 0).then(|| Duration::from_millis(ms));
        }

        let mut storefront = defaults.storefront;
        if let Some(store_base) = value.storefront.store_base {
            storefront.store_base = store_base;
        }
        if let Some(language) = value.storefront.language {
            storefront.language = language;
        }
        if let Some(country) = value.storefront.country {
            storefront.country = country;
        }
        if let Some(ms) = value.storefront.timeout_ms {
            storefront.timeout = Duration::from_millis(ms);
        }

        Self {
            backend: store.backend,
            github,
            refresh,
            retry,
            storefront,
            credentials_path: defaults.credentials_path,
        }
    }
}

/// Resolve a path taking its environment override into account.
fn resolve_path(env_key: &str, default: &str) -> PathBuf {
    env::var_os(env_key)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(default))
}
