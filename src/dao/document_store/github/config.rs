use std::time::Duration;

use crate::dao::document_store::StoreCredentials;

/// Public API root of the hosting platform.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
/// File inside the repository holding the collection document.
pub const DEFAULT_DOCUMENT_PATH: &str = "games.json";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration describing where the collection document lives.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub api_base: String,
    pub path: String,
    pub branch: Option<String>,
    pub timeout: Duration,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            path: DEFAULT_DOCUMENT_PATH.to_string(),
            branch: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GithubConfig {
    /// Point the client at another API root (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Commit to a specific branch instead of the repository default.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Read credentials from `GITHUB_TOKEN`, `GITHUB_OWNER` and `GITHUB_REPO`.
///
/// Returns `None` unless all three are set and non-empty.
pub fn credentials_from_env() -> Option<StoreCredentials> {
    let read = |var: &str| std::env::var(var).ok().filter(|value| !value.trim().is_empty());
    Some(StoreCredentials::new(
        read("GITHUB_TOKEN")?,
        read("GITHUB_OWNER")?,
        read("GITHUB_REPO")?,
    ))
}
