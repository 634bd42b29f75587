use std::time::Duration;

/// Public storefront host serving search, details and reviews.
pub const DEFAULT_STORE_BASE: &str = "https://store.steampowered.com";
const DEFAULT_LANGUAGE: &str = "schinese";
const DEFAULT_COUNTRY: &str = "CN";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime configuration of the storefront client.
#[derive(Debug, Clone)]
pub struct SteamConfig {
    pub store_base: String,
    /// Language code passed as `l`.
    pub language: String,
    /// Country code passed as `cc`.
    pub country: String,
    pub timeout: Duration,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            store_base: DEFAULT_STORE_BASE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            country: DEFAULT_COUNTRY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
