use super::error::Error;
use super::listing::DEFAULT_FORUM;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const REDDIT_CLIENT_VAR: &str = "REDDIT_CLIENT";
pub const REDDIT_SECRET_VAR: &str = "REDDIT_SECRET";
pub const QUANDL_KEY_VAR: &str = "QUANDL_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NasdaqProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedditProviderConfig {
    pub auth_url: String,
    pub api_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub nasdaq: Option<NasdaqProviderConfig>,
    pub yahoo: Option<YahooProviderConfig>,
    pub reddit: Option<RedditProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            nasdaq: Some(NasdaqProviderConfig {
                base_url: "https://data.nasdaq.com".to_string(),
            }),
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
            reddit: Some(RedditProviderConfig {
                auth_url: "https://www.reddit.com".to_string(),
                api_url: "https://oauth.reddit.com".to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn nasdaq_base_url(&self) -> &str {
        self.nasdaq
            .as_ref()
            .map_or("https://data.nasdaq.com", |p| &p.base_url)
    }

    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or("https://query1.finance.yahoo.com", |p| &p.base_url)
    }

    pub fn reddit_urls(&self) -> (&str, &str) {
        self.reddit.as_ref().map_or(
            ("https://www.reddit.com", "https://oauth.reddit.com"),
            |p| (&p.auth_url, &p.api_url),
        )
    }
}

fn default_symbols() -> Vec<String> {
    vec!["AMC".to_string(), "GME".to_string(), "BB".to_string()]
}

fn default_forum() -> String {
    DEFAULT_FORUM.to_string()
}

fn default_window_days() -> i64 {
    365
}

fn default_post_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Reddit account the user agent is registered to.
    pub account: String,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_forum")]
    pub forum: String,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_post_limit")]
    pub post_limit: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            account: "wsbtrack".to_string(),
            symbols: default_symbols(),
            forum: default_forum(),
            window_days: default_window_days(),
            post_limit: default_post_limit(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "wsbtrack", "wsbtrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// First symbol of the watch list, used when a command names none.
    pub fn default_symbol(&self) -> &str {
        self.symbols.first().map_or("GME", |s| s.as_str())
    }
}

/// Provider credentials supplied through the process environment.
#[derive(Clone)]
pub struct Credentials {
    pub reddit_client: String,
    pub reddit_secret: String,
    pub quandl_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("reddit_client", &self.reddit_client)
            .field("reddit_secret", &"***")
            .field("quandl_key", &"***")
            .finish()
    }
}

impl Credentials {
    /// Reads credentials from the environment after loading a `.env` file, if any.
    pub fn from_env() -> Result<Self, Error> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {e}"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from an arbitrary variable lookup. Every variable is
    /// required and must be non-empty.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Configuration(format!("{key} is not set")))
        };

        Ok(Credentials {
            reddit_client: required(REDDIT_CLIENT_VAR)?,
            reddit_secret: required(REDDIT_SECRET_VAR)?,
            quandl_key: required(QUANDL_KEY_VAR)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
account: "dudik-bender"
symbols: ["GME", "AMC"]
window_days: 90
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.account, "dudik-bender");
        assert_eq!(config.symbols, vec!["GME", "AMC"]);
        assert_eq!(config.default_symbol(), "GME");
        assert_eq!(config.window_days, 90);
        assert_eq!(config.forum, "wallstreetbets");
        assert_eq!(config.post_limit, 20);
        assert_eq!(
            config.providers.yahoo_base_url(),
            "https://query1.finance.yahoo.com"
        );
        assert_eq!(config.providers.nasdaq_base_url(), "https://data.nasdaq.com");

        let yaml_str_with_providers = r#"
account: "tester"
forum: "stocks"
providers:
  nasdaq:
    base_url: "http://example.com/nasdaq"
  reddit:
    auth_url: "http://example.com/auth"
    api_url: "http://example.com/api"
        "#;
        let config_with_providers: AppConfig =
            serde_yaml::from_str(yaml_str_with_providers).unwrap();
        assert_eq!(config_with_providers.forum, "stocks");
        assert_eq!(config_with_providers.symbols, vec!["AMC", "GME", "BB"]);
        assert_eq!(
            config_with_providers.providers.nasdaq_base_url(),
            "http://example.com/nasdaq"
        );
        assert_eq!(
            config_with_providers.providers.reddit_urls(),
            ("http://example.com/auth", "http://example.com/api")
        );
        // Omitted providers fall back to the public endpoints.
        assert_eq!(
            config_with_providers.providers.yahoo_base_url(),
            "https://query1.finance.yahoo.com"
        );
    }

    #[test]
    fn test_missing_account_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("symbols: [GME]");
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (REDDIT_CLIENT_VAR, "client"),
            (REDDIT_SECRET_VAR, "secret"),
            (QUANDL_KEY_VAR, "key"),
        ]
        .into_iter()
        .collect();

        let creds = Credentials::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.reddit_client, "client");
        assert_eq!(creds.reddit_secret, "secret");
        assert_eq!(creds.quandl_key, "key");
        assert!(!format!("{creds:?}").contains("secret\""));
    }

    #[test]
    fn test_missing_credential_fails_fast() {
        let err = Credentials::from_lookup(|k| {
            (k != QUANDL_KEY_VAR).then(|| "value".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.to_string(), "Configuration error: QUANDL_KEY is not set");

        let err = Credentials::from_lookup(|k| {
            Some(if k == REDDIT_SECRET_VAR { "  " } else { "value" }.to_string())
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: REDDIT_SECRET is not set"
        );
    }
}
