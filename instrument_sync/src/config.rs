//! Client configuration: parsing, normalization, and loading.
//!
//! A small TOML file tells the client where the instruments API lives and how
//! hard it may hit it. Every key is optional; omitted keys take the values of
//! [`ClientConfig::default`].
//!
//! ```toml
//! base_url = "https://instruments.internal:8443"
//! api_prefix = "/api/v1"
//! timeout_secs = 10
//! list_limit = 1000
//! requests_per_second = 20
//! default_page_size = 25
//! search_debounce_ms = 300
//! ```
//!
//! Key behaviors:
//! - Normalization trims the URL pieces, strips trailing `/`, makes sure the
//!   prefix starts with `/`, and range-checks the numbers.
//! - `INSTRUMENTS_API_URL`, when set, replaces `base_url` before normalization.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]

use std::time::Duration;

use anyhow::Context;
use instrument_api::{models::list_filter::MAX_LIMIT, store::http::HttpStoreOptions};
use serde::{Deserialize, Serialize};
use shared_utils::config::{ConfigError, ensure_range, invalid};
use tracing::debug;

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV_VAR: &str = "INSTRUMENTS_API_URL";

/// Connection and behaviour settings for an [`InstrumentSession`](crate::session::InstrumentSession).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Scheme + host (+ port) of the API server.
    pub base_url: String,
    /// Path prefix in front of `/instruments/`.
    pub api_prefix: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Batch size requested by LIST (1..=1000). Search and paging happen
    /// within this batch.
    pub list_limit: u32,
    pub requests_per_second: u32,
    pub default_page_size: usize,
    /// Quiet period before a search keystroke triggers a fetch.
    pub search_debounce_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            timeout_secs: 10,
            list_limit: MAX_LIMIT,
            requests_per_second: 20,
            default_page_size: instrument_api::query::DEFAULT_PAGE_SIZE,
            search_debounce_ms: 300,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// Options for [`HttpStore`](instrument_api::store::http::HttpStore),
    /// with the bearer token picked up from the environment.
    pub fn http_store_options(&self) -> HttpStoreOptions {
        HttpStoreOptions {
            base_url: self.base_url.clone(),
            api_prefix: self.api_prefix.clone(),
            timeout: self.timeout(),
            requests_per_second: self.requests_per_second,
            token: None,
        }
        .with_token_from_env()
    }
}

/// Normalize a config in place.
///
/// Errors:
/// - `base_url` empty or without an `http://` / `https://` scheme
/// - any numeric setting outside its range
pub fn normalize_config(cfg: &mut ClientConfig) -> Result<(), ConfigError> {
    let base = cfg.base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(invalid("base_url", "cannot be empty"));
    }
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(invalid("base_url", format!("`{base}` must start with http:// or https://")));
    }
    cfg.base_url = base.to_string();

    let prefix = cfg.api_prefix.trim().trim_matches('/');
    cfg.api_prefix = if prefix.is_empty() {
        String::new()
    } else {
        format!("/{prefix}")
    };

    ensure_range("timeout_secs", cfg.timeout_secs, 1, 300)?;
    ensure_range("list_limit", cfg.list_limit, 1, MAX_LIMIT)?;
    ensure_range("requests_per_second", cfg.requests_per_second, 1, 1000)?;
    ensure_range("default_page_size", cfg.default_page_size, 1, 500)?;
    ensure_range("search_debounce_ms", cfg.search_debounce_ms, 0, 10_000)?;
    Ok(())
}

/// Replace settings that have an environment override.
pub fn apply_env_overrides(cfg: &mut ClientConfig) {
    if let Some(url) = shared_utils::env::env_override(BASE_URL_ENV_VAR) {
        debug!(%url, "base_url overridden from {BASE_URL_ENV_VAR}");
        cfg.base_url = url;
    }
}

/// Parse, apply env overrides, and normalize a config from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<ClientConfig> {
    let mut cfg: ClientConfig = toml::from_str(toml_str).context("failed to parse client config TOML")?;
    apply_env_overrides(&mut cfg);
    normalize_config(&mut cfg).context("invalid client config")?;
    Ok(cfg)
}

/// Read a config TOML file from disk, then see [`load_config_str`].
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<ClientConfig> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}

/// The built-in defaults with env overrides applied; used when no file is given.
pub fn load_default() -> anyhow::Result<ClientConfig> {
    load_config_str("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn empty_file_yields_defaults() {
        let cfg = load_config_str("").unwrap();
        if std::env::var(BASE_URL_ENV_VAR).is_err() {
            assert_eq!(cfg, ClientConfig::default());
        }
    }

    #[test]
    fn normalizes_url_pieces() {
        let mut cfg = ClientConfig {
            base_url: "  https://api.example.com/// ".into(),
            api_prefix: "api/v2/".into(),
            ..Default::default()
        };
        normalize_config(&mut cfg).unwrap();
        assert_eq!(cfg.base_url, "https://api.example.com");
        assert_eq!(cfg.api_prefix, "/api/v2");

        let mut bare = ClientConfig {
            api_prefix: " / ".into(),
            ..Default::default()
        };
        normalize_config(&mut bare).unwrap();
        assert_eq!(bare.api_prefix, "");
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = ClientConfig {
            base_url: "ftp://files".into(),
            ..Default::default()
        };
        let err = normalize_config(&mut cfg).unwrap_err();
        assert!(err.to_string().contains("base_url"));

        let mut cfg = ClientConfig {
            list_limit: 0,
            ..Default::default()
        };
        let err = normalize_config(&mut cfg).unwrap_err();
        assert_eq!(err.to_string(), "`list_limit` = 0 is out of range (1..=1000)");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = load_config_str("list_limt = 10").unwrap_err();
        assert!(format!("{err:#}").contains("list_limt"));
    }

    #[test]
    #[serial]
    fn env_overrides_base_url() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var(BASE_URL_ENV_VAR, "http://override:9000/") };
        let cfg = load_config_str(r#"base_url = "http://from-file:8000""#);
        unsafe { std::env::remove_var(BASE_URL_ENV_VAR) };

        assert_eq!(cfg.unwrap().base_url, "http://override:9000");
    }

    #[test]
    #[serial]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 3\nlist_limit = 250\nsearch_debounce_ms = 0").unwrap();

        let cfg = load_config_path(file.path()).unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(3));
        assert_eq!(cfg.list_limit, 250);
        assert_eq!(cfg.search_debounce(), Duration::ZERO);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_config_path("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
