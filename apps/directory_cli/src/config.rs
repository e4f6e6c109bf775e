use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use client_core::{DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
use serde::Deserialize;
use url::Url;

pub const CONFIG_FILE: &str = "directory.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the optional TOML file, then environment overrides.
/// Unreadable or malformed values are skipped.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.base_url {
                    settings.base_url = v;
                }
                if let Some(v) = file_cfg.request_timeout_secs.and_then(nonzero_timeout) {
                    settings.request_timeout_secs = v;
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), "ignoring malformed config file: {err}");
            }
        }
    }

    if let Some(v) = env("COMPANY_API_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Some(parsed) = v.parse::<u64>().ok().and_then(nonzero_timeout) {
            settings.request_timeout_secs = parsed;
        }
    }

    settings
}

/// A zero timeout would fail every request, so it is treated as unset.
fn nonzero_timeout(secs: u64) -> Option<u64> {
    if secs == 0 {
        tracing::warn!("ignoring zero request timeout");
        return None;
    }
    Some(secs)
}

/// Trims the URL, strips trailing slashes and rejects anything that is not
/// an absolute http(s) URL.
pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(DEFAULT_BASE_URL.to_string());
    }

    let parsed = Url::parse(trimmed).with_context(|| format!("invalid base url '{trimmed}'"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => bail!("unsupported base url scheme '{other}' in '{trimmed}'"),
    }
    if parsed.host_str().is_none() {
        bail!("base url '{trimmed}' has no host");
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
