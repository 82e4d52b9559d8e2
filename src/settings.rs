use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::api_connection::endpoints::{default_model, OPENROUTER_URL};

pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_APP_NAME: &str = "KitchenAI";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_MIN_REQUEST_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Upstream providers OpenRouter may route to; empty means no preference.
    pub provider_only: Vec<String>,
    pub site_url: String,
    pub app_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub min_request_delay: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// `None` leaves external calls unbounded.
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings from a dotenv-formatted file without touching the
    /// process environment. Keys absent from the file fall back to the
    /// environment.
    pub fn from_env_file(path: &Path) -> Result<Self, dotenv::Error> {
        let mut vars = HashMap::new();
        for item in dotenv::from_path_iter(path)? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Ok(Self::from_lookup(|key| {
            vars.get(key).cloned().or_else(|| std::env::var(key).ok())
        }))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let timeout_secs: u64 = parsed(&lookup, "AI_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);

        Settings {
            api_key: lookup(API_KEY_ENV_VAR).filter(|k| !k.trim().is_empty()),
            api_url: text("OPENROUTER_URL", OPENROUTER_URL),
            model: text("AI_MODEL", default_model()),
            provider_only: lookup("AI_PROVIDER_ONLY")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            site_url: text("SITE_URL", DEFAULT_SITE_URL),
            app_name: text("APP_NAME", DEFAULT_APP_NAME),
            temperature: parsed(&lookup, "AI_TEMPERATURE", DEFAULT_TEMPERATURE),
            max_tokens: parsed(&lookup, "AI_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            min_request_delay: Duration::from_millis(parsed(
                &lookup,
                "AI_MIN_REQUEST_DELAY_MS",
                DEFAULT_MIN_REQUEST_DELAY_MS,
            )),
            max_retries: parsed(&lookup, "AI_MAX_RETRIES", DEFAULT_MAX_RETRIES),
            initial_backoff: Duration::from_millis(parsed(
                &lookup,
                "AI_INITIAL_BACKOFF_MS",
                DEFAULT_INITIAL_BACKOFF_MS,
            )),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("provider_only", &self.provider_only)
            .field("site_url", &self.site_url)
            .field("app_name", &self.app_name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("min_request_delay", &self.min_request_delay)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "invalid setting, using default");
            default
        }),
    }
}
