//! Session configuration from environment variables

use std::str::FromStr;
use std::time::Duration;

use taskdesk_core::ingest::{IngestConfig, DEFAULT_INGEST_LIMIT, DEFAULT_TODOS_URL};

pub const TODOS_URL_VAR: &str = "TASKDESK_TODOS_URL";
pub const INGEST_LIMIT_VAR: &str = "TASKDESK_INGEST_LIMIT";
pub const SEARCH_DEBOUNCE_VAR: &str = "TASKDESK_SEARCH_DEBOUNCE_MS";
pub const SKIP_INGEST_VAR: &str = "TASKDESK_SKIP_INGEST";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ingest: IngestConfig,
    /// Zero applies search input immediately
    pub search_debounce: Duration,
    pub skip_ingest: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            search_debounce: Duration::ZERO,
            skip_ingest: false,
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset or invalid values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let url = lookup(TODOS_URL_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_TODOS_URL.to_string());
        let limit = parse_var(&lookup, INGEST_LIMIT_VAR)
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_INGEST_LIMIT);
        let debounce_ms = parse_var(&lookup, SEARCH_DEBOUNCE_VAR).unwrap_or(0);

        Self {
            ingest: IngestConfig { url, limit },
            search_debounce: Duration::from_millis(debounce_ms),
            skip_ingest: flag_var(&lookup, SKIP_INGEST_VAR, false),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|raw| raw.trim().parse().ok())
}

fn flag_var(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}
