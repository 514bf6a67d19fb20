//! Service configuration read from the environment

use crate::router::{ContactInfo, IntentRouter};
use crate::runtime::EngineSettings;
use crate::state_machine::state::DEFAULT_REDIRECT_DELAY;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Remote dispatch endpoint; `None` sends every remote utterance down the apology path
    pub backend_url: Option<String>,
    pub backend_timeout: Duration,
    pub redirect_delay: Duration,
    pub catalog_path: String,
    pub company_name: String,
    pub contact: ContactInfo,
    pub speech_supported: bool,
    pub session_idle_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("CONCIERGE_PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "CONCIERGE_PORT",
                value,
                expected: "a port number",
            })?,
            None => 8000,
        };

        let backend_timeout = match get("CONCIERGE_BACKEND_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(parse_positive(
                "CONCIERGE_BACKEND_TIMEOUT_SECS",
                value,
            )?),
            None => Duration::from_secs(30),
        };

        let redirect_delay = match get("CONCIERGE_REDIRECT_DELAY_MS") {
            Some(value) => Duration::from_millis(parse_u64("CONCIERGE_REDIRECT_DELAY_MS", value)?),
            None => DEFAULT_REDIRECT_DELAY,
        };

        let session_idle_timeout = match get("CONCIERGE_SESSION_IDLE_SECS") {
            Some(value) => Duration::from_secs(parse_positive("CONCIERGE_SESSION_IDLE_SECS", value)?),
            None => Duration::from_secs(30 * 60),
        };

        let speech_supported = match get("CONCIERGE_SPEECH_SUPPORTED") {
            Some(value) => parse_bool("CONCIERGE_SPEECH_SUPPORTED", value)?,
            None => true,
        };

        Ok(Self {
            port,
            backend_url: get("CONCIERGE_BACKEND_URL"),
            backend_timeout,
            redirect_delay,
            catalog_path: get("CONCIERGE_CATALOG_PATH").unwrap_or_else(|| "/products".to_string()),
            company_name: get("CONCIERGE_COMPANY_NAME")
                .unwrap_or_else(|| "our company".to_string()),
            contact: ContactInfo {
                phone: get("CONCIERGE_CONTACT_PHONE")
                    .unwrap_or_else(|| "+1 (555) 010-0000".to_string()),
                email: get("CONCIERGE_CONTACT_EMAIL")
                    .unwrap_or_else(|| "support@example.com".to_string()),
                address: get("CONCIERGE_CONTACT_ADDRESS")
                    .unwrap_or_else(|| "123 Main Street".to_string()),
            },
            speech_supported,
            session_idle_timeout,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            company_name: self.company_name.clone(),
            router: IntentRouter::new(self.contact.clone(), self.catalog_path.clone()),
            redirect_delay: self.redirect_delay,
            speech_supported: self.speech_supported,
            session_idle_timeout: self.session_idle_timeout,
        }
    }
}

fn parse_u64(var: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value,
        expected: "a non-negative integer",
    })
}

fn parse_positive(var: &'static str, value: String) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            expected: "a positive integer",
        }),
    }
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            expected: "true or false",
        }),
    }
}
