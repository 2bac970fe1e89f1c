//! Runtime configuration: environment (`.env`) plus the sources file.
//!
//! Precedence for HTTP settings is CLI flag, then environment, then default.

use std::path::Path;
use std::time::Duration;

use crate::error::AppError;
use crate::sources::SourceConfig;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("rate-harvest/", env!("CARGO_PKG_VERSION"));

const ENV_USER_AGENT: &str = "RATES_USER_AGENT";
const ENV_TIMEOUT: &str = "RATES_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpConfig {
    /// Read `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();
        if let Some(agent) = lookup(ENV_USER_AGENT).filter(|v| !v.trim().is_empty()) {
            config.user_agent = agent;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| AppError::new(2, format!("{ENV_TIMEOUT} must be a positive integer, got '{raw}'.")))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_overrides(mut self, timeout_secs: Option<u64>, user_agent: Option<String>) -> Result<Self, AppError> {
        if let Some(secs) = timeout_secs {
            if secs == 0 {
                return Err(AppError::new(2, "--timeout-secs must be positive."));
            }
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = user_agent {
            self.user_agent = agent;
        }
        Ok(self)
    }
}

/// Load and validate the sources file.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read sources file '{}': {e}", path.display())))?;
    parse_sources(&text).map_err(|e| AppError::new(2, format!("Invalid sources file '{}': {e}", path.display())))
}

fn parse_sources(text: &str) -> Result<Vec<SourceConfig>, String> {
    let sources: Vec<SourceConfig> = serde_json::from_str(text).map_err(|e| e.to_string())?;
    for source in &sources {
        source.validate()?;
    }
    let mut banks: Vec<&str> = sources.iter().map(|s| s.bank.as_str()).collect();
    banks.sort_unstable();
    if let Some(dup) = banks.windows(2).find(|w| w[0] == w[1]) {
        return Err(format!("bank '{}' configured twice", dup[0]));
    }
    Ok(sources)
}
