use anyhow::{anyhow, Result};
use pointpay_net::{Config as NetConfig, DEFAULT_API_BASE_URL};
use pointpay_sdk::token::MAX_TTL_SECS;
use pointpay_sdk::{PaymentType, SessionConfig};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    pub poll_secs: u64,
    pub ttl_secs: u64,
}

impl CliConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SessionConfig::default();

        let api_url =
            lookup("POINTPAY_API_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_token = lookup("POINTPAY_API_TOKEN").filter(|t| !t.trim().is_empty());
        let timeout_secs = parse_secs(&lookup, "POINTPAY_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let poll_secs = parse_secs(&lookup, "POINTPAY_POLL_SECS", defaults.poll_interval_secs)?;
        let ttl_secs = parse_secs(&lookup, "POINTPAY_TTL_SECS", defaults.ttl_secs)?;
        if ttl_secs == 0 || ttl_secs > MAX_TTL_SECS {
            return Err(anyhow!(
                "POINTPAY_TTL_SECS must be between 1 and {}, got {}",
                MAX_TTL_SECS,
                ttl_secs
            ));
        }

        Ok(Self {
            api_url,
            api_token,
            timeout_secs,
            poll_secs,
            ttl_secs,
        })
    }

    /// Applies command line overrides on top of the environment.
    pub fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if token.is_some() {
            self.api_token = token;
        }
        self
    }

    pub fn net_config(&self) -> NetConfig {
        let config = NetConfig::default()
            .with_base_url(&self.api_url)
            .with_timeout(self.timeout_secs);
        match &self.api_token {
            Some(token) => config.with_bearer_token(token),
            None => config,
        }
    }

    pub fn session_config(&self, payment_type: PaymentType) -> SessionConfig {
        SessionConfig::default()
            .with_ttl(self.ttl_secs)
            .with_poll_interval(self.poll_secs)
            .with_payment_type(payment_type)
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}
