//! Paystack client configuration.

use std::time::Duration;

/// Paystack API client configuration.
///
/// The secret key is the `sk_test_...` / `sk_live_...` value from the
/// Paystack dashboard and is sent as a bearer token on every request.
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    /// Secret API key, sent as `Authorization: Bearer <key>`
    pub secret_key: String,

    /// API base URL.
    ///
    /// Default: `https://api.paystack.co`
    pub base_url: String,

    /// Per-request timeout.
    ///
    /// Default: 10 seconds
    pub timeout: Duration,
}

impl PaystackConfig {
    /// Create a configuration for the given secret key.
    #[must_use]
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            base_url: "https://api.paystack.co".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Override the API base URL (for test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PaystackConfig::new("sk_test_abc".to_string());
        assert_eq!(config.base_url, "https://api.paystack.co");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = PaystackConfig::new("sk_test_abc".to_string())
            .with_base_url("http://localhost:8089".to_string())
            .with_timeout(Duration::from_secs(2));

        assert_eq!(config.base_url, "http://localhost:8089");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }
}
