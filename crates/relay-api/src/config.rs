//! HTTP server configuration.

use std::time::Instant;

pub const HOST_ENV: &str = "RELAY_HOST";
pub const PORT_ENV: &str = "RELAY_PORT";
pub const CORS_ORIGINS_ENV: &str = "RELAY_CORS_ORIGINS";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Allowed storefront origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl ApiConfig {
    /// Creates a new API configuration with the given host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            cors_origins: vec!["*".to_string()],
            start_time: Instant::now(),
        }
    }

    /// Sets the CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Sets the CORS origins from a comma-separated list.
    pub fn with_cors_list(self, raw: &str) -> Self {
        self.with_cors_origins(parse_origins(raw))
    }

    /// Whether every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }

    /// Returns the bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_cors_list() {
        let config = ApiConfig::default()
            .with_cors_list(" https://shop.example/ , ,https://admin.example");
        assert_eq!(
            config.cors_origins,
            vec!["https://shop.example", "https://admin.example"]
        );
        assert!(!config.allows_any_origin());

        let config = ApiConfig::default().with_cors_list("https://shop.example,*");
        assert!(config.allows_any_origin());
    }

    #[test]
    fn test_empty_cors_list_allows_any() {
        let config = ApiConfig::default().with_cors_list("");
        assert!(config.allows_any_origin());
    }
}
