//! HTTP client utilities.

use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Duration;

/// Default User-Agent sent to remote services
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with sensible defaults.
///
/// No overall request timeout is configured on the client: every call sets
/// its own timeout from the remaining extraction budget.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with a custom user agent
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Start a GET request bounded by `timeout`
    pub fn get(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.client.get(url).timeout(timeout)
    }

    /// Start a POST request bounded by `timeout`
    pub fn post(&self, url: &str, timeout: Duration) -> RequestBuilder {
        self.client.post(url).timeout(timeout)
    }
}

/// Build a polite User-Agent carrying a contact address, as public registries request
pub fn polite_user_agent(mailto: Option<&str>) -> String {
    match mailto.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mailto) => format!("{} (mailto:{})", DEFAULT_USER_AGENT, mailto),
        None => DEFAULT_USER_AGENT.to_string(),
    }
}

/// Join a base URL and a path without doubling the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://localhost:8070/", "/api/isalive"),
            "http://localhost:8070/api/isalive"
        );
        assert_eq!(join_url("http://host", "parse"), "http://host/parse");
    }

    #[test]
    fn test_polite_user_agent() {
        assert_eq!(polite_user_agent(None), DEFAULT_USER_AGENT);
        assert_eq!(polite_user_agent(Some("  ")), DEFAULT_USER_AGENT);
        let agent = polite_user_agent(Some("lab@example.org"));
        assert!(agent.ends_with("(mailto:lab@example.org)"));
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::new().is_ok());
    }
}
