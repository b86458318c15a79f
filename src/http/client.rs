//! Raw HTTP session backed by reqwest
//!
//! Provides the caller-owned session that:
//! - Keeps cookies in a shared jar across requests
//! - Performs single hops with redirects disabled at the client level
//! - Follows redirects itself, bounded by `max_redirects`

use super::transport::{follow_redirects, HttpSession, Transport};
use crate::error::Result;
use crate::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for a raw session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum redirects followed by `send`
    pub max_redirects: usize,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            default_headers: HashMap::new(),
            user_agent: format!("webauth-bot/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl SessionConfig {
    /// Create a new config builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for session config
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the redirect limit for `send`
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// A cookie-keeping HTTP session.
///
/// The session owns a `reqwest::Client` (connection pool included) and
/// shares its cookie jar through an `Arc`, so the jar can be inspected or
/// handed to another session.
pub struct Session {
    client: Client,
    cookies: Arc<Jar>,
    config: SessionConfig,
}

impl Session {
    /// Create a session with default configuration and an empty jar
    pub fn new() -> Result<Self> {
        Self::with_config(SessionConfig::default())
    }

    /// Create a session with custom configuration and an empty jar
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        Self::with_cookie_jar(config, Arc::new(Jar::default()))
    }

    /// Create a session around an existing cookie jar
    pub fn with_cookie_jar(config: SessionConfig, cookies: Arc<Jar>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(Policy::none())
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            cookies,
            config,
        })
    }

    /// The cookie jar
    pub fn cookies(&self) -> &Arc<Jar> {
        &self.cookies
    }

    /// The `Cookie` header this session would send to `url`
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.cookies
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// The session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for Session {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut req = self.client.request(request.method.clone(), request.url.clone());

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        req = req.headers(request.headers);
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!("{} {} -> {}", request.method, request.url, status.as_u16());
        Ok(HttpResponse::new(status, url, headers, body))
    }
}

#[async_trait]
impl HttpSession for Session {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let chain = follow_redirects(self, request, self.config.max_redirects).await?;
        Ok(chain.into_final())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
