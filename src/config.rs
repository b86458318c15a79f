//! Configuration for the WebAuth gateway and the sites it protects
//!
//! The defaults describe the UCI deployment. Other deployments can be
//! described in YAML or JSON:
//!
//! ```yaml
//! login_url: https://login.example.edu/webauth
//! token_param: auth_token
//! max_hops: 5
//! form:
//!   username_field: netid
//!   failure_marker: div.error
//! protected_sites:
//!   - host: portal.example.edu
//!     auth_marker: a.logout
//!     login_marker: a#login
//! ```

use crate::error::{Error, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// WebAuth endpoint used when none is configured
pub const DEFAULT_LOGIN_URL: &str = "https://login.uci.edu/ucinetid/webauth";

/// Default maximum number of redirects followed for one request
pub const DEFAULT_MAX_HOPS: usize = 5;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Gateway and interception configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebAuthConfig {
    /// The WebAuth login endpoint. Any URL at or below this path on the
    /// same origin is treated as the login gateway.
    #[serde(default = "default_login_url")]
    pub login_url: Url,

    /// Query parameter carrying the URL to return to after login
    #[serde(default = "default_return_param")]
    pub return_param: String,

    /// Query parameter carrying the auth token on the post-login redirect
    #[serde(default = "default_token_param")]
    pub token_param: String,

    /// Maximum redirects followed before giving up
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,

    /// Login form field overrides
    #[serde(default)]
    pub form: LoginFormConfig,

    /// Sites whose pages may answer 200 with an anonymous page instead of
    /// redirecting to the gateway
    #[serde(default = "default_protected_sites")]
    pub protected_sites: Vec<ProtectedSite>,
}

fn default_login_url() -> Url {
    Url::parse(DEFAULT_LOGIN_URL).expect("default login URL is valid")
}

fn default_return_param() -> String {
    "return_url".to_string()
}

fn default_token_param() -> String {
    "ucinetid_auth".to_string()
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

fn default_protected_sites() -> Vec<ProtectedSite> {
    vec![
        ProtectedSite::new("eee.uci.edu")
            .with_auth_marker("a.logoutlink")
            .with_login_marker("a.loglink"),
        ProtectedSite::new("www.reg.uci.edu")
            .with_auth_marker("span.logout")
            .with_login_marker("a#webauth"),
    ]
}

impl Default for WebAuthConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            return_param: default_return_param(),
            token_param: default_token_param(),
            max_hops: default_max_hops(),
            form: LoginFormConfig::default(),
            protected_sites: default_protected_sites(),
        }
    }
}

impl WebAuthConfig {
    /// Config for a gateway at `login_url` with no protected sites
    pub fn for_gateway(login_url: Url) -> Self {
        Self {
            login_url,
            protected_sites: Vec::new(),
            ..Self::default()
        }
    }

    /// Parse and validate a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` files are parsed as JSON, anything
    /// else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Set the maximum redirect hops
    #[must_use]
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Add a protected site
    #[must_use]
    pub fn protect(mut self, site: ProtectedSite) -> Self {
        self.protected_sites.push(site);
        self
    }

    /// Check the config for values that would make authentication
    /// impossible
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(Error::config("max_hops must be at least 1"));
        }
        if self.return_param.is_empty() {
            return Err(Error::config("return_param must not be empty"));
        }
        if self.token_param.is_empty() {
            return Err(Error::config("token_param must not be empty"));
        }
        if !matches!(self.login_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "login_url must be http(s): {}",
                self.login_url
            )));
        }

        if let Some(marker) = &self.form.failure_marker {
            parse_selector(marker)?;
        }
        for site in &self.protected_sites {
            if site.host.is_empty() {
                return Err(Error::config("protected site host must not be empty"));
            }
            for marker in [&site.auth_marker, &site.login_marker].into_iter().flatten() {
                parse_selector(marker)?;
            }
        }
        Ok(())
    }
}

/// Parse a CSS selector, mapping failures to a config error
pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::config(format!("Invalid CSS selector '{selector}': {e:?}")))
}

// ============================================================================
// Login Form
// ============================================================================

/// Overrides for the login form's field names.
///
/// When a name is absent the field is detected from the input types on
/// the login page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginFormConfig {
    /// Name of the identifier input
    #[serde(default)]
    pub username_field: Option<String>,

    /// Name of the secret input
    #[serde(default)]
    pub password_field: Option<String>,

    /// Selector for an explicit rejection message after submitting
    #[serde(default)]
    pub failure_marker: Option<String>,
}

// ============================================================================
// Protected Sites
// ============================================================================

/// A site behind the gateway whose pages can be checked for login markers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedSite {
    /// Host name, compared case-insensitively
    pub host: String,

    /// Only paths starting with this prefix are checked
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Selector present only on pages served to a logged-in user
    #[serde(default)]
    pub auth_marker: Option<String>,

    /// Selector present only on pages served to an anonymous user
    #[serde(default)]
    pub login_marker: Option<String>,
}

impl ProtectedSite {
    /// A protected host with no markers
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            path_prefix: None,
            auth_marker: None,
            login_marker: None,
        }
    }

    /// Restrict to a path prefix
    #[must_use]
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Set the authenticated-page marker
    #[must_use]
    pub fn with_auth_marker(mut self, selector: impl Into<String>) -> Self {
        self.auth_marker = Some(selector.into());
        self
    }

    /// Set the anonymous-page marker
    #[must_use]
    pub fn with_login_marker(mut self, selector: impl Into<String>) -> Self {
        self.login_marker = Some(selector.into());
        self
    }

    /// Whether `url` belongs to this site
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if !host.eq_ignore_ascii_case(&self.host) {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
