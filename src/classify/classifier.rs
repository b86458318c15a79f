//! Classifier implementation

use crate::config::{parse_selector, ProtectedSite, WebAuthConfig};
use crate::error::{Error, Result};
use crate::types::{HttpResponse, ResponseChain};
use scraper::Html;
use url::Url;

/// Where to log in, and where to go afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequired {
    /// Gateway URL that asked for the login
    pub login_url: Url,
    /// Resource to return to once logged in
    pub return_url: Url,
}

/// Outcome of classifying the latest hop of a response chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthVerdict {
    /// The last response in the chain is the final answer. The response
    /// itself stays in the chain that was classified; `trace` returns it
    /// as `Traced::chain`'s last entry.
    Authenticated,
    /// The gateway wants credentials before serving the resource
    NeedsLogin(LoginRequired),
    /// The last response redirects somewhere that is not the gateway
    Indeterminate(Url),
}

/// Pure classifier for "must log in" versus "final answer"
#[derive(Debug, Clone)]
pub struct RedirectClassifier {
    login_url: Url,
    return_param: String,
    max_hops: usize,
    sites: Vec<ProtectedSite>,
}

impl RedirectClassifier {
    /// Build a classifier from a validated config
    pub fn new(config: &WebAuthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            login_url: config.login_url.clone(),
            return_param: config.return_param.clone(),
            max_hops: config.max_hops,
            sites: config.protected_sites.clone(),
        })
    }

    /// The configured gateway endpoint
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Maximum redirects followed for one request
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Whether `url` points into the login gateway: same origin as the
    /// endpoint and a path at or below the endpoint's path
    pub fn is_login_url(&self, url: &Url) -> bool {
        let gateway = &self.login_url;
        let same_host = match (url.host_str(), gateway.host_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        if url.scheme() != gateway.scheme()
            || !same_host
            || url.port_or_known_default() != gateway.port_or_known_default()
        {
            return false;
        }

        let base = gateway.path().trim_end_matches('/');
        let path = url.path();
        base.is_empty()
            || path == base
            || path
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// The resource a gateway URL will return to: its return parameter
    /// resolved against `origin`, or `origin` itself
    pub fn return_url_of(&self, login_url: &Url, origin: &Url) -> Url {
        login_url
            .query_pairs()
            .find(|(key, _)| key == self.return_param.as_str())
            .and_then(|(_, value)| origin.join(&value).ok())
            .unwrap_or_else(|| origin.clone())
    }

    fn login_required(&self, login_url: Url, origin: &Url) -> AuthVerdict {
        let return_url = self.return_url_of(&login_url, origin);
        AuthVerdict::NeedsLogin(LoginRequired {
            login_url,
            return_url,
        })
    }

    /// Classify the last hop of `chain`, produced by a request to `origin`.
    ///
    /// Fails with `RedirectLoopExceeded` when the chain already holds
    /// `max_hops + 1` responses and would need another hop.
    pub fn classify(&self, origin: &Url, chain: &ResponseChain) -> Result<AuthVerdict> {
        let response = chain.last();

        if let Some(next) = response.location()? {
            if self.is_login_url(&next) {
                return Ok(self.login_required(next, origin));
            }
            if chain.len() > self.max_hops {
                return Err(Error::RedirectLoopExceeded {
                    max_hops: self.max_hops,
                });
            }
            return Ok(AuthVerdict::Indeterminate(next));
        }

        if self.is_login_url(response.url()) {
            return Ok(self.login_required(response.url().clone(), origin));
        }

        if self.shows_login_page(origin, response)? {
            return Ok(AuthVerdict::NeedsLogin(LoginRequired {
                login_url: self.login_url.clone(),
                return_url: origin.clone(),
            }));
        }

        Ok(AuthVerdict::Authenticated)
    }

    /// Marker check for protected sites that answer 200 with an anonymous
    /// page instead of redirecting.
    ///
    /// A page served from a protected site is judged by both of its
    /// markers. A page from elsewhere, reached from a protected site, only
    /// counts as a login page when it carries that site's login marker.
    fn shows_login_page(&self, origin: &Url, response: &HttpResponse) -> Result<bool> {
        if !response.is_html() {
            return Ok(false);
        }
        let own_site = self.sites.iter().find(|site| site.matches(response.url()));
        let origin_site = self.sites.iter().find(|site| site.matches(origin));
        let (site, check_auth_marker) = match (own_site, origin_site) {
            (Some(site), _) => (site, true),
            (None, Some(site)) => (site, false),
            (None, None) => return Ok(false),
        };

        let document = Html::parse_document(&response.text());

        if let Some(marker) = &site.login_marker {
            let selector = parse_selector(marker)?;
            if document.select(&selector).next().is_some() {
                return Ok(true);
            }
        }
        match &site.auth_marker {
            Some(marker) if check_auth_marker => {
                let selector = parse_selector(marker)?;
                Ok(document.select(&selector).next().is_none())
            }
            _ => Ok(false),
        }
    }
}
