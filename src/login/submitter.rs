//! Login exchange against the gateway

use super::form::LoginForm;
use crate::classify::RedirectClassifier;
use crate::config::{parse_selector, LoginFormConfig, WebAuthConfig};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::types::{HttpRequest, HttpResponse, ResponseChain};
use regex::Regex;
use reqwest::StatusCode;
use scraper::Html;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use url::Url;

/// `content` of a refresh `<meta>`: `0;url=https://...`
static META_REFRESH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*\d+\s*;\s*url\s*=\s*['"]?([^'"]+?)['"]?\s*$"#)
        .expect("meta refresh pattern is valid")
});

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Responses received after the credentials were accepted
    pub chain: ResponseChain,
    /// Where the gateway sends the browser next; may carry an auth token
    pub continue_url: Url,
}

/// What the gateway served when asked for its login page
enum LoginPage {
    Form(HttpResponse),
    /// The gateway redirected out of itself: a gateway session already exists
    AlreadyAuthenticated(ResponseChain, Url),
}

/// Drives one login exchange: fetch form, post credentials, read verdict
#[derive(Debug, Clone)]
pub struct LoginFormSubmitter {
    credentials: Arc<CredentialStore>,
    classifier: RedirectClassifier,
    return_param: String,
    form: LoginFormConfig,
}

impl LoginFormSubmitter {
    /// Create a submitter for the gateway described by `config`
    pub fn new(credentials: Arc<CredentialStore>, config: &WebAuthConfig) -> Result<Self> {
        Ok(Self {
            credentials,
            classifier: RedirectClassifier::new(config)?,
            return_param: config.return_param.clone(),
            form: config.form.clone(),
        })
    }

    /// The login page URL for `return_url`: `login_url` with its return
    /// parameter replaced
    pub fn login_page_url(&self, login_url: &Url, return_url: &Url) -> Url {
        let kept: Vec<(String, String)> = login_url
            .query_pairs()
            .filter(|(key, _)| key != self.return_param.as_str())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = login_url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(&self.return_param, return_url.as_str());
        url
    }

    /// Log in through `transport` and return where to continue.
    ///
    /// Cookies set by the gateway accumulate in the transport's jar.
    pub async fn submit<T: Transport + ?Sized>(
        &self,
        transport: &T,
        login_url: &Url,
        return_url: &Url,
    ) -> Result<LoginOutcome> {
        let page_url = self.login_page_url(login_url, return_url);
        info!(
            "Logging in to WebAuth as {} for {}",
            self.credentials.identifier(),
            return_url
        );

        let page = match self.fetch_login_page(transport, page_url).await? {
            LoginPage::Form(page) => page,
            LoginPage::AlreadyAuthenticated(chain, continue_url) => {
                info!("WebAuth session already active, continuing to {}", continue_url);
                return Ok(LoginOutcome {
                    chain,
                    continue_url,
                });
            }
        };
        if !page.status().is_success() {
            return Err(Error::UnexpectedLoginResponse {
                status: page.status().as_u16(),
            });
        }

        let form = LoginForm::parse(&page.text(), page.url(), &self.form)?;
        debug!(
            action = %form.action,
            hidden_fields = form.hidden_fields.len(),
            "Parsed login form"
        );

        let request = HttpRequest::post(form.action.clone()).form(&form.payload(&self.credentials));
        let response = transport.execute(request).await?;
        let continue_url = self.evaluate(&response)?;

        info!("WebAuth accepted credentials, continuing to {}", continue_url);
        Ok(LoginOutcome {
            chain: ResponseChain::new(response),
            continue_url,
        })
    }

    /// GET the login page, following redirects that stay on the gateway
    async fn fetch_login_page<T: Transport + ?Sized>(
        &self,
        transport: &T,
        page_url: Url,
    ) -> Result<LoginPage> {
        let mut request = HttpRequest::get(page_url);
        let mut chain = ResponseChain::new(transport.execute(request.clone()).await?);

        loop {
            let Some(next) = chain.last().location()? else {
                return Ok(LoginPage::Form(chain.into_final()));
            };
            if !self.classifier.is_login_url(&next) {
                return Ok(LoginPage::AlreadyAuthenticated(chain, next));
            }
            if chain.len() > self.classifier.max_hops() {
                return Err(Error::RedirectLoopExceeded {
                    max_hops: self.classifier.max_hops(),
                });
            }
            request = request.redirected_to(chain.last().status(), next);
            chain.push(transport.execute(request.clone()).await?);
        }
    }

    /// Decide whether the gateway accepted the credentials
    fn evaluate(&self, response: &HttpResponse) -> Result<Url> {
        if let Some(next) = response.location()? {
            if self.classifier.is_login_url(&next) {
                warn!("WebAuth redirected back to its login page");
                return Err(Error::InvalidCredentials);
            }
            return Ok(next);
        }

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!("WebAuth rejected login with status {}", status.as_u16());
            return Err(Error::InvalidCredentials);
        }

        let document = Html::parse_document(&response.text());

        if let Some(next) = meta_refresh(&document, response.url())? {
            if self.classifier.is_login_url(&next) {
                warn!("WebAuth refreshed back to its login page");
                return Err(Error::InvalidCredentials);
            }
            return Ok(next);
        }

        let rejected = match &self.form.failure_marker {
            Some(marker) => document.select(&parse_selector(marker)?).next().is_some(),
            None => false,
        };
        if rejected || LoginForm::from_document(&document, response.url(), &self.form).is_ok() {
            warn!("WebAuth served the login form again");
            return Err(Error::InvalidCredentials);
        }

        Err(Error::UnexpectedLoginResponse {
            status: status.as_u16(),
        })
    }
}

/// Target of a `<meta http-equiv="refresh">`, if the page has one
fn meta_refresh(document: &Html, base: &Url) -> Result<Option<Url>> {
    let selector = parse_selector("meta[http-equiv]")?;
    let Some(meta) = document.select(&selector).find(|meta| {
        meta.value()
            .attr("http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
    }) else {
        return Ok(None);
    };

    let content = meta
        .value()
        .attr("content")
        .ok_or_else(|| Error::malformed_redirect("refresh <meta> has no content"))?;
    let captures = META_REFRESH
        .captures(content)
        .ok_or_else(|| Error::malformed_redirect(format!("unrecognised refresh content: {content}")))?;

    Ok(Some(base.join(captures[1].trim())?))
}
