//! Token exchange implementation

use crate::classify::{trace, AuthVerdict, RedirectClassifier};
use crate::config::WebAuthConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::login::LoginFormSubmitter;
use crate::types::HttpRequest;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Short-lived token issued by the gateway after a login
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Read the token from `param` in `url`'s query string
    pub fn from_url(url: &Url, param: &str) -> Option<Self> {
        url.query_pairs()
            .find(|(key, value)| key == param && !value.is_empty())
            .map(|(_, value)| Self(value.into_owned()))
    }

    /// The raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `target` with this token as its `param`, replacing any previous one
    pub fn apply_to(&self, target: &Url, param: &str) -> Url {
        let kept: Vec<(String, String)> = target
            .query_pairs()
            .filter(|(key, _)| key != param)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = target.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(param, &self.0);
        url
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Resolves a protected URL to an equivalent URL carrying an auth token
#[derive(Debug, Clone)]
pub struct TokenExchange {
    classifier: RedirectClassifier,
    submitter: LoginFormSubmitter,
    token_param: String,
}

impl TokenExchange {
    /// Create an exchange for the gateway described by `config`
    pub fn new(credentials: Arc<CredentialStore>, config: &WebAuthConfig) -> Result<Self> {
        Ok(Self {
            classifier: RedirectClassifier::new(config)?,
            submitter: LoginFormSubmitter::new(credentials, config)?,
            token_param: config.token_param.clone(),
        })
    }

    /// Log in for `target` through `session` and return `target` with a
    /// fresh token appended.
    ///
    /// Every call performs a login, so two calls yield two tokens. The
    /// gateway's cookies are left in `session`'s jar.
    pub async fn resolve<T: Transport + ?Sized>(&self, target: &Url, session: &T) -> Result<Url> {
        let target = self.unwrap_gateway(target);

        let probe = trace(session, &self.classifier, &HttpRequest::get(target.clone())).await?;
        let (login_url, return_url) = match probe.verdict {
            AuthVerdict::NeedsLogin(required) => (required.login_url, required.return_url),
            AuthVerdict::Authenticated | AuthVerdict::Indeterminate(_) => {
                debug!("{} served without login, requesting a token anyway", target);
                (self.classifier.login_url().clone(), target.clone())
            }
        };

        let outcome = self.submitter.submit(session, &login_url, &return_url).await?;
        let token = AuthToken::from_url(&outcome.continue_url, &self.token_param)
            .ok_or_else(|| Error::token_missing(outcome.continue_url.as_str()))?;

        info!("WebAuth issued a token for {}", target);
        Ok(token.apply_to(&target, &self.token_param))
    }

    /// A gateway URL stands for the resource it returns to
    fn unwrap_gateway(&self, target: &Url) -> Url {
        if self.classifier.is_login_url(target) {
            self.classifier.return_url_of(target, target)
        } else {
            target.clone()
        }
    }
}
