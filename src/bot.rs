//! One-stop entry point tying credentials and configuration together

use crate::auth::AuthSession;
use crate::config::WebAuthConfig;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::http::{Session, Transport};
use crate::token::TokenExchange;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Holds one identity and gateway configuration, and hands out wrapped
/// sessions and authenticated URLs for it.
///
/// ```rust,ignore
/// use webauth_bot::{HttpSession, WebAuthBot};
///
/// let bot = WebAuthBot::new("peter", "anteater")?;
/// let session = bot.build_session()?;
/// let page = session.get("https://eee.uci.edu/myeee").await?;
///
/// let url = bot.resolve("https://eee.uci.edu/myeee", session.inner().as_ref()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct WebAuthBot {
    credentials: Arc<CredentialStore>,
    config: Arc<WebAuthConfig>,
}

impl WebAuthBot {
    /// Use the default UCI gateway configuration
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        Self::with_config(identifier, secret, WebAuthConfig::default())
    }

    /// Use a custom gateway configuration
    pub fn with_config(
        identifier: impl Into<String>,
        secret: impl Into<String>,
        config: WebAuthConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            credentials: Arc::new(CredentialStore::new(identifier, secret)?),
            config: Arc::new(config),
        })
    }

    /// Wrap a caller-owned session so its requests log in as needed
    pub fn attach<S: Transport>(&self, session: Arc<S>) -> Result<AuthSession<S>> {
        AuthSession::new(session, Arc::clone(&self.credentials), &self.config)
    }

    /// A fresh cookie session, already wrapped
    pub fn build_session(&self) -> Result<AuthSession<Session>> {
        self.attach(Arc::new(Session::new()?))
    }

    /// `target` with a fresh auth token appended, logging in through
    /// `session`
    pub async fn resolve<T: Transport + ?Sized>(&self, target: &str, session: &T) -> Result<Url> {
        let target = Url::parse(target)?;
        debug!("Resolving token URL for {}", target);
        TokenExchange::new(Arc::clone(&self.credentials), &self.config)?
            .resolve(&target, session)
            .await
    }

    /// The identity this bot logs in as
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The gateway configuration
    pub fn config(&self) -> &WebAuthConfig {
        &self.config
    }
}
