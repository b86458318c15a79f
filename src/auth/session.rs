//! AuthSession implementation
//!
//! Handles login interception, single-flight re-authentication and replay.

use crate::classify::{trace, AuthVerdict, LoginRequired, RedirectClassifier};
use crate::config::WebAuthConfig;
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::http::{HttpSession, Transport};
use crate::login::{LoginFormSubmitter, LoginOutcome};
use crate::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Serializes logins for one wrapper.
///
/// `generation` counts finished login attempts, whatever their outcome,
/// and is only written while `lock` is held. A request records the
/// generation before dispatching; if it has moved by the time the request
/// gets the lock, some other request already ran the login this one would
/// have run. The lock guards the failure of the latest attempt.
#[derive(Debug, Default)]
struct LoginGate {
    lock: Mutex<Option<Error>>,
    generation: AtomicU64,
}

/// A session that logs in to WebAuth whenever a request needs it
pub struct AuthSession<S> {
    inner: Arc<S>,
    classifier: RedirectClassifier,
    submitter: LoginFormSubmitter,
    gate: LoginGate,
}

impl<S: Transport> AuthSession<S> {
    /// Wrap `inner`, logging in with `credentials` as described by `config`
    pub fn new(
        inner: Arc<S>,
        credentials: Arc<CredentialStore>,
        config: &WebAuthConfig,
    ) -> Result<Self> {
        Ok(Self {
            inner,
            classifier: RedirectClassifier::new(config)?,
            submitter: LoginFormSubmitter::new(credentials, config)?,
            gate: LoginGate::default(),
        })
    }

    /// The wrapped session. Requests sent through it bypass interception.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Number of login attempts that finished through this wrapper,
    /// successful or not
    pub fn login_attempts(&self) -> u64 {
        self.gate.generation.load(Ordering::Acquire)
    }

    /// Run the login unless another request finished one since
    /// `observed`. Returns `None` when the login was skipped.
    async fn login_once(
        &self,
        observed: u64,
        required: &LoginRequired,
    ) -> Result<Option<LoginOutcome>> {
        let mut last_failure = self.gate.lock.lock().await;

        if self.gate.generation.load(Ordering::Acquire) != observed {
            if let Some(err) = last_failure.as_ref() {
                debug!("Concurrent login failed, not posting again: {}", err);
                return Err(err.for_waiter());
            }
            debug!("Concurrent login already completed, replaying");
            return Ok(None);
        }

        let result = self
            .submitter
            .submit(self.inner.as_ref(), &required.login_url, &required.return_url)
            .await;
        self.gate.generation.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(outcome) => {
                *last_failure = None;
                Ok(Some(outcome))
            }
            Err(err) => {
                *last_failure = Some(err.for_waiter());
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<S: Transport> HttpSession for AuthSession<S> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let observed = self.gate.generation.load(Ordering::Acquire);

        let traced = trace(self.inner.as_ref(), &self.classifier, &request).await?;
        let required = match traced.verdict {
            AuthVerdict::NeedsLogin(required) => required,
            AuthVerdict::Authenticated | AuthVerdict::Indeterminate(_) => {
                return Ok(traced.chain.into_final());
            }
        };

        info!("{} {} needs a WebAuth login", request.method, request.url);
        let outcome = self.login_once(observed, &required).await?;

        // A request aimed at the gateway itself continues where the login
        // pointed, not back at the gateway.
        let replay = if self.classifier.is_login_url(&request.url) {
            let target = outcome.map_or(required.return_url, |outcome| outcome.continue_url);
            HttpRequest::get(target)
        } else {
            request
        };

        let traced = trace(self.inner.as_ref(), &self.classifier, &replay).await?;
        match traced.verdict {
            AuthVerdict::NeedsLogin(_) => {
                warn!("{} still requires a login after logging in", replay.url);
                Err(Error::reauthentication_failed(replay.url.as_str()))
            }
            AuthVerdict::Authenticated | AuthVerdict::Indeterminate(_) => {
                Ok(traced.chain.into_final())
            }
        }
    }
}

impl<S> std::fmt::Debug for AuthSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("classifier", &self.classifier)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
