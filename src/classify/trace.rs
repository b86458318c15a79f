//! Classifier-driven redirect walk

use super::classifier::{AuthVerdict, RedirectClassifier};
use crate::error::Result;
use crate::http::Transport;
use crate::types::{HttpRequest, ResponseChain};
use tracing::debug;

/// Result of walking a request's redirect chain
#[derive(Debug)]
pub struct Traced {
    /// Every response received, in order
    pub chain: ResponseChain,
    /// Verdict on the last response; never `Indeterminate`
    pub verdict: AuthVerdict,
}

/// Dispatch `request` and follow its redirects until the classifier
/// reaches a verdict.
///
/// Redirects into the login gateway are not followed. The hop limit is
/// enforced by the classifier, so at most `max_hops + 1` requests are made.
pub async fn trace<T: Transport + ?Sized>(
    transport: &T,
    classifier: &RedirectClassifier,
    request: &HttpRequest,
) -> Result<Traced> {
    let mut current = request.clone();
    let mut chain = ResponseChain::new(transport.execute(current.clone()).await?);

    loop {
        match classifier.classify(&request.url, &chain)? {
            AuthVerdict::Indeterminate(next) => {
                debug!(hop = chain.len(), "Following redirect to {}", next);
                current = current.redirected_to(chain.last().status(), next);
                chain.push(transport.execute(current.clone()).await?);
            }
            verdict => return Ok(Traced { chain, verdict }),
        }
    }
}
