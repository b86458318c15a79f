//! Transport capability traits
//!
//! `Transport` is the minimal seam to the underlying HTTP client: send a
//! request, get back status, headers and body. Cookies live inside the
//! implementation. `HttpSession` is what callers talk to.

use crate::error::{Error, Result};
use crate::types::{HttpRequest, HttpResponse, ResponseChain};
use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use url::Url;

/// One HTTP exchange. Implementations must not follow redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch `request` and return the response it produced
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// A session that resolves requests to their final response.
///
/// Only `send` is required; the verb methods are shared by every
/// implementation, which is how a wrapped session offers the same
/// capabilities as the session it wraps.
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// Dispatch `request` and return its final response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Make a request with the given method and no body
    async fn request(&self, method: Method, url: &str) -> Result<HttpResponse> {
        let url = Url::parse(url)?;
        self.send(HttpRequest::new(method, url)).await
    }

    /// Make a GET request
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::GET, url).await
    }

    /// Make a HEAD request
    async fn head(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::HEAD, url).await
    }

    /// Make a DELETE request
    async fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.request(Method::DELETE, url).await
    }

    /// Make a POST request with a urlencoded form body
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let url = Url::parse(url)?;
        self.send(HttpRequest::post(url).form(form)).await
    }
}

/// Dispatch `request`, following redirects until a non-redirect response.
///
/// At most `max_hops` redirects are followed, so no more than
/// `max_hops + 1` requests are made; a longer chain fails with
/// `RedirectLoopExceeded`.
pub async fn follow_redirects<T: Transport + ?Sized>(
    transport: &T,
    request: HttpRequest,
    max_hops: usize,
) -> Result<ResponseChain> {
    let mut current = request;
    let mut chain = ResponseChain::new(transport.execute(current.clone()).await?);

    loop {
        let Some(next) = chain.last().location()? else {
            return Ok(chain);
        };
        if chain.len() > max_hops {
            return Err(Error::RedirectLoopExceeded { max_hops });
        }

        debug!("Following {} redirect to {}", chain.last().status(), next);
        current = current.redirected_to(chain.last().status(), next);
        chain.push(transport.execute(current.clone()).await?);
    }
}
