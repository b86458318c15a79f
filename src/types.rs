//! Common types used throughout WebAuth Bot
//!
//! Requests and responses are owned, fully buffered values: a request
//! must survive being replayed after a login, and a response body must
//! be inspectable by the classifier before it is handed to the caller.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use reqwest::{Method, StatusCode};
use std::borrow::Cow;
use url::Url;

// ============================================================================
// Requests
// ============================================================================

/// An HTTP request that can be dispatched more than once
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute target URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a request with no headers and no body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Create a POST request
    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append query parameters to the URL
    #[must_use]
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        {
            let mut query = self.url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key.as_ref(), value.as_ref());
            }
        }
        self
    }

    /// Set an `application/x-www-form-urlencoded` body
    #[must_use]
    pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in pairs {
            serializer.append_pair(key.as_ref(), value.as_ref());
        }
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        self.body = Some(Bytes::from(serializer.finish()));
        self
    }

    /// Build the request that follows a redirect to `location`.
    ///
    /// 307 and 308 keep the method and body; every other redirect becomes
    /// a bodiless GET (HEAD stays HEAD).
    #[must_use]
    pub fn redirected_to(&self, status: StatusCode, location: Url) -> Self {
        if matches!(
            status,
            StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
        ) {
            return Self {
                url: location,
                ..self.clone()
            };
        }

        let method = if self.method == Method::HEAD {
            Method::HEAD
        } else {
            Method::GET
        };
        let mut headers = self.headers.clone();
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);

        Self {
            method,
            url: location,
            headers,
            body: None,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// A single, fully buffered HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    /// Create a response
    pub fn new(status: StatusCode, url: Url, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            url,
            headers,
            body: body.into(),
        }
    }

    /// Status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// URL this response was served from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Consume the response, returning its body
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body decoded as UTF-8 (lossy)
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Whether the status is one that carries a `Location` to follow
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
                | StatusCode::PERMANENT_REDIRECT
        )
    }

    /// Redirect target resolved against this response's URL.
    ///
    /// Returns `Ok(None)` for non-redirects and redirects without a
    /// `Location` header.
    pub fn location(&self) -> Result<Option<Url>> {
        if !self.is_redirect() {
            return Ok(None);
        }
        let Some(value) = self.headers.get(LOCATION) else {
            return Ok(None);
        };
        let value = value
            .to_str()
            .map_err(|_| Error::malformed_redirect("Location header is not valid UTF-8"))?;
        Ok(Some(self.url.join(value)?))
    }

    /// Whether the response declares an HTML body
    pub fn is_html(&self) -> bool {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                let v = v.trim_start().to_ascii_lowercase();
                v.starts_with("text/html") || v.starts_with("application/xhtml")
            })
            .unwrap_or(false)
    }
}

// ============================================================================
// Response Chains
// ============================================================================

/// The ordered single-hop responses produced by one logical request.
///
/// A chain is never empty; the last element is the most recent hop.
#[derive(Debug, Clone)]
pub struct ResponseChain {
    earlier: Vec<HttpResponse>,
    last: HttpResponse,
}

impl ResponseChain {
    /// Start a chain from its first response
    pub fn new(first: HttpResponse) -> Self {
        Self {
            earlier: Vec::new(),
            last: first,
        }
    }

    /// Append the next hop
    pub fn push(&mut self, response: HttpResponse) {
        let previous = std::mem::replace(&mut self.last, response);
        self.earlier.push(previous);
    }

    /// Number of responses (equal to the number of requests made)
    pub fn len(&self) -> usize {
        self.earlier.len() + 1
    }

    /// Always false; present for API symmetry
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The most recent response
    pub fn last(&self) -> &HttpResponse {
        &self.last
    }

    /// Iterate over responses in the order they were received
    pub fn iter(&self) -> impl Iterator<Item = &HttpResponse> {
        self.earlier.iter().chain(std::iter::once(&self.last))
    }

    /// Consume the chain, returning its final response
    pub fn into_final(self) -> HttpResponse {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn redirect(status: u16, from: &str, to: &str) -> HttpResponse {
        let mut headers = HeaderMap::new();
        headers.insert(LOCATION, HeaderValue::from_str(to).unwrap());
        HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            url(from),
            headers,
            Bytes::new(),
        )
    }

    #[test]
    fn test_form_body_is_urlencoded() {
        let req = HttpRequest::post(url("https://login.example.edu/webauth"))
            .form(&[("ucinetid", "peter"), ("password", "a b&c")]);

        assert_eq!(
            req.headers.get(CONTENT_TYPE).unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            req.body.as_deref(),
            Some(&b"ucinetid=peter&password=a+b%26c"[..])
        );
    }

    #[test]
    fn test_query_appends_pairs() {
        let req = HttpRequest::get(url("https://login.example.edu/webauth?a=1"))
            .query(&[("return_url", "https://eee.example.edu/myeee")]);
        assert_eq!(
            req.url.as_str(),
            "https://login.example.edu/webauth?a=1&return_url=https%3A%2F%2Feee.example.edu%2Fmyeee"
        );
    }

    #[test]
    fn test_redirect_downgrades_post_to_get() {
        let req = HttpRequest::post(url("https://login.example.edu/webauth")).form(&[("a", "b")]);
        let next = req.redirected_to(StatusCode::FOUND, url("https://eee.example.edu/"));

        assert_eq!(next.method, Method::GET);
        assert!(next.body.is_none());
        assert!(next.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_redirect_307_keeps_method_and_body() {
        let req = HttpRequest::post(url("https://login.example.edu/webauth")).form(&[("a", "b")]);
        let next = req.redirected_to(
            StatusCode::TEMPORARY_REDIRECT,
            url("https://login.example.edu/other"),
        );

        assert_eq!(next.method, Method::POST);
        assert_eq!(next.body, req.body);
        assert_eq!(next.url.path(), "/other");
    }

    #[test]
    fn test_location_resolves_relative() {
        let resp = redirect(302, "https://eee.example.edu/myeee", "/login?return_url=/myeee");
        assert_eq!(
            resp.location().unwrap().unwrap().as_str(),
            "https://eee.example.edu/login?return_url=/myeee"
        );
    }

    #[test]
    fn test_location_ignored_for_non_redirect() {
        let mut resp = redirect(200, "https://eee.example.edu/", "/elsewhere");
        assert!(resp.location().unwrap().is_none());

        resp = HttpResponse::new(
            StatusCode::FOUND,
            url("https://eee.example.edu/"),
            HeaderMap::new(),
            Bytes::new(),
        );
        assert!(resp.location().unwrap().is_none());
    }

    #[test]
    fn test_is_html() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        let resp = HttpResponse::new(StatusCode::OK, url("https://eee.example.edu/"), headers, "<p>");
        assert!(resp.is_html());

        let resp = HttpResponse::new(
            StatusCode::OK,
            url("https://eee.example.edu/"),
            HeaderMap::new(),
            "{}",
        );
        assert!(!resp.is_html());
    }

    #[test]
    fn test_chain_order() {
        let mut chain = ResponseChain::new(redirect(302, "https://a.example.edu/", "/b"));
        chain.push(redirect(302, "https://a.example.edu/b", "/c"));
        chain.push(redirect(200, "https://a.example.edu/c", "/"));

        assert_eq!(chain.len(), 3);
        let paths: Vec<_> = chain.iter().map(|r| r.url().path().to_string()).collect();
        assert_eq!(paths, vec!["/", "/b", "/c"]);
        assert_eq!(chain.into_final().url().path(), "/c");
    }
}
