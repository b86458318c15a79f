//! Authenticating session wrapper
//!
//! `AuthSession` wraps a caller-owned transport and makes every request
//! behave as if the caller were already logged in to WebAuth: a login
//! redirect is intercepted, the login is driven once, and the original
//! request is replayed with the refreshed cookies.
//!
//! Concurrent requests that hit the login redirect together share a
//! single login; the rest wait for it and then replay.

mod session;

pub use session::AuthSession;
