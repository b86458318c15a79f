//! Manual token exchange
//!
//! For callers that want an authenticated URL rather than a wrapped
//! session: log in once and hand back the target with the gateway's
//! short-lived token in its query string.

mod exchange;

pub use exchange::{AuthToken, TokenExchange};
