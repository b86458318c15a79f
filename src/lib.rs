// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # WebAuth Bot
//!
//! Transparent single-sign-on login for HTTP sessions fronted by a
//! WebAuth gateway.
//!
//! ## Features
//!
//! - **Redirect Classification**: Spots responses that are really a detour
//!   to the login gateway, including 200 pages that only show a login link
//! - **Form Login**: Fetches the gateway's form and echoes its hidden fields
//!   back with the credentials
//! - **Session Wrapping**: Logs in and replays the original request, once per
//!   wrapper no matter how many requests race into the gateway
//! - **Token Exchange**: Turns a protected URL into one carrying a
//!   short-lived auth token
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use webauth_bot::{HttpSession, Result, WebAuthBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bot = WebAuthBot::new("peter", "anteater")?;
//!
//!     // Requests log in when the gateway asks for it
//!     let session = bot.build_session()?;
//!     let page = session.get("https://eee.uci.edu/myeee").await?;
//!     println!("{}", page.text());
//!
//!     // Or get a URL to hand to something else
//!     let url = bot.resolve("https://eee.uci.edu/myeee", session.inner().as_ref()).await?;
//!     println!("{url}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          WebAuthBot                           │
//! │   attach(session) → AuthSession     resolve(url) → token URL  │
//! └───────────────────────────────────────────────────────────────┘
//!                │                                  │
//! ┌──────────────┴──────────────┐   ┌───────────────┴─────────────┐
//! │         AuthSession         │   │        TokenExchange        │
//! │  trace → login once → replay│   │  trace → login → add token  │
//! └──────────────┬──────────────┘   └───────────────┬─────────────┘
//!                │                                  │
//! ┌──────────────┴────────┬─────────────────────────┴─────────────┐
//! │  RedirectClassifier   │         LoginFormSubmitter            │
//! │  (pure, per hop)      │  (form parse, POST, accept/reject)    │
//! └───────────────────────┴───────────────────────────────────────┘
//!                │
//! ┌──────────────┴────────────────────────────────────────────────┐
//! │            Transport: Session (reqwest + cookie jar)          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Request, response and redirect chain types
pub mod types;

/// Gateway and protected site configuration
pub mod config;

/// Login identity
pub mod credentials;

/// HTTP transport and cookie session
pub mod http;

/// Redirect classification
pub mod classify;

/// Login form parsing and submission
pub mod login;

/// Authenticating session wrapper
pub mod auth;

/// Manual token exchange
pub mod token;

/// Entry point facade
pub mod bot;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use auth::AuthSession;
pub use bot::WebAuthBot;
pub use classify::{AuthVerdict, LoginRequired, RedirectClassifier};
pub use config::{LoginFormConfig, ProtectedSite, WebAuthConfig};
pub use credentials::CredentialStore;
pub use http::{HttpSession, Session, SessionConfig, Transport};
pub use login::{LoginForm, LoginFormSubmitter, LoginOutcome};
pub use token::{AuthToken, TokenExchange};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
