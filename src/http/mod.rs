//! HTTP session module
//!
//! Defines the capability the rest of the crate needs from an HTTP
//! client and provides the default, caller-owned implementation.
//!
//! # Features
//!
//! - **Single-hop transport**: `Transport` performs exactly one exchange and
//!   never follows redirects, so redirect chains can be inspected hop by hop
//! - **Request verbs**: `HttpSession` exposes `get`/`post_form`/... on top of
//!   one `send` method; raw and authenticating sessions share it
//! - **Cookie jar**: `Session` keeps cookies in a `reqwest` jar shared with
//!   whoever created it

mod client;
mod transport;

pub use client::{Session, SessionConfig, SessionConfigBuilder};
pub use transport::{follow_redirects, HttpSession, Transport};
