//! Login form submission
//!
//! Fetches the WebAuth login page, reads its form contract (action URL,
//! hidden anti-forgery fields, identifier and secret field names) and
//! posts the credentials back through the caller's session so the
//! resulting cookies land in the caller's jar.
//!
//! The form is parsed fresh on every login: the gateway may rotate its
//! hidden values per request.

mod form;
mod submitter;

pub use form::LoginForm;
pub use submitter::{LoginFormSubmitter, LoginOutcome};

#[cfg(test)]
mod tests;
