//! Redirect classification
//!
//! Decides, hop by hop, whether a response is the final answer, a
//! redirect to keep following, or a demand to log in. The classifier
//! itself never touches the network; `trace` drives the hops and asks
//! the classifier after each one.

mod classifier;
mod trace;

pub use classifier::{AuthVerdict, LoginRequired, RedirectClassifier};
pub use trace::{trace, Traced};
