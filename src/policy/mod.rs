//! Call policies composed around every upstream boundary call
//!
//! `RateLimiter` bounds how many calls a client may start per window;
//! `RetryPolicy` re-runs transient failures with exponential backoff.
//! Both are plain values owned by each client, so they can be exercised
//! without any network or business logic.

mod rate_limit;
mod retry;

pub use rate_limit::RateLimiter;
pub use retry::{RetryError, RetryPolicy, Transient};
