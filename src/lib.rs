//! `refetch` is a resilient outbound-call layer for request-routing backends:
//! bounded automatic HTTP retry plus a three-level, append-only record of
//! everything that happened, so logging and alerting collaborators can
//! reconstruct the full causal chain after the fact.
//!
//! The three levels are: one [`RequestContext`] per inbound request, one
//! [`SubRequestContext`] per outbound call it makes, and one
//! [`RetryAttemptContext`] per retry attempt within a call. Each context is a
//! mutable accumulator that freezes into an immutable snapshot via
//! `snapshot()` once its level completes.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use refetch::prelude::{FetchClient, RetryPolicy};
//! use refetch::{StoredRequest, SubRequestContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FetchClient::builder()
//!         .client_name("billing-router")
//!         .retry_policy(
//!             RetryPolicy::standard()
//!                 .max_attempts(3)
//!                 .base_backoff(Duration::from_millis(250)),
//!         )
//!         .try_build()?;
//!
//!     let request = StoredRequest::get("https://api.example.com/v1/charges")?;
//!     let mut call = SubRequestContext::new("acct-42", "req-0001", request.clone());
//!     let response = client.execute(request, Some(&mut call)).await?;
//!
//!     println!(
//!         "status={} retries={}",
//!         response.status(),
//!         call.retries().len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Recommended Defaults
//!
//! - Use `RetryPolicy::standard()` (3 attempts, 1 s linear base backoff).
//! - Give every outbound call its own `SubRequestContext`; the engine records
//!   each attempt into it as it happens.
//! - Finalize the top-level context with [`dispatch_request`] after the
//!   response has been sent.

mod body;
mod client;
mod context;
mod error;
mod id;
mod observe;
mod request;
mod response;
mod retry;
mod retry_attempt;
mod sub_request;
mod transport;
mod util;

pub use crate::client::{FetchClient, FetchClientBuilder};
pub use crate::context::{RequestContext, RequestSnapshot};
pub use crate::error::{CapturedError, FetchError, FetchErrorCode, TransportErrorKind};
pub use crate::id::IdGenerator;
pub use crate::observe::{AlertLogger, Logger, NoopLogger, TracingLogger, dispatch_request};
pub use crate::request::StoredRequest;
pub use crate::response::HttpResponse;
pub use crate::retry::RetryPolicy;
pub use crate::retry_attempt::{RetryAttemptContext, RetryAttemptSnapshot};
pub use crate::sub_request::{SubRequestContext, SubRequestSnapshot};
pub use crate::transport::{HyperTransport, Transport, TransportError};

pub type RefetchResult<T> = std::result::Result<T, FetchError>;

pub mod prelude {
    pub use crate::{
        AlertLogger, CapturedError, FetchClient, FetchError, FetchErrorCode, HttpResponse,
        IdGenerator, Logger, NoopLogger, RefetchResult, RequestContext, RequestSnapshot,
        RetryAttemptSnapshot, RetryPolicy, StoredRequest, SubRequestContext, SubRequestSnapshot,
        TracingLogger, Transport, TransportError, TransportErrorKind, dispatch_request,
    };
}
