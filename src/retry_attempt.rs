use std::time::{Duration, Instant};

use crate::RefetchResult;
use crate::error::{CapturedError, FetchError};
use crate::id::{IdGenerator, correlation_key};
use crate::request::StoredRequest;
use crate::response::HttpResponse;
use crate::sub_request::SubRequestContext;
use crate::util::epoch_ms;

/// Mutable accumulator for one retry attempt of an outbound call.
///
/// Created immediately before the attempt is issued and frozen into a
/// [`RetryAttemptSnapshot`] right after it resolves, so the recorded duration
/// covers the attempt itself and not the backoff sleep preceding it.
pub struct RetryAttemptContext {
    account_id: String,
    request_id: String,
    sub_request_id: String,
    retry_id: String,
    started_at: Instant,
    started_at_ms: u64,
    request: StoredRequest,
    response: Option<HttpResponse>,
    error: Option<CapturedError>,
}

impl RetryAttemptContext {
    pub fn new(
        account_id: impl Into<String>,
        request_id: impl Into<String>,
        sub_request_id: impl Into<String>,
        request: StoredRequest,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            request_id: request_id.into(),
            sub_request_id: sub_request_id.into(),
            retry_id: IdGenerator::generate(),
            started_at: Instant::now(),
            started_at_ms: epoch_ms(),
            request,
            response: None,
            error: None,
        }
    }

    /// Keys a fresh attempt off the identifiers of the call it retries.
    pub fn for_sub_request(parent: &SubRequestContext, request: StoredRequest) -> Self {
        Self::new(
            parent.account_id(),
            parent.request_id(),
            parent.sub_request_id(),
            request,
        )
    }

    pub fn retry_id(&self) -> &str {
        &self.retry_id
    }

    pub fn request(&self) -> &StoredRequest {
        &self.request
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    pub fn set_error(&mut self, error: CapturedError) {
        self.error = Some(error);
    }

    pub fn correlation_key(&self) -> String {
        correlation_key(&[
            &self.account_id,
            &self.request_id,
            &self.sub_request_id,
            &self.retry_id,
        ])
    }

    pub fn snapshot(&self) -> RefetchResult<RetryAttemptSnapshot> {
        let response = self.response.clone().ok_or(FetchError::Precondition {
            scope: "retry attempt context",
            field: "response",
        })?;
        Ok(RetryAttemptSnapshot {
            account_id: self.account_id.clone(),
            request_id: self.request_id.clone(),
            sub_request_id: self.sub_request_id.clone(),
            retry_id: self.retry_id.clone(),
            started_at_ms: self.started_at_ms,
            duration: self.started_at.elapsed(),
            request: self.request.clone(),
            response,
            error: self.error.clone(),
        })
    }
}

/// Immutable record of one retry attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryAttemptSnapshot {
    pub account_id: String,
    pub request_id: String,
    pub sub_request_id: String,
    pub retry_id: String,
    pub started_at_ms: u64,
    pub duration: Duration,
    pub request: StoredRequest,
    pub response: HttpResponse,
    pub error: Option<CapturedError>,
}

impl RetryAttemptSnapshot {
    pub fn correlation_key(&self) -> String {
        correlation_key(&[
            &self.account_id,
            &self.request_id,
            &self.sub_request_id,
            &self.retry_id,
        ])
    }
}
