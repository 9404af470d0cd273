use std::time::{Duration, Instant};

use crate::RefetchResult;
use crate::error::{CapturedError, FetchError};
use crate::id::{IdGenerator, correlation_key};
use crate::request::StoredRequest;
use crate::response::HttpResponse;
use crate::retry_attempt::RetryAttemptSnapshot;
use crate::util::epoch_ms;

/// Mutable accumulator for one outbound call.
///
/// The context's own `response` holds the outcome of the first attempt; every
/// later attempt lands in the ordered retry list. The retry engine mutates one
/// of these per call; nothing else writes to it concurrently.
pub struct SubRequestContext {
    account_id: String,
    request_id: String,
    sub_request_id: String,
    started_at: Instant,
    started_at_ms: u64,
    request: StoredRequest,
    response: Option<HttpResponse>,
    error: Option<CapturedError>,
    retries: Vec<RetryAttemptSnapshot>,
    log_enabled: bool,
}

impl SubRequestContext {
    pub fn new(
        account_id: impl Into<String>,
        request_id: impl Into<String>,
        request: StoredRequest,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            request_id: request_id.into(),
            sub_request_id: IdGenerator::generate(),
            started_at: Instant::now(),
            started_at_ms: epoch_ms(),
            request,
            response: None,
            error: None,
            retries: Vec::new(),
            log_enabled: true,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn sub_request_id(&self) -> &str {
        &self.sub_request_id
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

    pub fn retries(&self) -> &[RetryAttemptSnapshot] {
        &self.retries
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    pub fn set_error(&mut self, error: CapturedError) {
        self.error = Some(error);
    }

    pub fn add_retry(&mut self, retry: RetryAttemptSnapshot) {
        self.retries.push(retry);
    }

    pub fn enable_logs(&mut self) {
        self.log_enabled = true;
    }

    pub fn disable_logs(&mut self) {
        self.log_enabled = false;
    }

    /// The response that represents the outcome of this call: the last retry's
    /// response when retries were recorded, else the first attempt's.
    pub fn final_response(&self) -> Option<&HttpResponse> {
        match self.retries.last() {
            Some(last) => Some(&last.response),
            None => self.response.as_ref(),
        }
    }

    pub fn correlation_key(&self) -> String {
        correlation_key(&[&self.account_id, &self.request_id, &self.sub_request_id])
    }

    /// Freezes the call into an immutable record.
    ///
    /// Fails when no response was ever recorded. Callers driving the retry
    /// engine never hit this: the engine records a synthetic response even
    /// when every attempt failed at the transport level.
    pub fn snapshot(&self) -> RefetchResult<SubRequestSnapshot> {
        let response = self.response.clone().ok_or(FetchError::Precondition {
            scope: "sub-request context",
            field: "response",
        })?;
        Ok(SubRequestSnapshot {
            account_id: self.account_id.clone(),
            request_id: self.request_id.clone(),
            sub_request_id: self.sub_request_id.clone(),
            started_at_ms: self.started_at_ms,
            duration: self.started_at.elapsed(),
            request: self.request.clone(),
            response,
            error: self.error.clone(),
            retries: self.retries.clone(),
            log_enabled: self.log_enabled,
        })
    }
}

/// Immutable record of one outbound call and all of its retry attempts,
/// in wall-clock attempt order.
#[derive(Clone, Debug, PartialEq)]
pub struct SubRequestSnapshot {
    pub account_id: String,
    pub request_id: String,
    pub sub_request_id: String,
    pub started_at_ms: u64,
    pub duration: Duration,
    pub request: StoredRequest,
    pub response: HttpResponse,
    pub error: Option<CapturedError>,
    pub retries: Vec<RetryAttemptSnapshot>,
    pub log_enabled: bool,
}

impl SubRequestSnapshot {
    pub fn final_response(&self) -> &HttpResponse {
        match self.retries.last() {
            Some(last) => &last.response,
            None => &self.response,
        }
    }

    pub fn correlation_key(&self) -> String {
        correlation_key(&[&self.account_id, &self.request_id, &self.sub_request_id])
    }
}
