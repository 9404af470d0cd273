use std::time::{Duration, Instant};

use serde_json::Value;

use crate::RefetchResult;
use crate::error::{CapturedError, FetchError};
use crate::id::{IdGenerator, correlation_key};
use crate::request::StoredRequest;
use crate::response::HttpResponse;
use crate::sub_request::SubRequestSnapshot;
use crate::util::epoch_ms;

/// Mutable accumulator for one inbound request.
///
/// Created when handling starts, mutated by setters throughout, and frozen
/// into a [`RequestSnapshot`] once the final response is known. Completed
/// outbound calls are appended in call order via [`add_sub_request`].
///
/// The `connection`, `account_id` and `channel` getters fail with a
/// precondition error when read before assignment: reading them early is an
/// integration bug, not a request-level failure, and should surface loudly.
///
/// [`add_sub_request`]: RequestContext::add_sub_request
pub struct RequestContext {
    request_id: String,
    started_at: Instant,
    started_at_ms: u64,
    request: StoredRequest,
    connection: Option<String>,
    account_id: Option<String>,
    channel: Option<String>,
    action: Option<String>,
    product_ids: Vec<String>,
    response: Option<HttpResponse>,
    error: Option<CapturedError>,
    sub_requests: Vec<SubRequestSnapshot>,
    max_sub_requests: Option<usize>,
    log_enabled: bool,
    alert_enabled: bool,
    alert_payload: Option<Value>,
    cors: bool,
    important: bool,
}

impl RequestContext {
    pub fn new(request: StoredRequest) -> Self {
        Self {
            request_id: IdGenerator::generate(),
            started_at: Instant::now(),
            started_at_ms: epoch_ms(),
            request,
            connection: None,
            account_id: None,
            channel: None,
            action: None,
            product_ids: Vec::new(),
            response: None,
            error: None,
            sub_requests: Vec::new(),
            max_sub_requests: None,
            log_enabled: true,
            alert_enabled: false,
            alert_payload: None,
            cors: false,
            important: false,
        }
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = Some(connection.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Bounds the number of recorded outbound calls. Off by default; when set,
    /// [`add_sub_request`](RequestContext::add_sub_request) fails past the cap.
    pub fn max_sub_requests(mut self, limit: usize) -> Self {
        self.max_sub_requests = Some(limit.max(1));
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn request(&self) -> &StoredRequest {
        &self.request
    }

    pub fn connection(&self) -> RefetchResult<&str> {
        self.connection.as_deref().ok_or(FetchError::Precondition {
            scope: "request context",
            field: "connection",
        })
    }

    pub fn account_id(&self) -> RefetchResult<&str> {
        self.account_id.as_deref().ok_or(FetchError::Precondition {
            scope: "request context",
            field: "account_id",
        })
    }

    pub fn channel(&self) -> RefetchResult<&str> {
        self.channel.as_deref().ok_or(FetchError::Precondition {
            scope: "request context",
            field: "channel",
        })
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn error(&self) -> Option<&CapturedError> {
        self.error.as_ref()
    }

    pub fn sub_requests(&self) -> &[SubRequestSnapshot] {
        &self.sub_requests
    }

    pub fn set_connection(&mut self, connection: impl Into<String>) {
        self.connection = Some(connection.into());
    }

    pub fn set_account_id(&mut self, account_id: impl Into<String>) {
        self.account_id = Some(account_id.into());
    }

    pub fn set_channel(&mut self, channel: impl Into<String>) {
        self.channel = Some(channel.into());
    }

    pub fn set_action(&mut self, action: impl Into<String>) {
        self.action = Some(action.into());
    }

    pub fn set_product_ids(&mut self, product_ids: Vec<String>) {
        self.product_ids = product_ids;
    }

    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    pub fn set_error(&mut self, error: CapturedError) {
        self.error = Some(error);
    }

    pub fn set_cors(&mut self, cors: bool) {
        self.cors = cors;
    }

    pub fn mark_important(&mut self) {
        self.important = true;
    }

    pub fn enable_logs(&mut self) {
        self.log_enabled = true;
    }

    pub fn disable_logs(&mut self) {
        self.log_enabled = false;
    }

    pub fn enable_alert(&mut self) {
        self.alert_enabled = true;
    }

    pub fn enable_alert_with(&mut self, payload: Value) {
        self.alert_enabled = true;
        self.alert_payload = Some(payload);
    }

    /// Appends a completed outbound call. Insertion order is call order.
    pub fn add_sub_request(&mut self, sub_request: SubRequestSnapshot) -> RefetchResult<()> {
        if let Some(limit) = self.max_sub_requests
            && self.sub_requests.len() >= limit
        {
            return Err(FetchError::SubRequestOverflow {
                limit,
                request_id: self.request_id.clone(),
            });
        }
        self.sub_requests.push(sub_request);
        Ok(())
    }

    pub fn correlation_key(&self) -> RefetchResult<String> {
        Ok(correlation_key(&[self.account_id()?, &self.request_id]))
    }

    pub fn snapshot(&self) -> RefetchResult<RequestSnapshot> {
        let response = self.response.clone().ok_or(FetchError::Precondition {
            scope: "request context",
            field: "response",
        })?;
        Ok(RequestSnapshot {
            request_id: self.request_id.clone(),
            connection: self.connection.clone(),
            account_id: self.account_id.clone(),
            channel: self.channel.clone(),
            action: self.action.clone(),
            product_ids: self.product_ids.clone(),
            started_at_ms: self.started_at_ms,
            duration: self.started_at.elapsed(),
            request: self.request.clone(),
            response,
            error: self.error.clone(),
            sub_requests: self.sub_requests.clone(),
            log_enabled: self.log_enabled,
            alert_enabled: self.alert_enabled,
            alert_payload: self.alert_payload.clone(),
            cors: self.cors,
            important: self.important,
        })
    }
}

/// Immutable top-level record of one inbound request, handed to the log and
/// alert sinks once the response has been sent.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSnapshot {
    pub request_id: String,
    pub connection: Option<String>,
    pub account_id: Option<String>,
    pub channel: Option<String>,
    pub action: Option<String>,
    pub product_ids: Vec<String>,
    pub started_at_ms: u64,
    pub duration: Duration,
    pub request: StoredRequest,
    pub response: HttpResponse,
    pub error: Option<CapturedError>,
    pub sub_requests: Vec<SubRequestSnapshot>,
    pub log_enabled: bool,
    pub alert_enabled: bool,
    pub alert_payload: Option<Value>,
    pub cors: bool,
    pub important: bool,
}

impl RequestSnapshot {
    pub fn correlation_key(&self) -> Option<String> {
        let account_id = self.account_id.as_deref()?;
        Some(correlation_key(&[account_id, &self.request_id]))
    }
}
