use std::sync::Arc;

use tokio::time::sleep;
use tracing::{Instrument, debug, info_span, warn};

use crate::RefetchResult;
use crate::request::StoredRequest;
use crate::response::HttpResponse;
use crate::retry::RetryPolicy;
use crate::retry_attempt::RetryAttemptContext;
use crate::sub_request::SubRequestContext;
use crate::transport::{HyperTransport, Transport, TransportError};

const DEFAULT_CLIENT_NAME: &str = "refetch";

/// The retry engine.
///
/// Performs one logical outbound call as a bounded sequence of attempts, and
/// optionally records every attempt into a [`SubRequestContext`] as it
/// happens. Attempts are strictly sequential; the only suspension points are
/// the backoff sleep and the network call itself.
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    retry_policy: RetryPolicy,
    client_name: String,
}

impl FetchClient {
    pub fn builder() -> FetchClientBuilder {
        FetchClientBuilder::new()
    }

    /// Executes `request` under the client's retry policy.
    ///
    /// When a context is supplied, the first attempt's outcome is recorded on
    /// the context itself and each later attempt becomes an entry in its retry
    /// list. Without a context the engine is a plain retrying fetch with no
    /// observability side effects.
    pub async fn execute(
        &self,
        request: StoredRequest,
        track: Option<&mut SubRequestContext>,
    ) -> RefetchResult<HttpResponse> {
        let retry_policy = self.retry_policy.clone();
        self.execute_with_policy(request, &retry_policy, track).await
    }

    /// [`execute`](FetchClient::execute) with a per-call policy override.
    ///
    /// The loop below is the whole contract: attempt 0 runs immediately;
    /// attempt n waits n base periods first; a transport failure is recorded
    /// as a synthetic 500 and only surfaces as an error if it happened on the
    /// final attempt. A response whose status is still a failure after the
    /// attempt budget is spent is returned as-is for the caller to inspect.
    pub async fn execute_with_policy(
        &self,
        request: StoredRequest,
        retry_policy: &RetryPolicy,
        mut track: Option<&mut SubRequestContext>,
    ) -> RefetchResult<HttpResponse> {
        let max_attempts = retry_policy.max_attempts_value();
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = retry_policy.backoff_for_attempt(attempt);
                if !delay.is_zero() {
                    sleep(delay).await;
                }
            }

            let mut retry_track = match (attempt, track.as_deref()) {
                (0, _) | (_, None) => None,
                (_, Some(parent)) => Some(RetryAttemptContext::for_sub_request(
                    parent,
                    request.clone(),
                )),
            };

            let span = info_span!(
                "refetch.attempt",
                client = %self.client_name,
                method = %request.method(),
                uri = %request.uri(),
                attempt = attempt
            );
            let outcome = {
                let transport = &self.transport;
                let request = request.clone();
                async move {
                    debug!("sending request");
                    transport.send(request).await
                }
                .instrument(span)
                .await
            };

            let (response, transport_error) = match outcome {
                Ok(response) => (response, None),
                Err(error) => {
                    warn!(attempt, kind = %error.kind(), error = %error, "transport error");
                    let response = HttpResponse::synthetic_failure(
                        error.kind(),
                        &error.captured().message,
                    );
                    (response, Some(error))
                }
            };
            let captured = transport_error.as_ref().map(TransportError::captured);

            if let Some(context) = track.as_deref_mut() {
                match retry_track.as_mut() {
                    None => {
                        context.set_response(response.clone());
                        if let Some(captured) = captured.clone() {
                            context.set_error(captured);
                        }
                    }
                    Some(retry_context) => {
                        retry_context.set_response(response.clone());
                        if let Some(captured) = captured.clone() {
                            retry_context.set_error(captured);
                        }
                        context.add_retry(retry_context.snapshot()?);
                    }
                }
            }

            attempt += 1;
            if retry_policy.is_retryable_status(response.status()) && attempt < max_attempts {
                debug!(
                    status = response.status().as_u16(),
                    next_attempt = attempt,
                    "scheduling retry"
                );
                continue;
            }

            return match transport_error {
                Some(error) => Err(error.into_fetch_error(request.method(), request.uri())),
                None => Ok(response),
            };
        }
    }
}

pub struct FetchClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    retry_policy: RetryPolicy,
    client_name: String,
}

impl FetchClientBuilder {
    fn new() -> Self {
        Self {
            transport: None,
            retry_policy: RetryPolicy::standard(),
            client_name: DEFAULT_CLIENT_NAME.to_owned(),
        }
    }

    pub fn client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn try_build(self) -> RefetchResult<FetchClient> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };
        Ok(FetchClient {
            transport,
            retry_policy: self.retry_policy,
            client_name: self.client_name,
        })
    }
}
