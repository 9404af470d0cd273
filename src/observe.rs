use tracing::{error, info};

use crate::RefetchResult;
use crate::context::{RequestContext, RequestSnapshot};

/// Consumer of completed request records.
///
/// Hooks are fire-and-forget: implementations must not panic, and anything
/// slow or fallible belongs on a task the implementation spawns itself so a
/// misbehaving sink cannot affect request handling.
pub trait Logger: Send + Sync {
    fn log_request(&self, _snapshot: &RequestSnapshot) {}
}

/// Consumer of records flagged for alerting. Same delivery rules as
/// [`Logger`].
pub trait AlertLogger: Send + Sync {
    fn alert(&self, _snapshot: &RequestSnapshot) {}
}

/// Discards everything. The default sink wiring.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {}

impl AlertLogger for NoopLogger {}

/// Emits records as structured `tracing` events keyed by correlation ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_request(&self, snapshot: &RequestSnapshot) {
        info!(
            request_id = %snapshot.request_id,
            account_id = snapshot.account_id.as_deref().unwrap_or("-"),
            channel = snapshot.channel.as_deref().unwrap_or("-"),
            status = snapshot.response.status().as_u16(),
            duration_ms = snapshot.duration.as_millis() as u64,
            sub_requests = snapshot.sub_requests.len(),
            important = snapshot.important,
            "request completed"
        );
    }
}

impl AlertLogger for TracingLogger {
    fn alert(&self, snapshot: &RequestSnapshot) {
        error!(
            request_id = %snapshot.request_id,
            account_id = snapshot.account_id.as_deref().unwrap_or("-"),
            status = snapshot.response.status().as_u16(),
            payload = %snapshot
                .alert_payload
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            "request alert"
        );
    }
}

/// Freezes `context` and routes the snapshot to the sinks its flags select.
///
/// The snapshot is returned so the caller can hand it to further consumers
/// without re-finalizing (and without the duration drifting between sinks).
pub fn dispatch_request(
    context: &RequestContext,
    logger: &dyn Logger,
    alerts: &dyn AlertLogger,
) -> RefetchResult<RequestSnapshot> {
    let snapshot = context.snapshot()?;
    if snapshot.log_enabled {
        logger.log_request(&snapshot);
    }
    if snapshot.alert_enabled {
        alerts.alert(&snapshot);
    }
    Ok(snapshot)
}
