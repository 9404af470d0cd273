use http::Method;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a failed network call, derived from the
/// underlying transport error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Read,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Read => "read",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// An error captured for the archived record of an attempt.
///
/// Snapshots must stay `Clone` and independent of live values, so the
/// original error is rendered to text at capture time instead of being
/// stored as a source chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl CapturedError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }
}

impl std::fmt::Display for CapturedError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}: {}", self.kind, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FetchErrorCode {
    InvalidUri,
    InvalidHeaderName,
    InvalidHeaderValue,
    RequestBuild,
    SerializeJson,
    Transport,
    ReadBody,
    ResponseBodyTooLarge,
    Deserialize,
    TlsInit,
    Precondition,
    SubRequestOverflow,
}

impl FetchErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUri => "invalid_uri",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::RequestBuild => "request_build",
            Self::SerializeJson => "serialize_json",
            Self::Transport => "transport",
            Self::ReadBody => "read_body",
            Self::ResponseBodyTooLarge => "response_body_too_large",
            Self::Deserialize => "deserialize",
            Self::TlsInit => "tls_init",
            Self::Precondition => "precondition",
            Self::SubRequestOverflow => "sub_request_overflow",
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("invalid request uri: {uri}")]
    InvalidUri { uri: String },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to build http request: {source}")]
    RequestBuild {
        #[source]
        source: http::Error,
    },
    #[error("failed to serialize request json: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("http transport error ({kind}) for {method} {uri}: {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        uri: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to read response body: {source}")]
    ReadBody {
        #[source]
        source: BoxError,
    },
    #[error(
        "response body too large ({actual_bytes} bytes > {limit_bytes} bytes) for {method} {uri}"
    )]
    ResponseBodyTooLarge {
        limit_bytes: usize,
        actual_bytes: usize,
        method: Method,
        uri: String,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("failed to initialize tls: {message}")]
    TlsInit { message: String },
    #[error("{field} read on {scope} before it was set")]
    Precondition {
        scope: &'static str,
        field: &'static str,
    },
    #[error("sub-request list is full ({limit} entries) for request {request_id}")]
    SubRequestOverflow { limit: usize, request_id: String },
}

impl FetchError {
    pub const fn code(&self) -> FetchErrorCode {
        match self {
            Self::InvalidUri { .. } => FetchErrorCode::InvalidUri,
            Self::InvalidHeaderName { .. } => FetchErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => FetchErrorCode::InvalidHeaderValue,
            Self::RequestBuild { .. } => FetchErrorCode::RequestBuild,
            Self::Serialize { .. } => FetchErrorCode::SerializeJson,
            Self::Transport { .. } => FetchErrorCode::Transport,
            Self::ReadBody { .. } => FetchErrorCode::ReadBody,
            Self::ResponseBodyTooLarge { .. } => FetchErrorCode::ResponseBodyTooLarge,
            Self::Deserialize { .. } => FetchErrorCode::Deserialize,
            Self::TlsInit { .. } => FetchErrorCode::TlsInit,
            Self::Precondition { .. } => FetchErrorCode::Precondition,
            Self::SubRequestOverflow { .. } => FetchErrorCode::SubRequestOverflow,
        }
    }
}
