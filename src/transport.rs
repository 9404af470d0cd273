use bytes::Bytes;
use futures_core::future::BoxFuture;
use http::{Method, Uri};
use http_body_util::Full;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::RefetchResult;
use crate::body::{ReadBodyError, read_all_body_limited};
use crate::error::{CapturedError, FetchError, TransportErrorKind};
use crate::request::StoredRequest;
use crate::response::HttpResponse;

const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 8 * 1024 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failed network call, before any HTTP response was fully obtained.
#[derive(Debug)]
pub struct TransportError {
    kind: TransportErrorKind,
    source: BoxError,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub(crate) fn captured(&self) -> CapturedError {
        CapturedError::new(self.kind, self.source.to_string())
    }

    pub(crate) fn into_fetch_error(self, method: &Method, uri: &Uri) -> FetchError {
        FetchError::Transport {
            kind: self.kind,
            method: method.clone(),
            uri: uri.to_string(),
            source: self.source,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{} ({})", self.source, self.kind)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// The "perform one HTTP call" capability the fetch engine is built on.
///
/// Implementations buffer the response body to completion before returning, so
/// the engine only ever sees replayable values. The seam exists so tests and
/// embedders can substitute a scripted transport for the real network.
pub trait Transport: Send + Sync {
    fn send(&self, request: StoredRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    fn send(&self, request: StoredRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        (**self).send(request)
    }
}

/// Production transport: hyper's pooled client over rustls, HTTP/1.1 and h2.
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    max_response_body_bytes: usize,
}

impl HyperTransport {
    pub fn new() -> RefetchResult<Self> {
        Self::with_max_response_body_bytes(DEFAULT_MAX_RESPONSE_BODY_BYTES)
    }

    pub fn with_max_response_body_bytes(max_response_body_bytes: usize) -> RefetchResult<Self> {
        let https = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|source| FetchError::TlsInit {
                message: source.to_string(),
            })?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        Ok(Self {
            client,
            max_response_body_bytes: max_response_body_bytes.max(1),
        })
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: StoredRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let http_request = request
                .to_http()
                .map_err(|error| TransportError::new(TransportErrorKind::Other, error))?;
            let response = self
                .client
                .request(http_request)
                .await
                .map_err(|source| TransportError::new(classify_transport_error(&source), source))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = read_all_body_limited(response.into_body(), self.max_response_body_bytes)
                .await
                .map_err(|error| match error {
                    ReadBodyError::Read(source) => {
                        TransportError::new(TransportErrorKind::Read, source)
                    }
                    ReadBodyError::TooLarge { actual_bytes } => TransportError::new(
                        TransportErrorKind::Read,
                        format!("response body too large: {actual_bytes} bytes"),
                    ),
                })?;
            Ok(HttpResponse::new(status, headers, body))
        })
    }
}

fn classify_transport_error(error: &hyper_util::client::legacy::Error) -> TransportErrorKind {
    if error.is_connect() {
        let text = error.to_string().to_ascii_lowercase();
        if text.contains("dns")
            || text.contains("name or service not known")
            || text.contains("failed to lookup address")
        {
            return TransportErrorKind::Dns;
        }
        if text.contains("tls") || text.contains("certificate") || text.contains("handshake") {
            return TransportErrorKind::Tls;
        }
        return TransportErrorKind::Connect;
    }

    let text = error.to_string().to_ascii_lowercase();
    if text.contains("read")
        || text.contains("connection reset")
        || text.contains("broken pipe")
        || text.contains("unexpected eof")
    {
        return TransportErrorKind::Read;
    }

    TransportErrorKind::Other
}

#[cfg(test)]
mod tests {
    use super::TransportError;
    use crate::error::TransportErrorKind;

    #[test]
    fn captured_error_keeps_kind_and_rendered_message() {
        let error = TransportError::new(TransportErrorKind::Connect, "connection refused");
        let captured = error.captured();
        assert_eq!(captured.kind, TransportErrorKind::Connect);
        assert_eq!(captured.message, "connection refused");
    }

    #[test]
    fn into_fetch_error_carries_method_and_uri() {
        let error = TransportError::new(TransportErrorKind::Dns, "lookup failed");
        let uri: http::Uri = "https://api.example.com/v1/items".parse().expect("uri");
        let fetch_error = error.into_fetch_error(&http::Method::GET, &uri);
        assert_eq!(fetch_error.code(), crate::FetchErrorCode::Transport);
        let text = fetch_error.to_string();
        assert!(text.contains("dns"));
        assert!(text.contains("https://api.example.com/v1/items"));
    }
}
