use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::RefetchResult;
use crate::error::{FetchError, TransportErrorKind};
use crate::util::truncate_body;

/// A fully buffered HTTP response.
///
/// The body is read to completion before this type is constructed, so clones
/// share the same immutable bytes and the live value handed to a caller can
/// never invalidate the copy archived inside a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Stand-in response for an attempt whose network call failed outright.
    ///
    /// Failed attempts still need a recordable outcome, so the transport error
    /// is rendered into a 500 with a diagnostic body.
    pub(crate) fn synthetic_failure(kind: TransportErrorKind, message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers: HeaderMap::new(),
            body: Bytes::from(format!("transport error ({kind}): {message}")),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T>(&self) -> RefetchResult<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::Deserialize {
            source,
            body: truncate_body(&self.body),
        })
    }
}
