use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use http_body_util::Full;
use serde::Serialize;

use crate::RefetchResult;
use crate::error::FetchError;
use crate::util::{parse_header_name, parse_header_value};

/// A fully buffered, replayable HTTP request.
///
/// The body is held as `Bytes`, so cloning the request for a retry attempt or
/// for an archived record is cheap and yields a value that can be consumed
/// independently of the original. This is what lets the same request be both
/// re-issued on the wire and kept verbatim inside a snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl StoredRequest {
    pub fn new(method: Method, uri: &str) -> RefetchResult<Self> {
        let uri = uri
            .parse()
            .map_err(|_| FetchError::InvalidUri {
                uri: uri.to_owned(),
            })?;
        Ok(Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    pub fn get(uri: &str) -> RefetchResult<Self> {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> RefetchResult<Self> {
        Self::new(Method::POST, uri)
    }

    /// Builds a request from already-parsed parts, e.g. an inbound request
    /// whose body was buffered at the service boundary.
    pub fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn try_header(self, name: &str, value: &str) -> RefetchResult<Self> {
        let name = parse_header_name(name)?;
        let value = parse_header_value(name.as_str(), value)?;
        Ok(self.header(name, value))
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn json<T>(self, payload: &T) -> RefetchResult<Self>
    where
        T: Serialize + ?Sized,
    {
        let body =
            serde_json::to_vec(payload).map_err(|source| FetchError::Serialize { source })?;
        let with_body = self.body(Bytes::from(body));
        Ok(with_body.header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    pub(crate) fn to_http(&self) -> RefetchResult<http::Request<Full<Bytes>>> {
        let mut request_builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.uri.clone());
        for (name, value) in &self.headers {
            request_builder = request_builder.header(name, value);
        }
        request_builder
            .body(Full::new(self.body.clone()))
            .map_err(|source| FetchError::RequestBuild { source })
    }
}

#[cfg(test)]
mod tests {
    use super::StoredRequest;
    use bytes::Bytes;

    #[test]
    fn invalid_uri_is_rejected_at_construction() {
        let error = StoredRequest::get("http://exa mple.com").expect_err("uri with space");
        assert_eq!(error.code(), crate::FetchErrorCode::InvalidUri);
    }

    #[test]
    fn cloned_request_body_is_independent_of_the_original() {
        let request = StoredRequest::post("https://api.example.com/v1/items")
            .expect("build request")
            .body(Bytes::from_static(b"payload"));
        let archived = request.clone();

        drop(request);
        assert_eq!(archived.body_bytes().as_ref(), b"payload");
    }

    #[test]
    fn json_body_sets_content_type() {
        let request = StoredRequest::post("https://api.example.com/v1/items")
            .expect("build request")
            .json(&serde_json::json!({ "name": "demo" }))
            .expect("serialize body");
        assert_eq!(
            request.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
