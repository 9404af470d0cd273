use std::time::{SystemTime, UNIX_EPOCH};

use http::header::{HeaderName, HeaderValue};

use crate::error::FetchError;

const MAX_ERROR_BODY_LEN: usize = 2048;

pub(crate) fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis().min(u64::MAX as u128) as u64)
        .unwrap_or(0)
}

pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName, FetchError> {
    name.parse().map_err(|source| FetchError::InvalidHeaderName {
        name: name.to_owned(),
        source,
    })
}

pub(crate) fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, FetchError> {
    value
        .parse()
        .map_err(|source| FetchError::InvalidHeaderValue {
            name: name.to_owned(),
            source,
        })
}

pub(crate) fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_ERROR_BODY_LEN {
        return text.into_owned();
    }

    let truncated: String = text.chars().take(MAX_ERROR_BODY_LEN).collect();
    format!("{truncated}...(truncated)")
}
