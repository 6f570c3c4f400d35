//! Extract passthrough request headers for the source.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderName},
};
use std::collections::BTreeMap;

/// Headers that describe the HTTP exchange itself are never forwarded.
fn is_hop_header(name: &HeaderName) -> bool {
    [
        header::HOST,
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::CONTENT_TYPE,
        header::TRANSFER_ENCODING,
        header::ACCEPT_ENCODING,
    ]
    .contains(name)
}

/// Request headers passed through opaquely to every source call, e.g. `authorization`.
/// Names are lowercase; repeated headers are joined with `, `.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForwardedHeaders(pub BTreeMap<String, String>);

impl ForwardedHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut forwarded: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            if is_hop_header(name) {
                continue;
            }
            let Ok(value) = value.to_str() else {
                continue;
            };
            forwarded
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
        ForwardedHeaders(forwarded)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ForwardedHeaders
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ForwardedHeaders::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwards_application_headers_only() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/vnd.api+json"));
        headers.insert(header::HOST, HeaderValue::from_static("localhost"));
        headers.append("x-trace", HeaderValue::from_static("a"));
        headers.append("x-trace", HeaderValue::from_static("b"));

        let forwarded = ForwardedHeaders::from_headers(&headers).into_inner();
        assert_eq!(forwarded.len(), 2);
        assert_eq!(forwarded["authorization"], "Bearer abc");
        assert_eq!(forwarded["x-trace"], "a, b");
    }
}
