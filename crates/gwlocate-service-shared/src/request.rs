//! Request metadata extractors.
//!
//! - [`RequestId`]: correlation ID from `X-Request-ID`, or a fresh UUID v7
//! - [`ClientAddr`]: the requester address, preferring `X-Forwarded-For` over
//!   the transport peer
//! - [`PeerAddr`]: connect info recorded for any listener addressed by
//!   [`SocketAddr`], plain TCP and TLS alike
//!
//! Both are axum extractors. The request ID is cached in the request
//! extensions so every extractor and the handler agree on one value.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::connect_info::Connected;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::serve::{IncomingStream, Listener};
use http::request::Parts;
use http::HeaderMap;
use uuid::Uuid;

use crate::ProblemDetails;

/// Header carrying the original client address behind a proxy.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Header carrying a caller-supplied correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Newtype wrapper for request correlation IDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new UUID v7 request ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ID cached on this request, creating and caching it if needed.
    pub fn for_parts(parts: &mut Parts) -> Self {
        if let Some(id) = parts.extensions.get::<RequestId>() {
            return id.clone();
        }
        let id = extract_or_generate_request_id(&parts.headers);
        parts.extensions.insert(id.clone());
        id
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Extract the request ID from headers or generate a new UUID v7.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(RequestId::from)
        .unwrap_or_else(RequestId::generate)
}

impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::for_parts(parts))
    }
}

/// Remote address of the accepted connection.
///
/// Serve with `into_make_service_with_connect_info::<PeerAddr>()` so the
/// address reaches [`ClientAddr`] whatever the listener type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

impl<L> Connected<IncomingStream<'_, L>> for PeerAddr
where
    L: Listener<Addr = SocketAddr>,
{
    fn connect_info(stream: IncomingStream<'_, L>) -> Self {
        Self(*stream.remote_addr())
    }
}

/// Where the requester address was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrSource {
    ForwardedFor,
    Peer,
}

/// The requester's network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr {
    pub ip: IpAddr,
    pub source: AddrSource,
}

/// First hop of an `X-Forwarded-For` value.
///
/// Returns `None` when the header is blank, `Some(Err)` when the first entry
/// is not an IP address.
pub fn parse_forwarded_for(value: &str) -> Option<Result<IpAddr, String>> {
    let first = value.split(',').next().map(str::trim).unwrap_or("");
    if first.is_empty() {
        return None;
    }
    Some(
        first
            .parse::<IpAddr>()
            .map_err(|_| format!("'{}' is not a valid IP address", first)),
    )
}

impl<S> FromRequestParts<S> for ClientAddr
where
    S: Send + Sync,
{
    type Rejection = ProblemDetails;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let request_id = RequestId::for_parts(parts);

        if let Some(header) = parts.headers.get(FORWARDED_FOR_HEADER) {
            let value = header.to_str().map_err(|_| {
                ProblemDetails::invalid_address(
                    "X-Forwarded-For header is not valid ASCII",
                    request_id.as_str(),
                )
            })?;
            match parse_forwarded_for(value) {
                Some(Ok(ip)) => {
                    return Ok(Self {
                        ip,
                        source: AddrSource::ForwardedFor,
                    })
                }
                Some(Err(detail)) => {
                    return Err(ProblemDetails::invalid_address(detail, request_id.as_str()))
                }
                None => {}
            }
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<PeerAddr>>()
            .map(|ConnectInfo(PeerAddr(addr))| *addr)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| *addr)
            });

        peer.map(|addr| Self {
            ip: addr.ip(),
            source: AddrSource::Peer,
        })
        .ok_or_else(|| {
                ProblemDetails::invalid_address(
                    "requester address could not be determined",
                    request_id.as_str(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Request};

    fn parts_with(headers: &[(&'static str, &'static str)]) -> Parts {
        let mut builder = Request::builder().uri("/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_request_id_generate() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 36);
    }

    #[test]
    fn test_extract_request_id_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Request-ID", HeaderValue::from_static("test-123"));
        assert_eq!(extract_or_generate_request_id(&headers).as_str(), "test-123");
    }

    #[test]
    fn test_extract_request_id_generates_when_empty() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static(""));
        assert_eq!(extract_or_generate_request_id(&headers).as_str().len(), 36);
    }

    #[test]
    fn test_request_id_cached_in_extensions() {
        let mut parts = parts_with(&[]);
        let first = RequestId::for_parts(&mut parts);
        let second = RequestId::for_parts(&mut parts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_parse_forwarded_for() {
        assert_eq!(
            parse_forwarded_for("203.0.113.7"),
            Some(Ok("203.0.113.7".parse().unwrap()))
        );
        assert_eq!(
            parse_forwarded_for(" 2001:db8::1 , 10.0.0.1"),
            Some(Ok("2001:db8::1".parse().unwrap()))
        );
        assert_eq!(parse_forwarded_for("   "), None);
        assert!(matches!(parse_forwarded_for("unknown, 10.0.0.1"), Some(Err(_))));
    }

    #[tokio::test]
    async fn test_client_addr_prefers_forwarded_header() {
        let mut parts = parts_with(&[("x-forwarded-for", "198.51.100.9, 10.0.0.1")]);
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let addr = ClientAddr::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(addr.ip, "198.51.100.9".parse::<IpAddr>().unwrap());
        assert_eq!(addr.source, AddrSource::ForwardedFor);
    }

    #[tokio::test]
    async fn test_client_addr_falls_back_to_peer() {
        let mut parts = parts_with(&[]);
        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 44], 5555))));

        let addr = ClientAddr::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(addr.ip, "192.0.2.44".parse::<IpAddr>().unwrap());
        assert_eq!(addr.source, AddrSource::Peer);
    }

    #[tokio::test]
    async fn test_client_addr_reads_peer_connect_info() {
        let mut parts = parts_with(&[]);
        parts
            .extensions
            .insert(ConnectInfo(PeerAddr(SocketAddr::from(([198, 51, 100, 3], 443)))));

        let addr = ClientAddr::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(addr.ip, "198.51.100.3".parse::<IpAddr>().unwrap());
        assert_eq!(addr.source, AddrSource::Peer);
    }

    #[tokio::test]
    async fn test_forwarded_header_beats_peer_connect_info() {
        let mut parts = parts_with(&[("x-forwarded-for", "192.0.2.10")]);
        parts
            .extensions
            .insert(ConnectInfo(PeerAddr(SocketAddr::from(([127, 0, 0, 1], 443)))));

        let addr = ClientAddr::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(addr.ip, "192.0.2.10".parse::<IpAddr>().unwrap());
        assert_eq!(addr.source, AddrSource::ForwardedFor);
    }

    #[tokio::test]
    async fn test_client_addr_rejects_malformed_header() {
        let mut parts = parts_with(&[("x-forwarded-for", "not-an-ip"), ("x-request-id", "req-9")]);
        let problem = ClientAddr::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(problem.status, 400);
        assert_eq!(problem.instance.as_deref(), Some("req-9"));
    }

    #[tokio::test]
    async fn test_client_addr_without_any_source() {
        let mut parts = parts_with(&[]);
        let problem = ClientAddr::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(problem.status, 400);
    }
}
