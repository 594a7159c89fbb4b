use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

/// Network identity of the caller, used as the client half of rate-limit keys.
///
/// The socket peer address is used unless forwarded headers are trusted, in
/// which case the first `x-forwarded-for` hop wins, then `x-real-ip`. Falls back
/// to the literal `unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier(pub String);

/// Whether `x-forwarded-for` / `x-real-ip` may be believed.
///
/// Only enable behind a reverse proxy that overwrites these headers; otherwise
/// any client can pick its own identity and dodge throttling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientAddressPolicy {
    pub trust_forwarded_headers: bool,
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    value.split(',').next()?.trim().parse().ok()
}

pub fn resolve_client(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    policy: ClientAddressPolicy,
) -> String {
    let forwarded = if policy.trust_forwarded_headers {
        header_ip(headers, "x-forwarded-for").or_else(|| header_ip(headers, "x-real-ip"))
    } else {
        None
    };
    forwarded
        .or(peer)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

impl<S> FromRequestParts<S> for ClientIdentifier
where
    ClientAddressPolicy: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let policy = ClientAddressPolicy::from_ref(state);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let client = resolve_client(&parts.headers, peer, policy);
        async move { Ok(ClientIdentifier(client)) }
    }
}
