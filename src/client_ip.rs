//! Optional client IP address extractor
//!
//! Requests without a known peer, like the ones in tests, are still served.

use std::convert::Infallible;
use std::net::IpAddr;

use axum::extract::FromRequestParts as _;
use axum::extract::OptionalFromRequestParts;
use axum::http::request::Parts;

/// IP address of the client, recorded on the audit trail
#[derive(Debug, Clone, Copy)]
pub struct ClientIp {
    /// The address as resolved by the configured source
    pub ip_address: IpAddr,
}

impl<S> OptionalFromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let client_ip = axum_client_ip::ClientIp::from_request_parts(parts, state).await;

        Ok(client_ip
            .ok()
            .map(|axum_client_ip::ClientIp(ip_address)| Self { ip_address }))
    }
}
