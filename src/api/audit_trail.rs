//! Audit trail extractor
//!
//! Binds the audit trail to the current user and their IP address

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::audit_trail::AuditTrail;
use crate::client_ip::ClientIp;
use crate::storage::Storage;

use super::CurrentUser;
use super::Error;

impl<B, S> FromRequestParts<B> for AuditTrail<S>
where
    B: Send + Sync,
    S: Storage,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        let Extension(storage) = parts
            .extract::<Extension<S>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get the storage"))?;

        let current_user = CurrentUser::from_request_parts(parts, state).await?;

        let ip_address = parts
            .extract::<Option<ClientIp>>()
            .await
            .map_err(|_| Error::internal_server_error("Missing address"))?
            .map(|client_ip| client_ip.ip_address);

        Ok(AuditTrail::new(storage, current_user.id, ip_address))
    }
}
