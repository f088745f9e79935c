//! Audit trail service

use std::net::IpAddr;

use uuid::Uuid;

use crate::storage::AuditEntry;
use crate::storage::Storage;

/// Audit trail service
#[derive(Clone)]
pub struct AuditTrail<S: Storage> {
    /// Storage in where the trail is saved
    storage: S,

    /// The user doing the actions
    user_id: Uuid,

    /// The IP address associated with the audit trail
    ip_address: Option<IpAddr>,
}

impl<S: Storage> AuditTrail<S> {
    /// Create the audit trail for a user
    pub fn new(storage: S, user_id: Uuid, ip_address: Option<IpAddr>) -> Self {
        Self {
            storage,
            user_id,
            ip_address,
        }
    }

    /// Register an entry on the audit trail
    ///
    /// Failures are logged, the action itself already happened
    pub async fn register(&self, entry: AuditEntry<'_>) {
        let result = self
            .storage
            .register_audit_trail(&self.user_id, &entry, self.ip_address.as_ref())
            .await;

        if let Err(err) = result {
            tracing::error!(
                "Could not register audit trail entry {} for {} {}: {err}",
                entry.action(),
                entry.entity_type(),
                entry.entity_id(),
            );
        }
    }
}
