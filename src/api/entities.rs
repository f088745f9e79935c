//! Entity deletion API endpoints
//!
//! Cities, areas and properties are created and edited elsewhere, deleting them goes through the
//! archival workflow so their public URL keeps working.

use std::sync::Arc;

use axum::Extension;
use uuid::Uuid;

use crate::archival::Archival;
use crate::archival::Outcome;
use crate::audit_trail::AuditTrail;
use crate::entities::EntityKind;
use crate::hooks::Hooks;
use crate::storage::Storage;

use super::Error;
use super::PathParameters;
use super::Success;

/// Delete a city
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/cities/<uuid>
/// ```
///
/// Response:
/// ```json
/// { "data": { "action": "archived", "redirectCreated": true } }
/// ```
pub async fn delete_city<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    Extension(hooks): Extension<Arc<dyn Hooks>>,
    PathParameters(id): PathParameters<Uuid>,
) -> Result<Success<Outcome>, Error> {
    delete(EntityKind::City, &id, &storage, hooks.as_ref(), &audit_trail).await
}

/// Delete an area
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/areas/<uuid>
/// ```
pub async fn delete_area<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    Extension(hooks): Extension<Arc<dyn Hooks>>,
    PathParameters(id): PathParameters<Uuid>,
) -> Result<Success<Outcome>, Error> {
    delete(EntityKind::Area, &id, &storage, hooks.as_ref(), &audit_trail).await
}

/// Delete a property
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/properties/<uuid>
/// ```
///
/// Response, for a property younger than a day:
/// ```json
/// { "data": { "action": "purged", "redirectCreated": false } }
/// ```
pub async fn delete_property<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    Extension(hooks): Extension<Arc<dyn Hooks>>,
    PathParameters(id): PathParameters<Uuid>,
) -> Result<Success<Outcome>, Error> {
    delete(EntityKind::Property, &id, &storage, hooks.as_ref(), &audit_trail).await
}

async fn delete<S: Storage>(
    kind: EntityKind,
    id: &Uuid,
    storage: &S,
    hooks: &dyn Hooks,
    audit_trail: &AuditTrail<S>,
) -> Result<Success<Outcome>, Error> {
    let outcome = Archival::new(storage, hooks, audit_trail)
        .delete(kind, id)
        .await?;

    Ok(Success::ok(outcome))
}
