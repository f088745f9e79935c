//! Entity archival
//!
//! Deleting a city, area or property either purges it right away, when it is young enough to not
//! be known by search engines yet, or archives it. An archived entity always leaves a redirect
//! behind for its public URL, a placeholder without destination when none exists yet. The
//! soft-delete is undone when that redirect can not be created.

use chrono::NaiveDateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::audit_trail::AuditTrail;
use crate::entities::Entity;
use crate::entities::EntityKind;
use crate::hooks::Hooks;
use crate::storage;
use crate::storage::AuditEntry;
use crate::storage::RedirectValues;
use crate::storage::Storage;

/// Entities younger than this are purged without redirect
pub const PURGE_WINDOW_HOURS: i64 = 24;

/// What happened to a deleted entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Removed for good
    Purged,

    /// Soft-deleted, a redirect keeps the URL alive
    Archived,
}

/// Outcome of deleting an entity
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// What happened to the entity
    pub action: Action,

    /// Was a placeholder redirect created?
    pub redirect_created: bool,
}

/// Archival errors
#[derive(Debug, Error)]
pub enum Error {
    /// The entity, or the city of an area, does not exist
    #[error("{0} not found")]
    EntityNotFound(EntityKind),

    /// A city is only purged once all of its areas are gone
    #[error("City still has areas")]
    CityHasAreas,

    /// The redirect for the public URL could not be created, nothing changed
    #[error("Could not create the redirect for {url}: {source}")]
    RedirectCreationFailed {
        /// Public URL of the entity
        url: String,

        /// The underlying storage error
        #[source]
        source: storage::Error,
    },

    /// Any other storage error
    #[error(transparent)]
    Storage(#[from] storage::Error),
}

/// The delete workflow of cities, areas and properties
pub struct Archival<'a, S: Storage> {
    /// Storage of entities and redirects
    storage: &'a S,

    /// Sitemap and media collaborators
    hooks: &'a dyn Hooks,

    /// Trail of every transition
    audit_trail: &'a AuditTrail<S>,
}

impl<'a, S: Storage> Archival<'a, S> {
    /// Create the workflow
    pub fn new(storage: &'a S, hooks: &'a dyn Hooks, audit_trail: &'a AuditTrail<S>) -> Self {
        Self {
            storage,
            hooks,
            audit_trail,
        }
    }

    /// Delete an entity
    pub async fn delete(&self, kind: EntityKind, id: &Uuid) -> Result<Outcome, Error> {
        self.delete_at(kind, id, Utc::now().naive_utc()).await
    }

    /// Delete an entity as if it is `now`
    pub async fn delete_at(
        &self,
        kind: EntityKind,
        id: &Uuid,
        now: NaiveDateTime,
    ) -> Result<Outcome, Error> {
        let entity = self
            .storage
            .find_single_entity_by_id(kind, id)
            .await?
            .ok_or(Error::EntityNotFound(kind))?;

        let url = self.public_url(&entity).await?;

        if entity.is_archived() {
            self.ensure_without_areas(&entity).await?;

            let redirect_created = self.ensure_redirect(&url).await?;

            self.purge(&entity).await?;

            return Ok(Outcome {
                action: Action::Purged,
                redirect_created,
            });
        }

        if now.signed_duration_since(entity.created_at) < TimeDelta::hours(PURGE_WINDOW_HOURS) {
            tracing::debug!("{kind} {id} is younger than {PURGE_WINDOW_HOURS} hours, purging");

            self.ensure_without_areas(&entity).await?;

            self.purge(&entity).await?;

            return Ok(Outcome {
                action: Action::Purged,
                redirect_created: false,
            });
        }

        self.archive(&entity, &url, &now).await
    }

    /// Soft-delete the entity and make sure its URL keeps redirecting
    async fn archive(
        &self,
        entity: &Entity,
        url: &str,
        now: &NaiveDateTime,
    ) -> Result<Outcome, Error> {
        self.storage.archive_entity(entity, now).await?;

        let redirect_created = match self.ensure_redirect(url).await {
            Ok(redirect_created) => redirect_created,
            Err(err) => {
                tracing::error!("{err}, restoring {} {}", entity.kind, entity.id);

                if let Err(restore_err) = self.storage.restore_entity(entity).await {
                    tracing::error!(
                        "Could not restore {} {} after failed redirect creation: {restore_err}",
                        entity.kind,
                        entity.id
                    );
                }

                return Err(err);
            }
        };

        tracing::info!("Archived {} {}, redirect kept for {url}", entity.kind, entity.id);

        let mut archived = entity.clone();
        archived.deleted_at = Some(*now);

        self.audit_trail
            .register(AuditEntry::ArchiveEntity(&archived))
            .await;
        self.regenerate_sitemap().await;

        Ok(Outcome {
            action: Action::Archived,
            redirect_created,
        })
    }

    /// Remove the entity and its media for good
    async fn purge(&self, entity: &Entity) -> Result<(), Error> {
        self.storage.purge_entity(entity).await?;

        tracing::info!("Purged {} {}", entity.kind, entity.id);

        if let Err(err) = self.hooks.delete_media(entity).await {
            tracing::error!("Could not delete media of {} {}: {err:#}", entity.kind, entity.id);
        }

        self.audit_trail
            .register(AuditEntry::PurgeEntity(entity))
            .await;
        self.regenerate_sitemap().await;

        Ok(())
    }

    /// Purging a city would leave its areas without public URL
    async fn ensure_without_areas(&self, entity: &Entity) -> Result<(), Error> {
        if entity.kind == EntityKind::City && self.storage.city_has_areas(entity).await? {
            return Err(Error::CityHasAreas);
        }

        Ok(())
    }

    async fn regenerate_sitemap(&self) {
        if let Err(err) = self.hooks.regenerate_sitemap().await {
            tracing::error!("Could not regenerate sitemap: {err:#}");
        }
    }

    /// Make sure a redirect exists for the URL
    ///
    /// Returns `true` when a placeholder had to be created
    async fn ensure_redirect(&self, url: &str) -> Result<bool, Error> {
        let redirect_creation_failed = |source| Error::RedirectCreationFailed {
            url: url.to_string(),
            source,
        };

        let existing = self
            .storage
            .find_single_redirect_by_url_old(url)
            .await
            .map_err(redirect_creation_failed)?;

        if existing.is_some() {
            return Ok(false);
        }

        let rule = self
            .storage
            .create_redirect(&RedirectValues::placeholder(url))
            .await
            .map_err(redirect_creation_failed)?;

        tracing::info!("Created placeholder redirect for {}", rule.url_old);

        self.audit_trail
            .register(AuditEntry::CreateRedirect(&rule))
            .await;

        Ok(true)
    }

    /// Public URL of the entity, areas need their city for it
    async fn public_url(&self, entity: &Entity) -> Result<String, Error> {
        let city = match (entity.kind, entity.city_id) {
            (EntityKind::Area, Some(city_id)) => {
                self.storage
                    .find_single_entity_by_id(EntityKind::City, &city_id)
                    .await?
            }
            _ => None,
        };

        entity
            .public_url(city.as_ref())
            .ok_or(Error::EntityNotFound(EntityKind::City))
    }
}
