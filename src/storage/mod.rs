//! All things related to the storage of redirect rules, entities and the audit trail

use std::net::IpAddr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::Entity;
use crate::entities::EntityKind;
use crate::paths::normalize;
use crate::redirects::RedirectFilter;
use crate::redirects::RedirectRule;

#[cfg_attr(feature = "postgres", allow(unused_imports))]
pub use memory::Memory;
#[cfg(feature = "postgres")]
pub use postgres::Postgres;

#[cfg_attr(feature = "postgres", allow(dead_code))]
mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Setup the storage
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup() -> anyhow::Result<Memory> {
    tracing::info!("Using in-memory storage, all data is lost on shutdown");

    Ok(Memory::new())
}

/// Setup the storage
///
/// Uses the `DATABASE_URL` environment variable
#[cfg(feature = "postgres")]
pub async fn setup() -> anyhow::Result<Postgres> {
    let database_url = crate::utils::env_var("DATABASE_URL")
        .ok_or_else(|| anyhow::anyhow!("`DATABASE_URL` is required for Postgres storage"))?;

    Postgres::connect(&database_url).await
}

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// A uniqueness constraint of the storage is violated
    #[error("Constraint violation: {0}")]
    Constraint(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create or update a redirect rule with
///
/// Both URLs are normalized on construction, an empty destination stays empty
#[derive(Debug)]
pub struct RedirectValues {
    /// Normalized source
    pub url_old: String,

    /// Normalized destination, empty for a placeholder
    pub url_new: String,
}

impl RedirectValues {
    /// Create normalized values
    pub fn new(url_old: &str, url_new: &str) -> Self {
        Self {
            url_old: normalize(url_old),
            url_new: if url_new.trim().is_empty() {
                String::new()
            } else {
                normalize(url_new)
            },
        }
    }

    /// Values for a placeholder rule, waiting for a destination
    pub fn placeholder(url_old: &str) -> Self {
        Self::new(url_old, "")
    }
}

/// Possible audit trail entry types
#[derive(Debug)]
pub enum AuditEntry<'a> {
    /// Redirect rule is created
    CreateRedirect(&'a RedirectRule),

    /// Redirect rule is updated
    UpdateRedirect(&'a RedirectRule),

    /// Redirect rule is deleted
    DeleteRedirect(&'a RedirectRule),

    /// Entity is soft-deleted, a redirect keeps its URL alive
    ArchiveEntity(&'a Entity),

    /// Entity is removed for good
    PurgeEntity(&'a Entity),
}

impl AuditEntry<'_> {
    /// Action name
    pub fn action(&self) -> &'static str {
        match self {
            Self::CreateRedirect(_) => "create-redirect",
            Self::UpdateRedirect(_) => "update-redirect",
            Self::DeleteRedirect(_) => "delete-redirect",
            Self::ArchiveEntity(_) => "archive-entity",
            Self::PurgeEntity(_) => "purge-entity",
        }
    }

    /// Type of the entity the entry is about
    pub fn entity_type(&self) -> &'static str {
        match self {
            Self::CreateRedirect(_) | Self::UpdateRedirect(_) | Self::DeleteRedirect(_) => {
                "redirect"
            }
            Self::ArchiveEntity(entity) | Self::PurgeEntity(entity) => entity.kind.as_str(),
        }
    }

    /// ID of the entity the entry is about
    pub fn entity_id(&self) -> Uuid {
        match self {
            Self::CreateRedirect(rule)
            | Self::UpdateRedirect(rule)
            | Self::DeleteRedirect(rule) => rule.id,
            Self::ArchiveEntity(entity) | Self::PurgeEntity(entity) => entity.id,
        }
    }

    /// Human readable description
    pub fn description(&self) -> String {
        match self {
            Self::CreateRedirect(rule) if rule.is_placeholder() => {
                format!("Created placeholder redirect for {}", rule.url_old)
            }
            Self::CreateRedirect(rule) => {
                format!("Created redirect {} -> {}", rule.url_old, rule.url_new)
            }
            Self::UpdateRedirect(rule) => {
                format!("Updated redirect {} -> {}", rule.url_old, rule.url_new)
            }
            Self::DeleteRedirect(rule) => {
                format!("Deleted redirect {} -> {}", rule.url_old, rule.url_new)
            }
            Self::ArchiveEntity(entity) => format!("Archived {} {}", entity.kind, entity.slug),
            Self::PurgeEntity(entity) => format!("Purged {} {}", entity.kind, entity.slug),
        }
    }
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Find all redirect rules matching the filter, newest first
    async fn find_all_redirects(&self, filter: &RedirectFilter) -> Result<Vec<RedirectRule>>;

    /// Find a single redirect rule by ID
    async fn find_single_redirect_by_id(&self, id: &Uuid) -> Result<Option<RedirectRule>>;

    /// Find a single redirect rule by its already normalized source
    async fn find_single_redirect_by_normalized_url_old(
        &self,
        url_old: &str,
    ) -> Result<Option<RedirectRule>>;

    /// Find a single redirect rule by its source
    ///
    /// The path is normalized first, any raw path or URL can be given
    async fn find_single_redirect_by_url_old(&self, path: &str) -> Result<Option<RedirectRule>> {
        self.find_single_redirect_by_normalized_url_old(&normalize(path))
            .await
    }

    /// Create a redirect rule
    ///
    /// DOES NOT validate the rule, that is up to the caller
    async fn create_redirect(&self, values: &RedirectValues) -> Result<RedirectRule>;

    /// Update a redirect rule, `None` when the rule is gone
    ///
    /// DOES NOT validate the rule, that is up to the caller
    async fn update_redirect(
        &self,
        rule: &RedirectRule,
        values: &RedirectValues,
    ) -> Result<Option<RedirectRule>>;

    /// Delete a redirect rule
    async fn delete_redirect(&self, rule: &RedirectRule) -> Result<()>;

    /// Find a single entity by ID
    ///
    /// DOES NOT respect the soft-delete, archived entities are returned as well
    async fn find_single_entity_by_id(&self, kind: EntityKind, id: &Uuid)
    -> Result<Option<Entity>>;

    /// Soft-delete an entity
    async fn archive_entity(&self, entity: &Entity, deleted_at: &NaiveDateTime) -> Result<()>;

    /// Does any area, archived or not, still belong to the city?
    async fn city_has_areas(&self, city: &Entity) -> Result<bool>;

    /// Undo the soft-delete of an entity
    async fn restore_entity(&self, entity: &Entity) -> Result<()>;

    /// Remove an entity for good
    async fn purge_entity(&self, entity: &Entity) -> Result<()>;

    /// Register a creative/destructive action on the audit trail
    async fn register_audit_trail(
        &self,
        created_by: &Uuid,
        entry: &AuditEntry<'_>,
        ip_address: Option<&IpAddr>,
    ) -> Result<()>;
}
