//! Postgres storage

use std::net::IpAddr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::ipnetwork::IpNetwork;
use uuid::Uuid;

use crate::entities::Entity;
use crate::entities::EntityKind;
use crate::redirects::RedirectFilter;
use crate::redirects::RedirectRule;

use super::AuditEntry;
use super::Error;
use super::RedirectValues;
use super::Result;
use super::Storage;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres type for audit trail entry type
#[derive(PartialEq, Debug, sqlx::Type)]
#[sqlx(type_name = "audit_trail_entry_type")]
#[sqlx(rename_all = "kebab-case")]
enum AuditEntryType {
    /// Redirect rule is created
    CreateRedirect,

    /// Redirect rule is updated
    UpdateRedirect,

    /// Redirect rule is deleted
    DeleteRedirect,

    /// Entity is archived
    ArchiveEntity,

    /// Entity is purged
    PurgeEntity,
}

impl AuditEntryType {
    /// Create audit entry type from audit entry
    fn from_audit_entry(entry: &AuditEntry) -> Self {
        match entry {
            AuditEntry::CreateRedirect(_) => Self::CreateRedirect,
            AuditEntry::UpdateRedirect(_) => Self::UpdateRedirect,
            AuditEntry::DeleteRedirect(_) => Self::DeleteRedirect,

            AuditEntry::ArchiveEntity(_) => Self::ArchiveEntity,
            AuditEntry::PurgeEntity(_) => Self::PurgeEntity,
        }
    }
}

/// Table holding the entities of a kind
fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::City => "cities",
        EntityKind::Area => "areas",
        EntityKind::Property => "properties",
    }
}

/// Postgres version of an entity, the kind follows from the table
#[derive(sqlx::FromRow)]
struct PostgresEntity {
    /// Entity ID
    id: Uuid,

    /// Slug
    slug: String,

    /// City of an area
    city_id: Option<Uuid>,

    /// Creation date
    created_at: NaiveDateTime,

    /// Last updated at
    updated_at: NaiveDateTime,

    /// Archived at
    deleted_at: Option<NaiveDateTime>,
}

impl Entity {
    /// Create entity from postgres version
    fn from_postgres_entity(kind: EntityKind, entity: PostgresEntity) -> Self {
        Self {
            id: entity.id,
            kind,
            slug: entity.slug,
            city_id: entity.city_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            deleted_at: entity.deleted_at,
        }
    }
}

/// Postgres storage
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Connect to Postgres
    ///
    /// Migrations will be run
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
            .context("Could not connect to Postgres")?;

        MIGRATOR
            .run(&connection_pool)
            .await
            .context("Migrations could not run")?;

        Ok(Self { connection_pool })
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn find_all_redirects(&self, filter: &RedirectFilter) -> Result<Vec<RedirectRule>> {
        let search = filter
            .search
            .as_deref()
            .filter(|search| !search.is_empty())
            .map(str::to_lowercase);

        let redirects = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT *
            FROM redirects
            WHERE ($1::TEXT IS NULL OR strpos(url_old, $1) > 0 OR strpos(url_new, $1) > 0)
                AND (NOT $2 OR url_new = '')
            ORDER BY created_at DESC, url_old ASC
            ",
        )
        .bind(search)
        .bind(filter.placeholders_only)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(redirects)
    }

    async fn find_single_redirect_by_id(&self, id: &Uuid) -> Result<Option<RedirectRule>> {
        let redirect = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT *
            FROM redirects
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(redirect)
    }

    async fn find_single_redirect_by_normalized_url_old(
        &self,
        url_old: &str,
    ) -> Result<Option<RedirectRule>> {
        let redirect = sqlx::query_as::<_, RedirectRule>(
            r"
            SELECT *
            FROM redirects
            WHERE url_old = $1
            LIMIT 1
            ",
        )
        .bind(url_old)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(redirect)
    }

    async fn create_redirect(&self, values: &RedirectValues) -> Result<RedirectRule> {
        let redirect = sqlx::query_as::<_, RedirectRule>(
            r"
            INSERT INTO redirects (id, url_old, url_new)
            VALUES ($1, $2, $3)
            RETURNING *
            ",
        )
        .bind(Uuid::new_v4())
        .bind(&values.url_old)
        .bind(&values.url_new)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(redirect)
    }

    async fn update_redirect(
        &self,
        rule: &RedirectRule,
        values: &RedirectValues,
    ) -> Result<Option<RedirectRule>> {
        let redirect = sqlx::query_as::<_, RedirectRule>(
            r"
            UPDATE redirects
            SET url_old = $1, url_new = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *
            ",
        )
        .bind(&values.url_old)
        .bind(&values.url_new)
        .bind(rule.id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(redirect)
    }

    async fn delete_redirect(&self, rule: &RedirectRule) -> Result<()> {
        sqlx::query(
            r"
            DELETE FROM redirects
            WHERE id = $1
            ",
        )
        .bind(rule.id)
        .execute(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_single_entity_by_id(
        &self,
        kind: EntityKind,
        id: &Uuid,
    ) -> Result<Option<Entity>> {
        let city_id = if kind == EntityKind::Area {
            "city_id"
        } else {
            "NULL::UUID AS city_id"
        };

        let query = format!(
            r"
            SELECT id, slug, {city_id}, created_at, updated_at, deleted_at
            FROM {table}
            WHERE id = $1
            LIMIT 1
            ",
            table = table_name(kind),
        );

        let entity = sqlx::query_as::<_, PostgresEntity>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(entity.map(|entity| Entity::from_postgres_entity(kind, entity)))
    }

    async fn archive_entity(&self, entity: &Entity, deleted_at: &NaiveDateTime) -> Result<()> {
        let query = format!(
            r"
            UPDATE {table}
            SET deleted_at = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            ",
            table = table_name(entity.kind),
        );

        sqlx::query(&query)
            .bind(deleted_at)
            .bind(entity.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn city_has_areas(&self, city: &Entity) -> Result<bool> {
        let has_areas = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM areas
                WHERE city_id = $1
            )
            ",
        )
        .bind(city.id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(has_areas)
    }

    async fn restore_entity(&self, entity: &Entity) -> Result<()> {
        let query = format!(
            r"
            UPDATE {table}
            SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            ",
            table = table_name(entity.kind),
        );

        sqlx::query(&query)
            .bind(entity.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn purge_entity(&self, entity: &Entity) -> Result<()> {
        let query = format!(
            r"
            DELETE FROM {table}
            WHERE id = $1
            ",
            table = table_name(entity.kind),
        );

        sqlx::query(&query)
            .bind(entity.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn register_audit_trail(
        &self,
        created_by: &Uuid,
        entry: &AuditEntry<'_>,
        ip_address: Option<&IpAddr>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO audit_trail
                (id, type, created_by, entity_type, entity_id, description, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(Uuid::new_v4())
        .bind(AuditEntryType::from_audit_entry(entry))
        .bind(created_by)
        .bind(entry.entity_type())
        .bind(entry.entity_id())
        .bind(entry.description())
        .bind(ip_address.map(|ip_address| IpNetwork::from(*ip_address)))
        .execute(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}

/// Convert `SQLx` to storage error
fn storage_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(database_error) = &err {
        if database_error.is_unique_violation() {
            return Error::Constraint(database_error.to_string());
        }
    }

    Error::Connection(err.to_string())
}
