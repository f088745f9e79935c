//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::AtomicBool;
#[cfg(test)]
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use chrono::Utc;
use tokio::sync::Mutex;
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

/// A registered audit trail entry
#[derive(Clone, Debug)]
#[cfg_attr(not(test), allow(dead_code))]
pub struct AuditRecord {
    /// The user that did the action
    pub created_by: Uuid,

    /// Action name, like `archive-entity`
    pub action: &'static str,

    /// Type of the entity
    pub entity_type: &'static str,

    /// ID of the entity
    pub entity_id: Uuid,

    /// Human readable description
    pub description: String,

    /// IP address of the user, when known
    pub ip_address: Option<IpAddr>,

    /// Moment of registration
    pub created_at: NaiveDateTime,
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug)]
pub struct Memory {
    /// All redirect rules in storage
    redirects: Arc<Mutex<HashMap<Uuid, RedirectRule>>>,

    /// All cities, areas and properties in storage
    entities: Arc<Mutex<HashMap<Uuid, Entity>>>,

    /// The audit trail
    audit_trail: Arc<Mutex<Vec<AuditRecord>>>,

    /// Make every redirect creation fail
    #[cfg(test)]
    fail_redirect_creation: Arc<AtomicBool>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self {
            redirects: Arc::new(Mutex::new(HashMap::new())),
            entities: Arc::new(Mutex::new(HashMap::new())),
            audit_trail: Arc::new(Mutex::new(Vec::new())),
            #[cfg(test)]
            fail_redirect_creation: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[cfg(test)]
impl Memory {
    /// Add an entity directly, creating content is not part of this service
    pub async fn insert_entity(
        &self,
        kind: EntityKind,
        slug: &str,
        city_id: Option<Uuid>,
        created_at: NaiveDateTime,
    ) -> Entity {
        let entity = Entity {
            id: Uuid::new_v4(),
            kind,
            slug: slug.to_string(),
            city_id,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };

        self.entities
            .lock()
            .await
            .insert(entity.id, entity.clone());

        entity
    }

    /// Get the current state of an entity, including archived ones
    pub async fn entity(&self, id: &Uuid) -> Option<Entity> {
        self.entities.lock().await.get(id).cloned()
    }

    /// All redirect rules, without any filter
    pub async fn redirects(&self) -> Vec<RedirectRule> {
        self.redirects.lock().await.values().cloned().collect()
    }

    /// The audit trail, oldest entry first
    pub async fn audit_trail(&self) -> Vec<AuditRecord> {
        self.audit_trail.lock().await.clone()
    }

    /// Let every following redirect creation fail, or recover from it
    pub fn fail_redirect_creation(&self, fail: bool) {
        self.fail_redirect_creation.store(fail, Ordering::SeqCst);
    }
}

impl Memory {
    /// Fail when the tests asked for it
    #[cfg(test)]
    fn ensure_redirect_creation_allowed(&self) -> Result<()> {
        if self.fail_redirect_creation.load(Ordering::SeqCst) {
            return Err(Error::Connection("Redirect creation disabled".to_string()));
        }

        Ok(())
    }

    #[cfg(not(test))]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    fn ensure_redirect_creation_allowed(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Storage for Memory {
    async fn find_all_redirects(&self, filter: &RedirectFilter) -> Result<Vec<RedirectRule>> {
        let mut redirects = self
            .redirects
            .lock()
            .await
            .values()
            .filter(|rule| filter.matches(rule))
            .cloned()
            .collect::<Vec<_>>();

        redirects.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.url_old.cmp(&b.url_old))
        });

        Ok(redirects)
    }

    async fn find_single_redirect_by_id(&self, id: &Uuid) -> Result<Option<RedirectRule>> {
        Ok(self.redirects.lock().await.get(id).cloned())
    }

    async fn find_single_redirect_by_normalized_url_old(
        &self,
        url_old: &str,
    ) -> Result<Option<RedirectRule>> {
        Ok(self
            .redirects
            .lock()
            .await
            .values()
            .find(|rule| rule.url_old == url_old)
            .cloned())
    }

    async fn create_redirect(&self, values: &RedirectValues) -> Result<RedirectRule> {
        self.ensure_redirect_creation_allowed()?;

        let mut redirects = self.redirects.lock().await;

        if redirects
            .values()
            .any(|rule| rule.url_old == values.url_old)
        {
            return Err(Error::Constraint(format!(
                "Redirect for {} already exists",
                values.url_old
            )));
        }

        let rule = RedirectRule {
            id: Uuid::new_v4(),
            url_old: values.url_old.clone(),
            url_new: values.url_new.clone(),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        redirects.insert(rule.id, rule.clone());

        Ok(rule)
    }

    async fn update_redirect(
        &self,
        rule: &RedirectRule,
        values: &RedirectValues,
    ) -> Result<Option<RedirectRule>> {
        let mut redirects = self.redirects.lock().await;

        if redirects
            .values()
            .any(|other| other.id != rule.id && other.url_old == values.url_old)
        {
            return Err(Error::Constraint(format!(
                "Redirect for {} already exists",
                values.url_old
            )));
        }

        let Some(stored) = redirects.get_mut(&rule.id) else {
            return Ok(None);
        };

        stored.url_old.clone_from(&values.url_old);
        stored.url_new.clone_from(&values.url_new);
        stored.updated_at = Utc::now().naive_utc();

        Ok(Some(stored.clone()))
    }

    async fn delete_redirect(&self, rule: &RedirectRule) -> Result<()> {
        self.redirects.lock().await.remove(&rule.id);

        Ok(())
    }

    async fn find_single_entity_by_id(
        &self,
        kind: EntityKind,
        id: &Uuid,
    ) -> Result<Option<Entity>> {
        Ok(self
            .entities
            .lock()
            .await
            .get(id)
            .filter(|entity| entity.kind == kind)
            .cloned())
    }

    async fn archive_entity(&self, entity: &Entity, deleted_at: &NaiveDateTime) -> Result<()> {
        if let Some(entity) = self.entities.lock().await.get_mut(&entity.id) {
            entity.deleted_at = Some(*deleted_at);
        }

        Ok(())
    }

    async fn city_has_areas(&self, city: &Entity) -> Result<bool> {
        Ok(self
            .entities
            .lock()
            .await
            .values()
            .any(|entity| entity.kind == EntityKind::Area && entity.city_id == Some(city.id)))
    }

    async fn restore_entity(&self, entity: &Entity) -> Result<()> {
        if let Some(entity) = self.entities.lock().await.get_mut(&entity.id) {
            entity.deleted_at = None;
        }

        Ok(())
    }

    async fn purge_entity(&self, entity: &Entity) -> Result<()> {
        self.entities.lock().await.remove(&entity.id);

        Ok(())
    }

    async fn register_audit_trail(
        &self,
        created_by: &Uuid,
        entry: &AuditEntry<'_>,
        ip_address: Option<&IpAddr>,
    ) -> Result<()> {
        let record = AuditRecord {
            created_by: *created_by,
            action: entry.action(),
            entity_type: entry.entity_type(),
            entity_id: entry.entity_id(),
            description: entry.description(),
            ip_address: ip_address.copied(),
            created_at: Utc::now().naive_utc(),
        };

        tracing::debug!(
            "Audit trail: {} {} {}",
            record.action,
            record.entity_type,
            record.entity_id
        );

        self.audit_trail.lock().await.push(record);

        Ok(())
    }
}
