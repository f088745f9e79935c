//! Collaborators that run after an entity is archived or purged
//!
//! Their failures are logged by the caller and never undo an archival or a purge.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;

use crate::entities::Entity;

/// Work that follows a successful archival or purge
#[async_trait]
pub trait Hooks: Send + Sync {
    /// Ask for the sitemap to be regenerated
    async fn regenerate_sitemap(&self) -> Result<()>;

    /// Remove the media files of a purged entity
    async fn delete_media(&self, entity: &Entity) -> Result<()>;
}

/// Hooks of the running service
///
/// Media lives in `{media_root}/{entity-type}/{entity-id}`, without a media root there is nothing
/// to remove. The sitemap itself is built elsewhere, the request is only logged.
#[derive(Debug, Default)]
pub struct ServiceHooks {
    /// Root directory of all media
    media_root: Option<PathBuf>,
}

impl ServiceHooks {
    /// Create the hooks with an optional media root
    pub fn new(media_root: Option<PathBuf>) -> Self {
        Self { media_root }
    }
}

#[async_trait]
impl Hooks for ServiceHooks {
    async fn regenerate_sitemap(&self) -> Result<()> {
        tracing::info!("Sitemap regeneration requested");

        Ok(())
    }

    async fn delete_media(&self, entity: &Entity) -> Result<()> {
        let Some(media_root) = &self.media_root else {
            return Ok(());
        };

        let directory = media_root
            .join(entity.kind.as_str())
            .join(entity.id.to_string());

        match tokio::fs::remove_dir_all(&directory).await {
            Ok(()) => {
                tracing::debug!("Removed media directory {}", directory.display());

                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| {
                format!("Could not remove media directory {}", directory.display())
            }),
        }
    }
}
