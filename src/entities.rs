//! Archivable content entities: cities, areas and properties

use std::fmt;

use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// The kinds of entities that are archived with a redirect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// A city landing page
    City,

    /// An area landing page, always part of a city
    Area,

    /// A property listing
    Property,
}

impl EntityKind {
    /// Name used in the audit trail and for media directories
    pub fn as_str(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Area => "area",
            Self::Property => "property",
        }
    }

    /// Name shown to the admin
    pub fn title(self) -> &'static str {
        match self {
            Self::City => "City",
            Self::Area => "Area",
            Self::Property => "Property",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A city, area or property
#[derive(Clone, Debug)]
pub struct Entity {
    /// Entity ID
    pub id: Uuid,

    /// Kind of the entity
    pub kind: EntityKind,

    /// Slug used in the public URL
    pub slug: String,

    /// City of an area, `None` for other kinds
    pub city_id: Option<Uuid>,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,

    /// Archived at
    pub deleted_at: Option<NaiveDateTime>,
}

impl Entity {
    /// Is the entity archived?
    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Public URL of the entity
    ///
    /// Areas live below their city, so the city has to be provided for them.
    pub fn public_url(&self, city: Option<&Entity>) -> Option<String> {
        match self.kind {
            EntityKind::Property => Some(format!("/properties/{}", self.slug)),
            EntityKind::City => Some(format!("/community/{}", self.slug)),
            EntityKind::Area => {
                city.map(|city| format!("/community/{}/{}", city.slug, self.slug))
            }
        }
    }
}
