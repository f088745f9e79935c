//! Redirect rules

use chrono::naive::NaiveDateTime;
use uuid::Uuid;

/// A mapping from an old path to its new location
#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct RedirectRule {
    /// Rule ID
    pub id: Uuid,

    /// Normalized source path
    pub url_old: String,

    /// Normalized destination path, empty for placeholders
    pub url_new: String,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl RedirectRule {
    /// Is the rule a placeholder still waiting for a destination?
    pub fn is_placeholder(&self) -> bool {
        self.url_new.is_empty()
    }
}

/// Filter for listing redirect rules
#[derive(Debug, Default)]
pub struct RedirectFilter {
    /// Substring matched against both the old and the new URL
    pub search: Option<String>,

    /// Only rules without a destination
    pub placeholders_only: bool,
}

impl RedirectFilter {
    /// Does the rule pass the filter?
    pub fn matches(&self, rule: &RedirectRule) -> bool {
        if self.placeholders_only && !rule.is_placeholder() {
            return false;
        }

        match &self.search {
            Some(search) if !search.is_empty() => {
                let search = search.to_lowercase();

                rule.url_old.contains(&search) || rule.url_new.contains(&search)
            }
            _ => true,
        }
    }
}
