//! Redirect graph validation
//!
//! Checks a candidate rule against the current rule set before it is persisted. Checks run in a
//! fixed order and the first failure is returned.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::paths::normalize;
use crate::paths::same_path;
use crate::redirects::RedirectRule;

/// Field of a rule an error points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Field {
    /// The source of the rule
    #[serde(rename = "urlOld")]
    UrlOld,

    /// The destination of the rule
    #[serde(rename = "urlNew")]
    UrlNew,
}

/// Reasons a candidate rule is rejected
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Old URL is required")]
    MissingSource,

    #[error("New URL is required")]
    MissingDestination,

    #[error("Old and new URL can not be the same")]
    SelfRedirect,

    #[error("A redirect for this old URL already exists")]
    DuplicateSource,

    /// Resolving the rule would take more than one hop
    #[error("{}", chained_message(.0))]
    ChainedRedirect(Field),

    #[error("Rule would create a redirect loop")]
    RedirectLoop,
}

fn chained_message(field: &Field) -> &'static str {
    match field {
        Field::UrlNew => "New URL already exists as old URL of another redirect",
        Field::UrlOld => "Old URL is already the new URL of another redirect",
    }
}

impl ValidationError {
    /// The field the admin has to correct
    pub fn field(&self) -> Field {
        match self {
            Self::MissingDestination | Self::RedirectLoop => Field::UrlNew,
            Self::ChainedRedirect(field) => *field,
            Self::MissingSource | Self::SelfRedirect | Self::DuplicateSource => Field::UrlOld,
        }
    }
}

/// A rule waiting to be validated
#[derive(Debug)]
pub struct Candidate<'a> {
    /// Raw source
    pub url_old: &'a str,

    /// Raw destination
    pub url_new: &'a str,
}

/// Validate a candidate rule against the existing rules
///
/// `exclude_id` is the rule being edited, it is ignored so it does not conflict with itself.
/// Placeholders (rules without destination) never take part in chains or loops.
pub fn validate(
    candidate: &Candidate,
    existing: &[RedirectRule],
    exclude_id: Option<&Uuid>,
) -> Result<(), ValidationError> {
    if candidate.url_old.trim().is_empty() {
        return Err(ValidationError::MissingSource);
    }

    if candidate.url_new.trim().is_empty() {
        return Err(ValidationError::MissingDestination);
    }

    let url_old = normalize(candidate.url_old);
    let url_new = normalize(candidate.url_new);

    if url_old == url_new {
        return Err(ValidationError::SelfRedirect);
    }

    let others = existing
        .iter()
        .filter(|rule| exclude_id != Some(&rule.id))
        .collect::<Vec<_>>();

    if others.iter().any(|rule| same_path(&rule.url_old, &url_old)) {
        return Err(ValidationError::DuplicateSource);
    }

    if creates_loop(&url_old, &url_new, &others) {
        return Err(ValidationError::RedirectLoop);
    }

    if others.iter().any(|rule| same_path(&rule.url_old, &url_new)) {
        return Err(ValidationError::ChainedRedirect(Field::UrlNew));
    }

    if others
        .iter()
        .any(|rule| !rule.is_placeholder() && same_path(&rule.url_new, &url_old))
    {
        return Err(ValidationError::ChainedRedirect(Field::UrlOld));
    }

    Ok(())
}

/// Does following the rules from `url_old` lead back to it?
///
/// The walk is bounded by the number of edges, so malformed data can not keep it going.
fn creates_loop(url_old: &str, url_new: &str, others: &[&RedirectRule]) -> bool {
    let mut edges = others
        .iter()
        .filter(|rule| !rule.is_placeholder())
        .map(|rule| (normalize(&rule.url_old), normalize(&rule.url_new)))
        .collect::<HashMap<_, _>>();

    edges.insert(url_old.to_string(), url_new.to_string());

    let mut visited = HashSet::new();
    let mut current = url_old;

    for _ in 0..=edges.len() {
        let Some(next) = edges.get(current) else {
            return false;
        };

        if next == url_old {
            return true;
        }

        if !visited.insert(next.as_str()) {
            return false;
        }

        current = next.as_str();
    }

    false
}
