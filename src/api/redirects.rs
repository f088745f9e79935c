//! Redirects API endpoints
//!
//! Everything related to the management of redirect rules. Every create and update is validated
//! against the full current rule set before it is persisted.

use axum::Extension;
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::audit_trail::AuditTrail;
use crate::redirects::RedirectFilter;
use crate::redirects::RedirectRule;
use crate::storage;
use crate::storage::AuditEntry;
use crate::storage::RedirectValues;
use crate::storage::Storage;
use crate::validation::Candidate;
use crate::validation::ValidationError;
use crate::validation::validate;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::parse_flag;

/// Redirect response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectResponse {
    /// Redirect ID
    pub id: Uuid,

    /// Normalized source
    pub url_old: String,

    /// Normalized destination, empty for placeholders
    pub url_new: String,

    /// Still waiting for a destination?
    pub is_placeholder: bool,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl RedirectResponse {
    /// Create a response from a [`RedirectRule`](RedirectRule)
    fn from_rule(rule: RedirectRule) -> Self {
        Self {
            id: rule.id,
            is_placeholder: rule.is_placeholder(),
            url_old: rule.url_old,
            url_new: rule.url_new,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// Query parameters of the list
#[derive(Debug, Deserialize)]
pub struct ListParameters {
    /// Substring of the old or new URL
    search: Option<String>,

    /// Only placeholders, a loosely typed flag
    placeholders: Option<String>,
}

/// List all redirects, newest first
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:6000/api/redirects?search=villa&placeholders=1'
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": "<uuid>", "urlOld": "/properties/villa-1", "urlNew": "" ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser,
    QueryParameters(parameters): QueryParameters<ListParameters>,
) -> Result<Success<Vec<RedirectResponse>>, Error> {
    let filter = RedirectFilter {
        search: parameters.search,
        placeholders_only: parameters.placeholders.as_deref().is_some_and(parse_flag),
    };

    let rules = storage.find_all_redirects(&filter).await?;

    Ok(Success::ok(
        rules.into_iter().map(RedirectResponse::from_rule).collect(),
    ))
}

/// Query parameters of the lookup
#[derive(Debug, Deserialize)]
pub struct LookupParameters {
    /// Raw path or full URL
    path: String,
}

/// Find the redirect for an old path, the path is normalized first
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:6000/api/redirects/lookup?path=https://www.example.com/Old-Page/'
/// ```
///
/// Response:
/// ```json
/// { "data": { "id": "<uuid>", "urlOld": "/old-page", "urlNew": "/new-page" ... } }
/// ```
pub async fn lookup<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser,
    QueryParameters(parameters): QueryParameters<LookupParameters>,
) -> Result<Success<RedirectResponse>, Error> {
    storage
        .find_single_redirect_by_url_old(&parameters.path)
        .await?
        .map(|rule| Success::ok(RedirectResponse::from_rule(rule)))
        .ok_or_else(|| Error::not_found("Redirect not found"))
}

/// Get a single redirect
///
/// Request:
/// ```sh
/// curl -v -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/redirects/<uuid>
/// ```
pub async fn single<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser,
    PathParameters(redirect_id): PathParameters<Uuid>,
) -> Result<Success<RedirectResponse>, Error> {
    fetch_redirect(&storage, &redirect_id)
        .await
        .map(|rule| Success::ok(RedirectResponse::from_rule(rule)))
}

/// Validate redirect form
///
/// Dry-run of a create or, with an `id`, of an update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRedirectForm {
    /// Rule being edited, ignored during validation
    id: Option<Uuid>,

    /// Source to validate
    url_old: Option<String>,

    /// Destination to validate
    url_new: Option<String>,
}

/// Validate a rule without saving it
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "urlOld": "/b", "urlNew": "/a" }' \
///     http://localhost:6000/api/redirects/validate
/// ```
///
/// Response, when invalid:
/// ```json
/// { "error": "Rule would create a redirect loop", "field": "urlNew" }
/// ```
pub async fn validate_only<S: Storage>(
    Extension(storage): Extension<S>,
    _current_user: CurrentUser,
    Form(form): Form<ValidateRedirectForm>,
) -> Result<Success<&'static str>, Error> {
    let candidate = Candidate {
        url_old: form.url_old.as_deref().unwrap_or_default(),
        url_new: form.url_new.as_deref().unwrap_or_default(),
    };

    validate_candidate(&storage, &candidate, form.id.as_ref()).await?;

    Ok(Success::no_content())
}

/// Create redirect form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRedirectForm {
    /// Old path or URL, normalized before saving
    url_old: Option<String>,

    /// New path or URL, normalized before saving
    url_new: Option<String>,
}

/// Create a redirect based on the [`CreateRedirectForm`](CreateRedirectForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "urlOld": "/Old-Page/", "urlNew": "https://www.example.com/new-page" }' \
///     http://localhost:6000/api/redirects
/// ```
///
/// Response
/// ```json
/// { "data": { "id": "<uuid>", "urlOld": "/old-page", "urlNew": "/new-page" ... } }
/// ```
pub async fn create<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    Form(form): Form<CreateRedirectForm>,
) -> Result<Success<RedirectResponse>, Error> {
    let candidate = Candidate {
        url_old: form.url_old.as_deref().unwrap_or_default(),
        url_new: form.url_new.as_deref().unwrap_or_default(),
    };

    validate_candidate(&storage, &candidate, None).await?;

    let values = RedirectValues::new(candidate.url_old, candidate.url_new);

    let rule = storage
        .create_redirect(&values)
        .await
        .map_err(write_error)?;

    tracing::debug!("Created redirect {} -> {}", rule.url_old, rule.url_new);

    audit_trail
        .register(AuditEntry::CreateRedirect(&rule))
        .await;

    Ok(Success::created(RedirectResponse::from_rule(rule)))
}

/// Update redirect form
///
/// Fields are optional, missing fields keep their stored value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRedirectForm {
    /// New source
    url_old: Option<String>,

    /// New destination, completes a placeholder
    url_new: Option<String>,
}

/// Update a redirect based on the [`UpdateRedirectForm`](UpdateRedirectForm) form
///
/// The result is validated as a whole, ignoring the rule itself
///
/// Request:
/// ```sh
/// curl -v -XPATCH -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "urlNew": "/properties" }' \
///     http://localhost:6000/api/redirects/<uuid>
/// ```
///
/// Response
/// ```json
/// { "data": { "id": "<uuid>", "urlOld": "/properties/villa-1", "urlNew": "/properties" ... } }
/// ```
pub async fn update<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    PathParameters(redirect_id): PathParameters<Uuid>,
    Form(form): Form<UpdateRedirectForm>,
) -> Result<Success<RedirectResponse>, Error> {
    let rule = fetch_redirect(&storage, &redirect_id).await?;

    let candidate = Candidate {
        url_old: form.url_old.as_deref().unwrap_or(&rule.url_old),
        url_new: form.url_new.as_deref().unwrap_or(&rule.url_new),
    };

    validate_candidate(&storage, &candidate, Some(&rule.id)).await?;

    let values = RedirectValues::new(candidate.url_old, candidate.url_new);

    let updated_rule = storage
        .update_redirect(&rule, &values)
        .await
        .map_err(write_error)?
        .ok_or_else(|| Error::not_found("Redirect not found"))?;

    tracing::debug!(
        "Updated redirect {}: {} -> {}",
        updated_rule.id,
        updated_rule.url_old,
        updated_rule.url_new
    );

    audit_trail
        .register(AuditEntry::UpdateRedirect(&updated_rule))
        .await;

    Ok(Success::ok(RedirectResponse::from_rule(updated_rule)))
}

/// Delete a redirect
///
/// Request:
/// ```sh
/// curl -v -XDELETE \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:6000/api/redirects/<uuid>
/// ```
pub async fn delete<S: Storage>(
    audit_trail: AuditTrail<S>,
    Extension(storage): Extension<S>,
    PathParameters(redirect_id): PathParameters<Uuid>,
) -> Result<Success<&'static str>, Error> {
    let rule = fetch_redirect(&storage, &redirect_id).await?;

    storage.delete_redirect(&rule).await?;

    tracing::debug!("Deleted redirect {} -> {}", rule.url_old, rule.url_new);

    audit_trail
        .register(AuditEntry::DeleteRedirect(&rule))
        .await;

    Ok(Success::<&'static str>::no_content())
}

/// Validate a candidate against a fresh snapshot of all rules
async fn validate_candidate<S: Storage>(
    storage: &S,
    candidate: &Candidate<'_>,
    exclude_id: Option<&Uuid>,
) -> Result<(), Error> {
    let existing = storage
        .find_all_redirects(&RedirectFilter::default())
        .await?;

    validate(candidate, &existing, exclude_id).map_err(Error::from)
}

/// A concurrent write can still claim the same source, the storage catches it
fn write_error(err: storage::Error) -> Error {
    match err {
        storage::Error::Constraint(_) => ValidationError::DuplicateSource.into(),
        err => err.into(),
    }
}

/// Fetch redirect from storage
async fn fetch_redirect<S: Storage>(
    storage: &S,
    redirect_id: &Uuid,
) -> Result<RedirectRule, Error> {
    storage
        .find_single_redirect_by_id(redirect_id)
        .await?
        .map_or_else(|| Err(Error::not_found("Redirect not found")), Ok)
}
