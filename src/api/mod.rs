//! All API endpoint setup

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;

use crate::storage::Storage;

pub use current_user::CurrentUser;
pub use current_user::JwtKeys;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use request::parse_flag;
pub use response::Error;
pub use response::Success;

mod audit_trail;
mod current_user;
mod entities;
mod redirects;
mod request;
mod response;

/// Get the Axum router for all API routes
pub fn router<S: Storage>() -> Router {
    let redirects = Router::new()
        .route("/", get(redirects::list::<S>).post(redirects::create::<S>))
        .route("/lookup", get(redirects::lookup::<S>))
        .route("/validate", post(redirects::validate_only::<S>))
        .route(
            "/{redirect}",
            get(redirects::single::<S>)
                .patch(redirects::update::<S>)
                .delete(redirects::delete::<S>),
        );

    Router::new()
        .nest("/redirects", redirects)
        .route("/cities/{city}", delete(entities::delete_city::<S>))
        .route("/areas/{area}", delete(entities::delete_area::<S>))
        .route("/properties/{property}", delete(entities::delete_property::<S>))
}
