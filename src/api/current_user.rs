//! Current user service
//!
//! Get the current user from the request based on the Authorization header. Users and their
//! sessions are managed elsewhere, tokens are only verified here.

use axum::Extension;
use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::Error;

/// The keys used for decoding JWT tokens
#[derive(Clone)]
pub struct JwtKeys {
    /// The decoding key
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Create the decoding key, derived from the shared secret
    pub fn new(secret: &[u8]) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// The JWT claims to identifies a user
#[derive(Debug, Deserialize)]
struct Claims {
    /// The user ID
    sub: Uuid,

    /// When the token expires, checked by the validation
    #[allow(dead_code)]
    exp: i64,
}

/// The admin doing the request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    /// The user ID, as known by the authentication service
    pub id: Uuid,
}

impl<B> FromRequestParts<B> for CurrentUser
where
    B: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &B) -> Result<Self, Self::Rejection> {
        use jsonwebtoken::Validation;
        use jsonwebtoken::decode;

        // Extract the token from the authorization header
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Error::forbidden("Missing API token"))?;

        let Extension(jwt_keys) = parts
            .extract::<Extension<JwtKeys>>()
            .await
            .map_err(|_| Error::internal_server_error("Could not get JWT keys"))?;

        let validation = Validation::default();

        let token_data = decode::<Claims>(bearer.token(), &jwt_keys.decoding, &validation)
            .map_err(|err| Error::forbidden(format!("Invalid token: {err}")))?;

        Ok(CurrentUser {
            id: token_data.claims.sub,
        })
    }
}
