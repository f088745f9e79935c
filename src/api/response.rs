//! API response helpers

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Serialize;

use crate::archival;
use crate::storage;
use crate::validation::Field;
use crate::validation::ValidationError;

const REDIRECT_CREATION_FAILED: &str =
    "Could not create the redirect for the archived entity, add the redirect manually";

/// Hold data for a successful API interaction
pub struct Success<V>
where
    V: Serialize,
{
    status_code: StatusCode,
    data: Option<V>,
}

impl<V> Success<V>
where
    V: Serialize,
{
    pub fn ok(data: V) -> Self {
        Self {
            status_code: StatusCode::OK,
            data: Some(data),
        }
    }

    pub fn created(data: V) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            data: Some(data),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status_code: StatusCode::NO_CONTENT,
            data: None,
        }
    }
}

#[derive(Serialize)]
struct DataWrapper<D>
where
    D: Serialize,
{
    data: D,
}

impl<V> IntoResponse for Success<V>
where
    V: Serialize,
{
    fn into_response(self) -> Response {
        if let Some(data) = self.data {
            (self.status_code, Json(DataWrapper { data })).into_response()
        } else {
            self.status_code.into_response()
        }
    }
}

/// Hold data for a failed API interaction
#[derive(Debug)]
pub struct Error {
    status_code: StatusCode,
    message: String,
    description: Option<String>,
    field: Option<Field>,
}

impl Error {
    fn new<M>(status_code: StatusCode, message: M) -> Self
    where
        M: ToString,
    {
        Self {
            status_code,
            message: message.to_string(),
            description: None,
            field: None,
        }
    }

    pub fn bad_request<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal_server_error<M>(message: M) -> Self
    where
        M: ToString,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_description<M>(self, description: M) -> Self
    where
        M: ToString,
    {
        Self {
            description: Some(description.to_string()),
            ..self
        }
    }

    /// Point the admin at the field to correct
    pub fn with_field(self, field: Field) -> Self {
        Self {
            field: Some(field),
            ..self
        }
    }
}

#[derive(Serialize)]
struct ErrorWrapper {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<Field>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (
            self.status_code,
            Json(ErrorWrapper {
                error: self.message,
                description: self.description,
                field: self.field,
            }),
        )
            .into_response()
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(&err).with_field(err.field())
    }
}

impl From<storage::Error> for Error {
    fn from(err: storage::Error) -> Self {
        tracing::error!("Storage error: {err}");

        Self::internal_server_error("An error occurred")
    }
}

impl From<archival::Error> for Error {
    fn from(err: archival::Error) -> Self {
        match err {
            archival::Error::EntityNotFound(kind) => {
                Self::not_found(format!("{} not found", kind.title()))
            }
            archival::Error::CityHasAreas => {
                Self::conflict(archival::Error::CityHasAreas)
                    .with_description("Delete the areas of the city first")
            }
            archival::Error::RedirectCreationFailed { url, source } => {
                tracing::error!("Could not create the redirect for {url}: {source}");

                Self::internal_server_error(REDIRECT_CREATION_FAILED).with_description(url)
            }
            archival::Error::Storage(err) => err.into(),
        }
    }
}
