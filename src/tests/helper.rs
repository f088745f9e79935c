use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tower::Service;
use uuid::Uuid;

use crate::api::JwtKeys;
use crate::create_router;
use crate::hooks::ServiceHooks;
use crate::storage::Memory;

const JWT_SECRET: &[u8] = b"verysecret";

/// Test helper version of a redirect rule
#[derive(Debug)]
pub struct Redirect {
    pub id: Uuid,
    pub url_old: String,
    pub url_new: String,
    pub is_placeholder: bool,
}

/// Test helper version of an archival outcome
#[derive(Debug, PartialEq, Eq)]
pub struct Outcome {
    pub action: String,
    pub redirect_created: bool,
}

/// Error response
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
    pub field: Option<String>,
}

/// Setup the Relocate app with an empty memory storage
///
/// The storage is returned as well, to seed entities and inspect the audit trail
pub fn setup_test_app() -> (Router, Memory) {
    let storage = Memory::new();

    let app = create_router(
        storage.clone(),
        Arc::new(ServiceHooks::default()),
        JwtKeys::new(JWT_SECRET),
    );

    (app, storage)
}

/// Create an access token for a user, signed with a secret
pub fn access_token_with_secret(user_id: &Uuid, expires_in: i64, secret: &[u8]) -> String {
    let claims = json!({
        "sub": user_id,
        "exp": Utc::now().timestamp() + expires_in,
    });

    let access_token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .unwrap();

    format!("Bearer {access_token}")
}

/// Create a valid access token for a user
pub fn access_token(user_id: &Uuid) -> String {
    access_token_with_secret(user_id, 3600, JWT_SECRET)
}

/// Create a valid access token for a random user
pub fn login() -> String {
    access_token(&Uuid::new_v4())
}

async fn send(app: &mut Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (status_code, body)
}

fn json_request(method: Method, uri: &str, access_token: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, access_token)
        .body(Body::empty())
        .unwrap()
}

fn redirect_payload(url_old: Option<&str>, url_new: Option<&str>) -> Map<String, Value> {
    let mut payload = Map::new();

    if let Some(url_old) = url_old {
        payload.insert("urlOld".to_string(), Value::String(url_old.to_string()));
    }

    if let Some(url_new) = url_new {
        payload.insert("urlNew".to_string(), Value::String(url_new.to_string()));
    }

    payload
}

pub async fn list_redirects(
    app: &mut Router,
    access_token: &str,
    query: &str,
) -> (StatusCode, Option<Vec<Redirect>>) {
    let uri = if query.is_empty() {
        "/api/redirects".to_string()
    } else {
        format!("/api/redirects?{query}")
    };

    let (status_code, body) = send(app, empty_request(Method::GET, &uri, access_token)).await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirects(&body))
        } else {
            None
        },
    )
}

pub async fn lookup_redirect(
    app: &mut Router,
    access_token: &str,
    path: &str,
) -> (StatusCode, Option<Redirect>) {
    // only URI safe paths are used, no encoding needed
    let (status_code, body) = send(
        app,
        empty_request(
            Method::GET,
            &format!("/api/redirects/lookup?path={path}"),
            access_token,
        ),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirect(&body))
        } else {
            None
        },
    )
}

pub async fn single_redirect(
    app: &mut Router,
    access_token: &str,
    id: &Uuid,
) -> (StatusCode, Option<Redirect>) {
    let (status_code, body) = send(
        app,
        empty_request(Method::GET, &format!("/api/redirects/{id}"), access_token),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirect(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_validate_redirect(
    app: &mut Router,
    access_token: &str,
    id: Option<&Uuid>,
    url_old: &str,
    url_new: &str,
) -> (StatusCode, Option<Error>) {
    let mut payload = redirect_payload(Some(url_old), Some(url_new));

    if let Some(id) = id {
        payload.insert("id".to_string(), Value::String(id.to_string()));
    }

    let (status_code, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/redirects/validate",
            access_token,
            &Value::Object(payload),
        ),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_redirect_with_optional_fields(
    app: &mut Router,
    access_token: &str,
    url_old: Option<&str>,
    url_new: Option<&str>,
) -> (StatusCode, Option<Redirect>, Option<Error>) {
    let payload = redirect_payload(url_old, url_new);

    let (status_code, body) = send(
        app,
        json_request(
            Method::POST,
            "/api/redirects",
            access_token,
            &Value::Object(payload),
        ),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_redirect(&body))
        } else {
            None
        },
        if status_code.is_client_error() || status_code.is_server_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_redirect(
    app: &mut Router,
    access_token: &str,
    url_old: &str,
    url_new: &str,
) -> (StatusCode, Option<Redirect>, Option<Error>) {
    maybe_create_redirect_with_optional_fields(app, access_token, Some(url_old), Some(url_new))
        .await
}

/// Create a redirect that has to succeed
pub async fn create_redirect(
    app: &mut Router,
    access_token: &str,
    url_old: &str,
    url_new: &str,
) -> Redirect {
    let (status_code, redirect, error) =
        maybe_create_redirect(app, access_token, url_old, url_new).await;
    assert_eq!(StatusCode::CREATED, status_code, "{error:?}");

    redirect.unwrap()
}

pub async fn maybe_create_redirect_with_raw_body(
    app: &mut Router,
    access_token: &str,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Error>) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/redirects");

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder
        .header(AUTHORIZATION, access_token)
        .body(Body::from(body.as_bytes()))
        .unwrap();

    let (status_code, body) = send(app, request).await;

    (
        status_code,
        if status_code == StatusCode::BAD_REQUEST {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_update_redirect(
    app: &mut Router,
    access_token: &str,
    id: &Uuid,
    url_old: Option<&str>,
    url_new: Option<&str>,
) -> (StatusCode, Option<Redirect>, Option<Error>) {
    let payload = redirect_payload(url_old, url_new);

    let (status_code, body) = send(
        app,
        json_request(
            Method::PATCH,
            &format!("/api/redirects/{id}"),
            access_token,
            &Value::Object(payload),
        ),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_redirect(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_delete_redirect(
    app: &mut Router,
    access_token: &str,
    id: &Uuid,
) -> (StatusCode, Option<Error>) {
    let (status_code, body) = send(
        app,
        empty_request(Method::DELETE, &format!("/api/redirects/{id}"), access_token),
    )
    .await;

    (
        status_code,
        if status_code.is_client_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

/// Delete a city, area or property, `collection` is the plural name used in the path
pub async fn maybe_delete_entity(
    app: &mut Router,
    access_token: &str,
    collection: &str,
    id: &str,
) -> (StatusCode, Option<Outcome>, Option<Error>) {
    let (status_code, body) = send(
        app,
        empty_request(
            Method::DELETE,
            &format!("/api/{collection}/{id}"),
            access_token,
        ),
    )
    .await;

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_outcome(&body))
        } else {
            None
        },
        if status_code.is_client_error() || status_code.is_server_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

fn value_to_redirect(redirect: &Map<String, Value>) -> Redirect {
    Redirect {
        id: redirect["id"].as_str().map(Uuid::parse_str).unwrap().unwrap(),
        url_old: redirect["urlOld"].as_str().map(ToString::to_string).unwrap(),
        url_new: redirect["urlNew"].as_str().map(ToString::to_string).unwrap(),
        is_placeholder: redirect["isPlaceholder"].as_bool().unwrap(),
    }
}

fn get_redirect(body: &Bytes) -> Redirect {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_redirect)
        .unwrap()
}

fn get_redirects(body: &Bytes) -> Vec<Redirect> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f.as_object().unwrap())
        .map(value_to_redirect)
        .collect()
}

fn get_outcome(body: &Bytes) -> Outcome {
    let outcome = &serde_json::from_slice::<Value>(&body[..]).unwrap()["data"];

    Outcome {
        action: outcome["action"].as_str().map(ToString::to_string).unwrap(),
        redirect_created: outcome["redirectCreated"].as_bool().unwrap(),
    }
}

fn value_to_error(error: &Map<String, Value>) -> Error {
    Error {
        error: error["error"].as_str().map(ToString::to_string).unwrap(),
        description: error
            .get("description")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        field: error
            .get("field")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    }
}

fn get_error(body: &Bytes) -> Error {
    serde_json::from_slice::<Value>(&body[..])
        .unwrap()
        .as_object()
        .map(value_to_error)
        .unwrap()
}
