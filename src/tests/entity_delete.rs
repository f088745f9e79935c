use axum::http::StatusCode;
use chrono::TimeDelta;
use chrono::Utc;
use uuid::Uuid;

use crate::entities::EntityKind;
use crate::tests::helper;

#[tokio::test]
async fn test_delete_young_property() {
    let (mut app, storage) = helper::setup_test_app();

    let access_token = helper::login();

    let property = storage
        .insert_entity(
            EntityKind::Property,
            "villa-1",
            None,
            Utc::now().naive_utc() - TimeDelta::hours(2),
        )
        .await;

    let (status_code, outcome, _) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "properties",
        &property.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        helper::Outcome {
            action: "purged".to_string(),
            redirect_created: false,
        },
        outcome.unwrap()
    );

    assert!(storage.entity(&property.id).await.is_none());
    assert!(storage.redirects().await.is_empty());
}

#[tokio::test]
async fn test_archive_then_purge_property() {
    let (mut app, storage) = helper::setup_test_app();

    let user_id = Uuid::new_v4();
    let access_token = helper::access_token(&user_id);

    let property = storage
        .insert_entity(
            EntityKind::Property,
            "villa-1",
            None,
            Utc::now().naive_utc() - TimeDelta::days(30),
        )
        .await;
    let id = property.id.to_string();

    let (status_code, outcome, _) =
        helper::maybe_delete_entity(&mut app, &access_token, "properties", &id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        helper::Outcome {
            action: "archived".to_string(),
            redirect_created: true,
        },
        outcome.unwrap()
    );
    assert!(storage.entity(&property.id).await.unwrap().is_archived());

    let (status_code, placeholder) =
        helper::lookup_redirect(&mut app, &access_token, "/properties/villa-1").await;
    assert_eq!(StatusCode::OK, status_code);
    let placeholder = placeholder.unwrap();
    assert!(placeholder.is_placeholder);
    assert_eq!("", placeholder.url_new);

    let (status_code, outcome, _) =
        helper::maybe_delete_entity(&mut app, &access_token, "properties", &id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        helper::Outcome {
            action: "purged".to_string(),
            redirect_created: false,
        },
        outcome.unwrap()
    );
    assert!(storage.entity(&property.id).await.is_none());

    // still exactly one redirect for the old URL
    let (_, redirects) = helper::list_redirects(&mut app, &access_token, "placeholders=1").await;
    let redirects = redirects.unwrap();
    assert_eq!(1, redirects.len());
    assert_eq!(placeholder.id, redirects[0].id);

    let (status_code, _, error) =
        helper::maybe_delete_entity(&mut app, &access_token, "properties", &id).await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("Property not found", error.unwrap().error);

    let trail = storage.audit_trail().await;
    let actions = trail.iter().map(|record| record.action).collect::<Vec<_>>();
    assert_eq!(
        vec!["create-redirect", "archive-entity", "purge-entity"],
        actions
    );
    assert!(trail.iter().all(|record| record.created_by == user_id));
}

#[tokio::test]
async fn test_archive_area() {
    let (mut app, storage) = helper::setup_test_app();

    let access_token = helper::login();

    let created_at = Utc::now().naive_utc() - TimeDelta::days(400);
    let city = storage
        .insert_entity(EntityKind::City, "Dubai", None, created_at)
        .await;
    let area = storage
        .insert_entity(EntityKind::Area, "Marina", Some(city.id), created_at)
        .await;

    let (status_code, outcome, _) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "areas",
        &area.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(outcome.unwrap().redirect_created);

    let (status_code, redirect) =
        helper::lookup_redirect(&mut app, &access_token, "/community/dubai/marina").await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(redirect.unwrap().is_placeholder);

    // an area is no city
    let (status_code, _, error) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "cities",
        &area.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, status_code);
    assert_eq!("City not found", error.unwrap().error);
}

#[tokio::test]
async fn test_purge_city_with_areas() {
    let (mut app, storage) = helper::setup_test_app();

    let access_token = helper::login();

    let created_at = Utc::now().naive_utc() - TimeDelta::days(10);
    let city = storage
        .insert_entity(EntityKind::City, "dubai", None, created_at)
        .await;
    let area = storage
        .insert_entity(EntityKind::Area, "marina", Some(city.id), created_at)
        .await;
    let city_id = city.id.to_string();
    let area_id = area.id.to_string();

    let (status_code, outcome, _) =
        helper::maybe_delete_entity(&mut app, &access_token, "cities", &city_id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("archived", outcome.unwrap().action);

    let (status_code, _, error) =
        helper::maybe_delete_entity(&mut app, &access_token, "cities", &city_id).await;
    assert_eq!(StatusCode::CONFLICT, status_code);
    let error = error.unwrap();
    assert_eq!("City still has areas", error.error);
    assert_eq!(
        Some("Delete the areas of the city first".to_string()),
        error.description
    );
    assert!(storage.entity(&city.id).await.is_some());

    // the area can still be archived and purged under its archived city
    for action in ["archived", "purged"] {
        let (status_code, outcome, _) =
            helper::maybe_delete_entity(&mut app, &access_token, "areas", &area_id).await;
        assert_eq!(StatusCode::OK, status_code);
        assert_eq!(action, outcome.unwrap().action);
    }

    let (status_code, outcome, _) =
        helper::maybe_delete_entity(&mut app, &access_token, "cities", &city_id).await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("purged", outcome.unwrap().action);
    assert!(storage.entity(&city.id).await.is_none());

    let (status_code, redirect) =
        helper::lookup_redirect(&mut app, &access_token, "/community/dubai/marina").await;
    assert_eq!(StatusCode::OK, status_code);
    assert!(redirect.unwrap().is_placeholder);
}

#[tokio::test]
async fn test_archive_keeps_existing_redirect() {
    let (mut app, storage) = helper::setup_test_app();

    let access_token = helper::login();

    let existing =
        helper::create_redirect(&mut app, &access_token, "/community/abu-dhabi", "/community")
            .await;

    let city = storage
        .insert_entity(
            EntityKind::City,
            "abu-dhabi",
            None,
            Utc::now().naive_utc() - TimeDelta::days(2),
        )
        .await;

    let (status_code, outcome, _) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "cities",
        &city.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!(
        helper::Outcome {
            action: "archived".to_string(),
            redirect_created: false,
        },
        outcome.unwrap()
    );

    let (_, redirects) = helper::list_redirects(&mut app, &access_token, "").await;
    let redirects = redirects.unwrap();
    assert_eq!(1, redirects.len());
    assert_eq!(existing.id, redirects[0].id);
    assert_eq!("/community", redirects[0].url_new);
}

#[tokio::test]
async fn test_failed_redirect_keeps_property_live() {
    let (mut app, storage) = helper::setup_test_app();

    let access_token = helper::login();

    let property = storage
        .insert_entity(
            EntityKind::Property,
            "villa-2",
            None,
            Utc::now().naive_utc() - TimeDelta::hours(25),
        )
        .await;

    storage.fail_redirect_creation(true);

    let (status_code, _, error) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "properties",
        &property.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::INTERNAL_SERVER_ERROR, status_code);
    let error = error.unwrap();
    assert_eq!(
        "Could not create the redirect for the archived entity, add the redirect manually",
        error.error
    );
    assert_eq!(Some("/properties/villa-2".to_string()), error.description);

    let property = storage.entity(&property.id).await.unwrap();
    assert!(!property.is_archived());
    assert!(storage.audit_trail().await.is_empty());

    // works again once the storage recovers
    storage.fail_redirect_creation(false);

    let (status_code, outcome, _) = helper::maybe_delete_entity(
        &mut app,
        &access_token,
        "properties",
        &property.id.to_string(),
    )
    .await;
    assert_eq!(StatusCode::OK, status_code);
    assert_eq!("archived", outcome.unwrap().action);
}

#[tokio::test]
async fn test_delete_entity_with_invalid_id() {
    let (mut app, _) = helper::setup_test_app();

    let access_token = helper::login();

    let (status_code, _, error) =
        helper::maybe_delete_entity(&mut app, &access_token, "properties", "not-a-uuid").await;
    assert_eq!(StatusCode::BAD_REQUEST, status_code);
    assert_eq!("Invalid path parameter", error.unwrap().error);
}
