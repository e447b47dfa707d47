mod common;

use common::TestApp;
use serde_json::json;
use storefront_api::entities::user::Role;

#[tokio::test]
async fn register_login_and_me_round_trip() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post_json(
            "/auth/register",
            None,
            json!({
                "username": "shopkeeper",
                "email": "shopkeeper@example.com",
                "password": "a-long-password",
            }),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK, "body: {body}");
    assert_eq!(body["role"], "guest");
    assert!(body.get("password_hash").is_none() || body["password_hash"].is_null());

    let (status, body) = app
        .post_json(
            "/auth/login",
            None,
            json!({"username": "shopkeeper", "password": "a-long-password"}),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    let token = body["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["token_type"], "Bearer");

    let (status, body) = app.get("/auth/me", Some(&token)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["username"], "shopkeeper");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = TestApp::new().await;
    app.post_json(
        "/auth/register",
        None,
        json!({
            "username": "shopkeeper",
            "email": "shopkeeper@example.com",
            "password": "a-long-password",
        }),
    )
    .await;

    let (status, _) = app
        .post_json(
            "/auth/login",
            None,
            json!({"username": "shopkeeper", "password": "not-the-password"}),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn only_administrators_may_assign_roles() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post_json(
            "/auth/register",
            None,
            json!({
                "username": "wannabe-admin",
                "email": "wannabe@example.com",
                "password": "a-long-password",
                "role": "manager",
            }),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);

    let admin = app.token_for(Role::Administrator).await;
    let (status, body) = app
        .post_json(
            "/auth/register",
            Some(&admin),
            json!({
                "username": "floor-manager",
                "email": "floor@example.com",
                "password": "a-long-password",
                "role": "manager",
            }),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK, "body: {body}");
    assert_eq!(body["role"], "manager");
}

#[tokio::test]
async fn public_surface_needs_no_token() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/products", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let (status, _) = app.get("/api/v1/status", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let (status, _) = app.get("/api/v1/health", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let (status, body) = app
        .post_json(
            "/api/v1/feedback",
            None,
            json!({
                "name": "Visitor",
                "email": "visitor@example.com",
                "message": "The new store looks great",
            }),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "body: {body}");
}

#[tokio::test]
async fn role_floors_are_enforced_per_route_group() {
    let app = TestApp::new().await;
    let staff = app.token_for(Role::Staff).await;
    let manager = app.token_for(Role::Manager).await;

    let product = json!({
        "name": "House Red",
        "description": "Table wine",
        "initial_stock": 10,
    });

    // Catalog writes are manager-only
    let (status, _) = app
        .post_json("/api/v1/products", Some(&staff), product.clone())
        .await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);

    let (status, body) = app
        .post_json("/api/v1/products", Some(&manager), product)
        .await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "body: {body}");
    let product_id = body["id"].as_str().unwrap().to_string();

    // Deletes are administrator-only
    let (status, _) = app
        .delete(&format!("/api/v1/products/{product_id}"), Some(&manager))
        .await;
    assert_eq!(status, axum::http::StatusCode::FORBIDDEN);

    let admin = app.token_for(Role::Administrator).await;
    let (status, _) = app
        .delete(&format!("/api/v1/products/{product_id}"), Some(&admin))
        .await;
    assert_eq!(status, axum::http::StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn garbage_tokens_do_not_authenticate() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/orders", Some("not-a-jwt")).await;
    assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn feedback_review_flow() {
    let app = TestApp::new().await;
    let staff = app.token_for(Role::Staff).await;

    let (_, submitted) = app
        .post_json(
            "/api/v1/feedback",
            None,
            json!({
                "name": "Visitor",
                "email": "visitor@example.com",
                "message": "Stock the 1L bottles again, please",
            }),
        )
        .await;
    let id = submitted["id"].as_str().unwrap();

    // Anonymous listing is rejected, staff sees the entry
    let (status, _) = app.get("/api/v1/feedback", None).await;
    assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/api/v1/feedback", Some(&staff)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["is_valid"], false);

    let (status, body) = app
        .post_json(
            &format!("/api/v1/feedback/{id}/review"),
            Some(&staff),
            json!({}),
        )
        .await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["is_valid"], true);
}
