use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db::{self, DbConfig},
    entities::{customer, user},
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::{CreateProductInput, CreateVariantInput},
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Test harness backed by an in-memory SQLite database with the full
/// middleware stack attached, mirroring the router built in `main`.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        // A single connection keeps every query on the same in-memory database.
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..DbConfig::default()
        };
        let pool = db::establish_connection_with_config(&db_config)
            .await
            .expect("in-memory sqlite should connect");
        db::run_migrations(&pool)
            .await
            .expect("migrations should apply");
        let db_arc = Arc::new(pool);
        let config = Arc::new(config);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::new(
            config.jwt_secret.clone(),
            Duration::from_secs(config.jwt_expiration as u64),
        )
        .expect("auth config");
        let auth = Arc::new(AuthService::new(auth_cfg, db_arc.clone()));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            config.clone(),
        )
        .expect("service construction");

        let state = AppState {
            db: db_arc,
            config,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .nest(
                "/auth",
                storefront_api::auth::auth_routes().with_state(auth.clone()),
            )
            .layer(axum::middleware::from_fn_with_state(
                auth.clone(),
                storefront_api::auth::auth_middleware,
            ))
            .layer(axum::middleware::from_fn(
                storefront_api::tracing::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            auth,
            _event_task: event_task,
        }
    }

    /// Inserts an active user with the given role and returns a bearer token
    pub async fn token_for(&self, role: user::Role) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(format!("user_{}", &suffix[..12])),
            email: Set(format!("user_{}@example.com", &suffix[..12])),
            password_hash: Set(String::new()),
            role: Set(role),
            bio: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let account = account.insert(&*self.state.db).await.expect("insert user");
        self.auth.issue_token(&account).expect("issue token")
    }

    // ---- fixtures ----

    /// Product with an inventory level, created through the catalog service
    pub async fn seed_product(&self, name: &str, initial_stock: i32) -> Uuid {
        let product = self
            .state
            .services
            .catalog
            .create_product(CreateProductInput {
                name: name.to_string(),
                description: format!("{name} for tests"),
                status: None,
                category_id: None,
                cost: None,
                initial_stock: Some(initial_stock),
                low_stock_threshold: Some(5),
            })
            .await
            .expect("create product");
        product.id
    }

    pub async fn seed_variant(&self, product_id: Uuid, volume_ml: i32, price: Decimal) -> Uuid {
        let variant = self
            .state
            .services
            .catalog
            .add_variant(
                product_id,
                CreateVariantInput {
                    sku: format!("SKU-{}", Uuid::new_v4().simple()),
                    volume_ml,
                    price,
                    position: None,
                },
            )
            .await
            .expect("create variant");
        variant.id
    }

    pub async fn seed_customer(&self, first_name: &str) -> Uuid {
        let now = Utc::now();
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(None),
            first_name: Set(first_name.to_string()),
            last_name: Set(Some("Test".to_string())),
            email: Set(None),
            phone: Set(None),
            address: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.state.db).await.expect("insert customer");
        created.id
    }

    // ---- HTTP helpers ----

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put_json(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }
}
