use crate::{
    entities::user::{self, Role},
    errors::ServiceError,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::handlers::common::validate_input;

/// Auth configuration derived from the application config
#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_ttl: Duration) -> Result<Self, ServiceError> {
        if jwt_secret.trim().is_empty() {
            return Err(ServiceError::InternalError(
                "JWT secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            jwt_secret,
            token_ttl,
        })
    }
}

/// JWT claims carried by every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Identity attached to a request after token verification
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Missing or invalid bearer token".into()))
    }
}

/// Issues and verifies tokens and manages user accounts
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::HashError(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role,
            iat: now,
            exp: now + self.config.token_ttl.as_secs() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::AuthError(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::AuthError(format!("Invalid token: {}", e)))
    }

    /// Registers a new account. Only an administrator may assign a role other
    /// than guest.
    #[instrument(skip(self, input))]
    pub async fn register(
        &self,
        input: RegisterInput,
        requester: Option<&AuthenticatedUser>,
    ) -> Result<user::Model, ServiceError> {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(input.username.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Username {} is already taken",
                input.username
            )));
        }

        let role = match input.role {
            Some(role) if role != Role::Guest => match requester {
                Some(user) if user.role.at_least(Role::Administrator) => role,
                _ => {
                    return Err(ServiceError::Forbidden(
                        "Only administrators may assign roles".to_string(),
                    ))
                }
            },
            Some(role) => role,
            None => Role::Guest,
        };

        let now = Utc::now();
        let account = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(input.username),
            email: Set(input.email),
            password_hash: Set(self.hash_password(&input.password)?),
            role: Set(role),
            bio: Set(input.bio),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let account = account.insert(&*self.db).await?;
        info!("Registered user {} ({})", account.username, account.id);
        Ok(account)
    }

    /// Verifies credentials and returns a bearer token on success
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginResponse, ServiceError> {
        let account = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::AuthError("Invalid username or password".into()))?;

        if !account.is_active {
            return Err(ServiceError::AuthError("Account is disabled".into()));
        }

        if !self.verify_password(password, &account.password_hash)? {
            return Err(ServiceError::AuthError("Invalid username or password".into()));
        }

        let access_token = self.issue_token(&account)?;
        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl.as_secs(),
            user: account,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: Option<Role>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: user::Model,
}

/// Parses a bearer token when present and attaches the authenticated identity
/// to the request. Routes decide themselves whether identity is required.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    if let Some(token) = token {
        if let Ok(claims) = auth.verify_token(&token) {
            req.extensions_mut().insert(AuthenticatedUser {
                id: claims.sub,
                username: claims.username,
                role: claims.role,
            });
        }
    }

    next.run(req).await
}

async fn role_guard(min_role: Role, req: Request, next: Next) -> Result<Response, ServiceError> {
    let user = req
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;

    if !user.role.at_least(min_role) {
        return Err(ServiceError::Forbidden(format!(
            "Requires at least the {:?} role",
            min_role
        )));
    }

    Ok(next.run(req).await)
}

/// Router extension for gating a whole router behind a minimum role,
/// mirroring how route groups are assembled in `api_v1_routes`.
pub trait RoleRouterExt {
    fn with_min_role(self, role: Role) -> Self;
}

impl<S> RoleRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_min_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            role_guard(role, req, next)
        }))
    }
}

/// Routes served under `/auth`
pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/login", post(login_handler))
        .route("/register", post(register_handler))
        .route("/me", get(me_handler))
}

async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    validate_input(&payload).map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let response = auth.login(&payload.username, &payload.password).await?;
    Ok(Json(response))
}

async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    requester: Option<axum::Extension<AuthenticatedUser>>,
    Json(payload): Json<RegisterInput>,
) -> Result<Json<user::Model>, ServiceError> {
    validate_input(&payload).map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    let requester = requester.map(|ext| ext.0);
    let account = auth.register(payload, requester.as_ref()).await?;
    Ok(Json(account))
}

async fn me_handler(user: AuthenticatedUser) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": user.id,
        "username": user.username,
        "role": user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        let config = AuthConfig::new(
            "unit_test_secret_key_that_is_long_enough_for_hs256_signing_0123".to_string(),
            Duration::from_secs(3600),
        )
        .unwrap();
        // The connection is never touched by the token/password helpers.
        let db = Arc::new(DatabaseConnection::Disconnected);
        AuthService::new(config, db)
    }

    fn sample_user(role: Role) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            username: "cashier1".to_string(),
            email: "cashier1@example.com".to_string(),
            password_hash: String::new(),
            role,
            bio: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn password_hash_round_trip() {
        let auth = service();
        let hash = auth.hash_password("s3cret-password").unwrap();
        assert!(auth.verify_password("s3cret-password", &hash).unwrap());
        assert!(!auth.verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn token_round_trip_preserves_claims() {
        let auth = service();
        let user = sample_user(Role::Manager);
        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "cashier1");
        assert_eq!(claims.role, Role::Manager);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let auth = service();
        let user = sample_user(Role::Staff);
        let mut token = auth.issue_token(&user).unwrap();
        token.push('x');
        assert!(auth.verify_token(&token).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(AuthConfig::new("  ".to_string(), Duration::from_secs(60)).is_err());
    }
}
