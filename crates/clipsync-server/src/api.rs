use std::sync::Arc;

use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use clipsync_shared::types::UserId;
use clipsync_store::{EventLog, SessionDirectory, StoreError, UserStore};

use crate::auth::{self, TokenIssuer};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::groups::GroupRouter;
use crate::hub;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionDirectory>,
    pub events: Arc<EventLog>,
    pub users: Arc<UserStore>,
    pub tokens: Arc<TokenIssuer>,
    pub groups: Arc<GroupRouter>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/user/register", post(register))
        .route("/api/user/login", post(login))
        .route("/api/user/logout", post(logout))
        .route("/sync", get(hub::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP/WebSocket server until it fails or is shut down.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Relay server listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Validate and normalize a username.
fn validate_username(username: &str) -> Result<String, ServerError> {
    let trimmed = username.trim();

    if trimmed.len() < 3 || trimmed.len() > 32 {
        return Err(ServerError::BadRequest(
            "Username must be 3-32 characters".to_string(),
        ));
    }

    if !trimmed
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ServerError::BadRequest(
            "Username must be alphanumeric, underscore, or hyphen".to_string(),
        ));
    }

    Ok(trimmed.to_lowercase())
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<RegisterResponse>, ServerError> {
    let username = validate_username(&request.username)?;
    if request.password.is_empty() {
        return Err(ServerError::BadRequest("Password is required".to_string()));
    }

    let salt = auth::generate_salt();
    let hash = auth::hash_password(&request.password, &salt)?;

    let user = state
        .users
        .create(&username, &hex::encode(hash), &hex::encode(salt))
        .map_err(|e| match e {
            StoreError::AlreadyExists(name) => {
                ServerError::Conflict(format!("Username '{name}' is taken"))
            }
            other => ServerError::Store(other),
        })?;

    info!(user = %user.id, username = %username, "User registered");
    Ok(Json(RegisterResponse { user_id: user.id }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    let username = validate_username(&request.username)?;

    let Some(user) = state.users.get_by_username(&username)? else {
        return Err(ServerError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let stored_hash = hex::decode(&user.password_hash)
        .map_err(|_| ServerError::Internal("Corrupt credential record".to_string()))?;
    let salt = hex::decode(&user.salt)
        .map_err(|_| ServerError::Internal("Corrupt credential record".to_string()))?;

    if !auth::verify_password(&request.password, &stored_hash, &salt)? {
        return Err(ServerError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    }

    let token = state.tokens.issue(user.id)?;
    info!(user = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        user_id: user.id,
        token,
    }))
}

/// Revoking an unknown token is a no-op, so logout is idempotent.
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<axum::http::StatusCode, ServerError> {
    state.tokens.revoke(&request.token)?;
    info!("Token revoked");
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsync_store::MemoryStore;

    pub(crate) fn test_state() -> AppState {
        let store: Arc<dyn clipsync_store::RecordStore> = Arc::new(MemoryStore::new());
        let config = Arc::new(ServerConfig::default());
        AppState {
            sessions: Arc::new(SessionDirectory::new(store.clone())),
            events: Arc::new(EventLog::new(store.clone(), config.retention)),
            users: Arc::new(UserStore::new(store.clone())),
            tokens: Arc::new(TokenIssuer::new(store, config.token_ttl)),
            groups: Arc::new(GroupRouter::new()),
            config,
        }
    }

    #[test]
    fn test_validate_username() {
        assert_eq!(validate_username("  Alice ").unwrap(), "alice");
        assert_eq!(validate_username("bob-2_x").unwrap(), "bob-2_x");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = test_state();
        let creds = || CredentialsRequest {
            username: "alice".to_string(),
            password: "hunter2secret".to_string(),
        };

        let registered = register(State(state.clone()), Json(creds())).await.unwrap();
        let logged_in = login(State(state.clone()), Json(creds())).await.unwrap();
        assert_eq!(logged_in.user_id, registered.user_id);

        // The token resolves back to the user.
        assert_eq!(
            state.tokens.authenticate(&logged_in.token).unwrap(),
            Some(registered.user_id)
        );
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let state = test_state();
        let creds = || CredentialsRequest {
            username: "alice".to_string(),
            password: "hunter2secret".to_string(),
        };

        register(State(state.clone()), Json(creds())).await.unwrap();
        let logged_in = login(State(state.clone()), Json(creds())).await.unwrap();

        let status = logout(
            State(state.clone()),
            Json(LogoutRequest {
                token: logged_in.token.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, axum::http::StatusCode::NO_CONTENT);

        // The revoked token no longer resolves.
        assert_eq!(state.tokens.authenticate(&logged_in.token).unwrap(), None);

        // Logging out twice is fine.
        logout(
            State(state),
            Json(LogoutRequest {
                token: logged_in.token.clone(),
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_register_duplicate_conflicts() {
        let state = test_state();
        let creds = || CredentialsRequest {
            username: "alice".to_string(),
            password: "pw-long-enough".to_string(),
        };

        register(State(state.clone()), Json(creds())).await.unwrap();
        let err = register(State(state), Json(creds())).await.unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(CredentialsRequest {
                username: "alice".to_string(),
                password: "right-password".to_string(),
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state),
            Json(CredentialsRequest {
                username: "alice".to_string(),
                password: "wrong-password".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }
}
