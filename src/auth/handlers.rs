use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, LogoutResponse, PublicUser, RegisterRequest,
            SessionResponse,
        },
        extractors::{require_auth, AuthUser, LenientJson},
        services::{authenticate, register_user, validate_login, validate_registration},
    },
    errors::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn gated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/auth/me", get(get_me))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    LenientJson(payload): LenientJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let (email, password) = validate_registration(payload)?;

    let user = register_user(state.users.as_ref(), &email, password).await?;
    let token = state.keys.issue(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    LenientJson(payload): LenientJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let (email, password) =
        validate_login(payload).inspect_err(|_| warn!("login missing credentials"))?;

    let user = authenticate(state.users.as_ref(), &email, password).await?;
    let token = state.keys.issue(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// Tokens are stateless, so there is nothing to invalidate server-side.
#[instrument(skip_all)]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<LogoutResponse> {
    info!(user_id = %user_id, "user logged out");
    Json(LogoutResponse {
        message: "Logged out successfully",
    })
}

#[instrument(skip_all)]
pub async fn session(AuthUser(user_id): AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: true,
        user_id,
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let user = state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token subject no longer exists");
        AppError::NotAuthenticated
    })?;
    Ok(Json(user.into()))
}
