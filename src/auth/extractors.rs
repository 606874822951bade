use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, errors::AppError};

/// Identity attached to a request once its bearer token has been verified.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: Uuid,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok())?;

    // Expect "Bearer <token>"
    let token = auth
        .strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Gate for protected routes. Never consults the user store.
///
/// No token: 401. A token that fails verification for any reason: 403.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        warn!(uri = %req.uri(), "missing bearer token");
        AppError::MissingToken
    })?;

    let user_id = keys.verify(token).map_err(|_| {
        warn!(uri = %req.uri(), "invalid or expired token");
        AppError::InvalidToken
    })?;

    req.extensions_mut().insert(AuthContext { user_id });
    Ok(next.run(req).await)
}

/// Extracts the user ID the gate attached to the request.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .map(|ctx| AuthUser(ctx.user_id))
            .ok_or(AppError::NotAuthenticated)
    }
}

/// JSON body that never rejects. A missing, unparseable or mistyped body becomes
/// `T::default()`, so field validation reports it like any other missing input.
pub struct LenientJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for LenientJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(LenientJson(value)),
            Err(rejection) => {
                warn!(error = %rejection.body_text(), "unreadable JSON body");
                Ok(LenientJson(T::default()))
            }
        }
    }
}
