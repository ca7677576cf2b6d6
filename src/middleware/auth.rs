use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};

use crate::AppState;
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::session::{SessionId, SessionUser};

pub const SESSION_COOKIE: &str = "session_id";

/// Resolve the session from the `session_id` cookie or a Bearer token and
/// expose it to handlers as [`SessionUser`] and [`SessionId`] extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| bearer.map(|TypedHeader(auth)| auth.token().to_string()))
        .ok_or_else(|| AppError::Unauthorized("Please log in first".to_string()))?;

    let user = state
        .sessions
        .get(&session_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Session expired, please log in again".to_string()))?;

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(SessionId(session_id));
    Ok(next.run(request).await)
}

/// Require admin role
pub async fn require_admin(request: Request, next: Next) -> AppResult<Response> {
    let user = request
        .extensions()
        .get::<SessionUser>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
