use axum::{Extension, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::SESSION_COOKIE;
use crate::services::accounts::{self, AccountForm};
use crate::session::{SessionId, SessionUser};
use crate::utils::extract::AppJson;
use crate::utils::response::{ApiJson, Message, message, ok};
use crate::utils::time::format_timestamp;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username, or the 10-digit phone number.
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub full_name: String,
    pub phone_number: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: String,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            created_at: format_timestamp(&user.created_at),
            full_name: user.full_name,
            phone_number: user.phone_number,
            username: user.username,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub session_id: String,
}

/// Register a new customer account
pub async fn signup(
    State(state): State<AppState>,
    AppJson(form): AppJson<AccountForm>,
) -> AppResult<(StatusCode, ApiJson<UserResponse>)> {
    let user = accounts::create_account(&state.db, form, UserRole::Customer).await?;
    Ok((StatusCode::CREATED, ok(user.into())))
}

/// Login with username or phone number
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<(CookieJar, ApiJson<LoginResponse>)> {
    let (Some(identifier), Some(password)) = (payload.username, payload.password) else {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    };

    let user = accounts::authenticate(&state.db, &identifier, &password).await?;
    let session_id = state.sessions.create(&SessionUser::from(&user)).await?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id.clone()))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax);

    tracing::info!(user_id = user.id, role = ?user.role, "User logged in");
    Ok((
        jar.add(cookie),
        ok(LoginResponse {
            user: user.into(),
            session_id,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    jar: CookieJar,
) -> (CookieJar, ApiJson<Message>) {
    state.sessions.remove(&session_id).await;
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        message("Logged out"),
    )
}

/// The identity snapshot of the current session.
pub async fn me(Extension(user): Extension<SessionUser>) -> ApiJson<SessionUser> {
    ok(user)
}
