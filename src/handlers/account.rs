use axum::{Extension, extract::State};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::entities::{notification, user};
use crate::error::{AppError, AppResult};
use crate::handlers::auth::UserResponse;
use crate::services::accounts::{self, PasswordChange};
use crate::session::{SessionId, SessionUser};
use crate::utils::extract::{AppJson, AppPath};
use crate::utils::response::{ApiJson, Message, message, ok};
use crate::utils::time::format_timestamp;

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i32,
    pub booking_id: Option<i32>,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

impl From<notification::Model> for NotificationResponse {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            booking_id: n.booking_id,
            created_at: format_timestamp(&n.created_at),
            title: n.title,
            message: n.message,
            is_read: n.is_read,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub items: Vec<NotificationResponse>,
    pub unread_count: usize,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<ApiJson<NotificationList>> {
    let items: Vec<NotificationResponse> = notification::Entity::find()
        .filter(notification::Column::UserId.eq(user.id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(NotificationResponse::from)
        .collect();

    let unread_count = items.iter().filter(|n| !n.is_read).count();
    Ok(ok(NotificationList {
        items,
        unread_count,
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<NotificationResponse>> {
    let found = notification::Entity::find_by_id(id)
        .filter(notification::Column::UserId.eq(user.id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    if found.is_read {
        return Ok(ok(found.into()));
    }

    let mut active: notification::ActiveModel = found.into();
    active.is_read = Set(true);
    Ok(ok(active.update(&state.db).await?.into()))
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<ApiJson<MarkedRead>> {
    let result = notification::Entity::update_many()
        .set(notification::ActiveModel {
            is_read: Set(true),
            ..Default::default()
        })
        .filter(notification::Column::UserId.eq(user.id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(&state.db)
        .await?;

    Ok(ok(MarkedRead {
        updated: result.rows_affected,
    }))
}

async fn current_user(db: &DatabaseConnection, session: &SessionUser) -> AppResult<user::Model> {
    user::Entity::find_by_id(session.id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<ApiJson<UserResponse>> {
    Ok(ok(current_user(&state.db, &user).await?.into()))
}

#[derive(Debug, Deserialize)]
pub struct PhoneChange {
    pub phone_number: Option<String>,
}

/// Change phone number and refresh the session snapshot
pub async fn change_phone(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    AppJson(payload): AppJson<PhoneChange>,
) -> AppResult<ApiJson<UserResponse>> {
    let existing = current_user(&state.db, &user).await?;
    let updated = accounts::change_phone(&state.db, existing, payload.phone_number.as_deref()).await?;

    state
        .sessions
        .update(&session_id, &SessionUser::from(&updated))
        .await?;

    Ok(ok(updated.into()))
}

/// Signs out the account's other sessions; the current one stays valid.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    AppJson(payload): AppJson<PasswordChange>,
) -> AppResult<ApiJson<Message>> {
    let existing = current_user(&state.db, &user).await?;
    accounts::change_password(&state.db, existing, payload).await?;
    let ended = state.sessions.remove_user(user.id, Some(&session_id)).await;
    tracing::info!(user_id = user.id, other_sessions = ended, "Password changed");
    Ok(message("Password updated"))
}
