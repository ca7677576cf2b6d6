//! User and admin accounts. The same handlers serve `/users` and `/admins`;
//! the router supplies the role as an extension.

use axum::{Extension, extract::State, http::StatusCode};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    SqlErr, TransactionTrait,
};

use crate::AppState;
use crate::domain::validation::matches_keyword;
use crate::entities::booking;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::SearchQuery;
use crate::handlers::auth::UserResponse;
use crate::services::accounts::{self, AccountForm};
use crate::session::{SessionId, SessionUser};
use crate::utils::extract::{AppJson, AppPath, AppQuery};
use crate::utils::response::{ApiJson, Message, message, ok};

fn has_bookings(role: UserRole) -> AppError {
    AppError::BadRequest(format!("{} has bookings and cannot be deleted", role.noun()))
}

/// A booking inserted after the count still blocks the delete through its foreign key.
fn restricted_delete(role: UserRole, err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => has_bookings(role),
        _ => AppError::Database(err),
    }
}

async fn find_account(db: &DatabaseConnection, role: UserRole, id: i32) -> AppResult<user::Model> {
    user::Entity::find_by_id(id)
        .filter(user::Column::Role.eq(role))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", role.noun())))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(role): Extension<UserRole>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<ApiJson<Vec<UserResponse>>> {
    let keyword = query.keyword();
    let users = user::Entity::find()
        .filter(user::Column::Role.eq(role))
        .order_by_asc(user::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|u| {
            matches_keyword(
                keyword,
                [
                    u.full_name.as_str(),
                    u.username.as_str(),
                    u.phone_number.as_str(),
                ],
            )
        })
        .map(UserResponse::from)
        .collect();

    Ok(ok(users))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(role): Extension<UserRole>,
    AppJson(form): AppJson<AccountForm>,
) -> AppResult<(StatusCode, ApiJson<UserResponse>)> {
    let user = accounts::create_account(&state.db, form, role).await?;
    Ok((StatusCode::CREATED, ok(user.into())))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(role): Extension<UserRole>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<UserResponse>> {
    Ok(ok(find_account(&state.db, role, id).await?.into()))
}

/// Partial update. Editing your own account refreshes your session; a new
/// password ends the account's other sessions.
pub async fn update(
    State(state): State<AppState>,
    Extension(role): Extension<UserRole>,
    Extension(acting): Extension<SessionUser>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    AppPath(id): AppPath<i32>,
    AppJson(form): AppJson<AccountForm>,
) -> AppResult<ApiJson<UserResponse>> {
    let existing = find_account(&state.db, role, id).await?;
    let password_changed = form.password.as_deref().is_some_and(|p| !p.is_empty());
    let updated = accounts::update_account(&state.db, existing, form).await?;

    if password_changed {
        let keep = (updated.id == acting.id).then_some(session_id.as_str());
        state.sessions.remove_user(updated.id, keep).await;
    }

    if updated.id == acting.id {
        state
            .sessions
            .update(&session_id, &SessionUser::from(&updated))
            .await?;
    }

    tracing::info!(user_id = updated.id, admin_id = acting.id, "Account updated");
    Ok(ok(updated.into()))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(role): Extension<UserRole>,
    Extension(acting): Extension<SessionUser>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<Message>> {
    if id == acting.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    let account = find_account(&state.db, role, id).await?;

    let txn = state.db.begin().await?;
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(account.id))
        .count(&txn)
        .await?;
    if bookings > 0 {
        return Err(has_bookings(role));
    }
    user::Entity::delete_by_id(account.id)
        .exec(&txn)
        .await
        .map_err(|e| restricted_delete(role, e))?;
    txn.commit().await.map_err(|e| restricted_delete(role, e))?;

    let ended = state.sessions.remove_user(account.id, None).await;
    tracing::warn!(user_id = account.id, admin_id = acting.id, sessions = ended, "Account deleted");
    Ok(message(format!("{} deleted", role.noun())))
}
