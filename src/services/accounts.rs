use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use serde::Deserialize;

use crate::config::AdminSeed;
use crate::domain::validation::{max_len, required, validate_password, validate_phone};
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::password::{hash_password, verify_password};
use crate::utils::time::now;

const MAX_FULL_NAME: usize = 100;
const MAX_USERNAME: usize = 50;

/// Account fields as sent by signup and the admin user forms.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountForm {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Turns a unique index violation that slipped past the explicit checks
/// into the same message the checks would have produced.
fn unique_violation(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("phone_number") {
                AppError::Conflict("Phone number already exists".to_string())
            } else {
                AppError::Conflict("Username already exists".to_string())
            }
        }
        _ => AppError::Database(err),
    }
}

async fn ensure_username_free(
    db: &DatabaseConnection,
    username: &str,
    except: Option<i32>,
) -> AppResult<()> {
    let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }
    Ok(())
}

async fn ensure_phone_free(
    db: &DatabaseConnection,
    phone_number: &str,
    except: Option<i32>,
) -> AppResult<()> {
    let mut query = user::Entity::find().filter(user::Column::PhoneNumber.eq(phone_number));
    if let Some(id) = except {
        query = query.filter(user::Column::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(AppError::Conflict("Phone number already exists".to_string()));
    }
    Ok(())
}

/// Creates an account after checking every field and both unique keys.
pub async fn create_account(
    db: &DatabaseConnection,
    form: AccountForm,
    role: UserRole,
) -> AppResult<user::Model> {
    let full_name = required("fullName", form.full_name.as_deref())?;
    let phone_number = required("phoneNumber", form.phone_number.as_deref())?;
    let username = required("username", form.username.as_deref())?;
    let password = form
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("password is required".to_string()))?;

    max_len("fullName", &full_name, MAX_FULL_NAME)?;
    max_len("username", &username, MAX_USERNAME)?;
    validate_phone(&phone_number)?;
    validate_password(&password)?;

    ensure_username_free(db, &username, None).await?;
    ensure_phone_free(db, &phone_number, None).await?;

    let created = user::ActiveModel {
        full_name: Set(full_name),
        phone_number: Set(phone_number),
        username: Set(username),
        password_hash: Set(hash_password(&password)?),
        role: Set(role),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(unique_violation)?;

    tracing::info!(user_id = created.id, role = ?created.role, "Account created");
    Ok(created)
}

/// Applies only the supplied fields. Uniqueness ignores the record itself.
pub async fn update_account(
    db: &DatabaseConnection,
    existing: user::Model,
    form: AccountForm,
) -> AppResult<user::Model> {
    let user_id = existing.id;
    let mut active: user::ActiveModel = existing.clone().into();

    if let Some(full_name) = form.full_name {
        let full_name = required("fullName", Some(&full_name))?;
        max_len("fullName", &full_name, MAX_FULL_NAME)?;
        active.full_name = Set(full_name);
    }

    if let Some(phone_number) = form.phone_number {
        let phone_number = phone_number.trim().to_string();
        validate_phone(&phone_number)?;
        ensure_phone_free(db, &phone_number, Some(user_id)).await?;
        active.phone_number = Set(phone_number);
    }

    if let Some(username) = form.username {
        let username = required("username", Some(&username))?;
        max_len("username", &username, MAX_USERNAME)?;
        ensure_username_free(db, &username, Some(user_id)).await?;
        active.username = Set(username);
    }

    if let Some(password) = form.password.filter(|p| !p.is_empty()) {
        validate_password(&password)?;
        active.password_hash = Set(hash_password(&password)?);
    }

    if !active.is_changed() {
        return Ok(existing);
    }
    Ok(active.update(db).await.map_err(unique_violation)?)
}

/// Looks up an all-digit identifier as a phone number, anything else as a
/// username, and checks the password.
pub async fn authenticate(
    db: &DatabaseConnection,
    identifier: &str,
    password: &str,
) -> AppResult<user::Model> {
    let identifier = identifier.trim();
    let column = if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
        user::Column::PhoneNumber
    } else {
        user::Column::Username
    };

    let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

    let user = user::Entity::find()
        .filter(column.eq(identifier))
        .one(db)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = user.id, "Failed login attempt");
        return Err(invalid());
    }
    Ok(user)
}

pub async fn change_phone(
    db: &DatabaseConnection,
    user: user::Model,
    phone_number: Option<&str>,
) -> AppResult<user::Model> {
    let phone_number = required("phone_number", phone_number)?;
    validate_phone(&phone_number)?;
    ensure_phone_free(db, &phone_number, Some(user.id)).await?;

    let mut active: user::ActiveModel = user.into();
    active.phone_number = Set(phone_number);
    Ok(active.update(db).await.map_err(unique_violation)?)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub confirm_password: Option<String>,
}

pub async fn change_password(
    db: &DatabaseConnection,
    user: user::Model,
    change: PasswordChange,
) -> AppResult<()> {
    let (Some(current), Some(new), Some(confirm)) = (
        change.current_password.filter(|p| !p.is_empty()),
        change.new_password.filter(|p| !p.is_empty()),
        change.confirm_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest(
            "current_password, new_password and confirm_password are required".to_string(),
        ));
    };

    validate_password(&new)?;
    if new != confirm {
        return Err(AppError::BadRequest(
            "Password confirmation does not match".to_string(),
        ));
    }
    if !verify_password(&current, &user.password_hash)? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let user_id = user.id;
    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(&new)?);
    active.update(db).await?;

    tracing::info!(user_id, "Password changed");
    Ok(())
}

/// Creates the configured admin account unless its username is taken.
pub async fn seed_admin(db: &DatabaseConnection, seed: &AdminSeed) -> AppResult<()> {
    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(&seed.username))
        .one(db)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    let admin = create_account(
        db,
        AccountForm {
            full_name: Some(seed.full_name.clone()),
            phone_number: Some(seed.phone_number.clone()),
            username: Some(seed.username.clone()),
            password: Some(seed.password.clone()),
        },
        UserRole::Admin,
    )
    .await?;

    tracing::info!(username = %admin.username, "Admin account created");
    Ok(())
}
