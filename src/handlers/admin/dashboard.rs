use axum::extract::State;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use crate::AppState;
use crate::entities::booking::{self, BookingStatus, OrderStage};
use crate::entities::car;
use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::response::{ApiJson, ok};

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_admins: u64,
    pub total_cars: u64,
    pub active_cars: u64,
    /// Neither completed nor rejected.
    pub incoming_orders: u64,
    pub pending_orders: u64,
    pub completed_orders: u64,
    pub completed_revenue: i64,
}

fn total_revenue(totals: &[i64]) -> AppResult<i64> {
    totals
        .iter()
        .try_fold(0i64, |sum, total| sum.checked_add(*total))
        .ok_or_else(|| AppError::Internal("Completed revenue overflows i64".to_string()))
}

pub async fn dashboard(State(state): State<AppState>) -> AppResult<ApiJson<DashboardStats>> {
    let db = &state.db;

    let total_users = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Customer))
        .count(db)
        .await?;
    let total_admins = user::Entity::find()
        .filter(user::Column::Role.eq(UserRole::Admin))
        .count(db)
        .await?;
    let total_cars = car::Entity::find().count(db).await?;
    let active_cars = car::Entity::find()
        .filter(car::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let incoming_orders = booking::Entity::find()
        .filter(booking::Column::OrderStage.ne(OrderStage::Completed))
        .filter(booking::Column::Status.ne(BookingStatus::Rejected))
        .count(db)
        .await?;
    let pending_orders = booking::Entity::find()
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .count(db)
        .await?;

    // Summed here: SUM over BIGINT decodes differently per backend.
    let completed_totals: Vec<i64> = booking::Entity::find()
        .select_only()
        .column(booking::Column::TotalPrice)
        .filter(booking::Column::OrderStage.eq(OrderStage::Completed))
        .into_tuple::<i64>()
        .all(db)
        .await?;

    let completed_revenue = total_revenue(&completed_totals)?;

    Ok(ok(DashboardStats {
        total_users,
        total_admins,
        total_cars,
        active_cars,
        incoming_orders,
        pending_orders,
        completed_orders: completed_totals.len() as u64,
        completed_revenue,
    }))
}
