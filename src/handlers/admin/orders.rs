use axum::extract::State;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::AppState;
use crate::entities::booking::{self, OrderStage};
use crate::error::AppResult;
use crate::handlers::SearchQuery;
use crate::handlers::orders::{OrderResponse, build_order, build_orders};
use crate::services::orders;
use crate::utils::extract::{AppPath, AppQuery};
use crate::utils::response::{ApiJson, ok};

/// Orders still in progress, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<ApiJson<Vec<OrderResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::OrderStage.ne(OrderStage::Completed))
        .order_by_desc(booking::Column::CreatedAt)
        .order_by_desc(booking::Column::Id)
        .all(&state.db)
        .await?;

    let orders = build_orders(&state.db, bookings)
        .await?
        .into_iter()
        .filter(|order| order.matches(query.keyword()))
        .collect();
    Ok(ok(orders))
}

/// Confirm the customer callback or the car handover
pub async fn approve_order(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<OrderResponse>> {
    let booking = orders::approve_as_admin(&state.db, id).await?;
    Ok(ok(build_order(&state.db, booking).await?))
}

pub async fn reject_order(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<OrderResponse>> {
    let booking = orders::reject_as_admin(&state.db, id).await?;
    Ok(ok(build_order(&state.db, booking).await?))
}

/// Completed orders, most recently completed first
pub async fn history(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<ApiJson<Vec<OrderResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::OrderStage.eq(OrderStage::Completed))
        .order_by_desc(booking::Column::CompletedAt)
        .order_by_desc(booking::Column::Id)
        .all(&state.db)
        .await?;

    let orders = build_orders(&state.db, bookings)
        .await?
        .into_iter()
        .filter(|order| order.matches(query.keyword()))
        .collect();
    Ok(ok(orders))
}
