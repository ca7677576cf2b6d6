use axum::{Extension, extract::State, http::StatusCode};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::domain::availability::DateRange;
use crate::domain::booking::{BookingError, BookingForm, Pricing, parse_date};
use crate::entities::booking::{self, OrderStage};
use crate::entities::car;
use crate::error::{AppError, AppResult};
use crate::handlers::orders::{OrderResponse, build_order, build_orders};
use crate::services::availability::is_car_available;
use crate::services::{bookings, orders};
use crate::session::SessionUser;
use crate::utils::extract::{AppJson, AppPath, AppQuery};
use crate::utils::response::{ApiJson, ok};
use crate::utils::time::today;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub car_id: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub car_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub is_available: bool,
    #[serde(flatten)]
    pub pricing: Pricing,
}

/// Availability flag and price quote for a car over a date range
pub async fn availability(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AvailabilityQuery>,
) -> AppResult<ApiJson<AvailabilityResponse>> {
    let car_id = query.car_id.ok_or(BookingError::MissingField("car_id"))?;
    let start = query
        .start_date
        .as_deref()
        .ok_or(BookingError::MissingField("start_date"))?;
    let end = query
        .end_date
        .as_deref()
        .ok_or(BookingError::MissingField("end_date"))?;

    let car = car::Entity::find_by_id(car_id)
        .filter(car::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or(BookingError::CarUnavailable)?;

    let start = parse_date(start).ok_or(BookingError::InvalidDate)?;
    let end = parse_date(end).ok_or(BookingError::InvalidDate)?;
    let range = DateRange::new(start, end).ok_or(BookingError::EndBeforeStart)?;
    let pricing = Pricing::quote(car.price_per_day, &range).ok_or(BookingError::PriceOverflow)?;

    Ok(ok(AvailabilityResponse {
        car_id: car.id,
        start_date: range.start(),
        end_date: range.end(),
        days: range.days(),
        is_available: is_car_available(&state.db, car.id, &range).await?,
        pricing,
    }))
}

pub async fn create_booking(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AppJson(form): AppJson<BookingForm>,
) -> AppResult<(StatusCode, ApiJson<OrderResponse>)> {
    let booking = bookings::create_booking(&state, user.id, form, today()).await?;
    Ok((StatusCode::CREATED, ok(build_order(&state.db, booking).await?)))
}

/// The current user's bookings, newest first
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<ApiJson<Vec<OrderResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(user.id))
        .order_by_desc(booking::Column::CreatedAt)
        .order_by_desc(booking::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ok(build_orders(&state.db, bookings).await?))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<OrderResponse>> {
    let booking = booking::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if booking.user_id != user.id {
        return Err(AppError::Forbidden(
            "You can only view your own orders".to_string(),
        ));
    }

    Ok(ok(build_order(&state.db, booking).await?))
}

#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub advanced: bool,
    pub order: OrderResponse,
}

/// Customer confirmation of the deposit or the final payment
pub async fn advance_booking(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<AdvanceResponse>> {
    let outcome = orders::advance_as_customer(&state.db, user.id, id).await?;
    Ok(ok(AdvanceResponse {
        advanced: outcome.advanced,
        order: build_order(&state.db, outcome.booking).await?,
    }))
}

/// The current user's completed bookings, most recently completed first
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> AppResult<ApiJson<Vec<OrderResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(user.id))
        .filter(booking::Column::OrderStage.eq(OrderStage::Completed))
        .order_by_desc(booking::Column::CompletedAt)
        .order_by_desc(booking::Column::Id)
        .all(&state.db)
        .await?;

    Ok(ok(build_orders(&state.db, bookings).await?))
}
