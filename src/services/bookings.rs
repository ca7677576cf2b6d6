use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::AppState;
use crate::domain::availability::is_available;
use crate::domain::booking::{BookingError, BookingForm, Pricing};
use crate::entities::booking::{self, BookingStatus, OrderStage};
use crate::entities::{car, user};
use crate::error::AppResult;
use crate::services::availability::car_schedule;
use crate::utils::time::now;

/// One async mutex per car, held across the overlap check and the insert.
#[derive(Clone, Default)]
pub struct CarLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl CarLocks {
    pub async fn acquire(&self, car_id: i32) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(&self.locks.entry(car_id).or_default());
        lock.lock_owned().await
    }
}

/// Validates `form` for `user_id` and stores a pending booking.
pub async fn create_booking(
    state: &AppState,
    user_id: i32,
    form: BookingForm,
    today: NaiveDate,
) -> AppResult<booking::Model> {
    let form = form.validate()?;

    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or(BookingError::UserNotFound)?;

    let car = car::Entity::find_by_id(form.car_id)
        .filter(car::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or(BookingError::CarUnavailable)?;

    let period = form.period(today)?;
    let pricing = Pricing::quote(car.price_per_day, &period).ok_or(BookingError::PriceOverflow)?;

    let _guard = state.car_locks.acquire(car.id).await;
    let txn = state.db.begin().await?;

    if !is_available(&period, car_schedule(&txn, car.id).await?) {
        tracing::info!(car_id = car.id, user_id, "Booking refused, dates overlap");
        return Err(BookingError::Overlap.into());
    }

    let booking = booking::ActiveModel {
        user_id: Set(user_id),
        car_id: Set(car.id),
        start_date: Set(period.start()),
        end_date: Set(period.end()),
        current_province: Set(form.current_province),
        destination_province: Set(form.destination_province),
        pickup_type: Set(form.pickup_type.as_str().to_string()),
        total_price: Set(pricing.total_price),
        contact_number: Set(form.contact_number),
        status: Set(BookingStatus::Pending),
        order_stage: Set(OrderStage::AwaitingContact),
        completed_at: Set(None),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = booking.id,
        car_id = car.id,
        user_id,
        total_price = booking.total_price,
        "Booking created"
    );
    Ok(booking)
}
