use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};

use crate::domain::booking::Pricing;
use crate::domain::order_stage::{
    Advance, Transition, admin_approve, approval_notice, customer_advance, reject, rejection_notice,
};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::notification;
use crate::error::{AppError, AppResult};
use crate::utils::time::now;

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub booking: booking::Model,
    pub advanced: bool,
}

async fn find_booking<C>(db: &C, booking_id: i32) -> AppResult<booking::Model>
where
    C: ConnectionTrait,
{
    booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Writes `transition` only if the booking is still where it was read,
/// so a concurrent update can never move it backwards or twice.
async fn apply<C>(db: &C, booking: &booking::Model, transition: &Transition) -> AppResult<booking::Model>
where
    C: ConnectionTrait,
{
    let mut changes = booking::ActiveModel {
        order_stage: Set(transition.to),
        status: Set(transition.status),
        ..Default::default()
    };
    if transition.completes() {
        changes.completed_at = Set(Some(now()));
    }

    let result = booking::Entity::update_many()
        .set(changes)
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::OrderStage.eq(transition.from))
        .filter(booking::Column::Status.eq(booking.status))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Order was updated in the meantime, please reload".to_string(),
        ));
    }

    find_booking(db, booking.id).await
}

async fn notify<C>(
    db: &C,
    user_id: i32,
    booking_id: i32,
    (title, message): (String, String),
) -> AppResult<notification::Model>
where
    C: ConnectionTrait,
{
    let created = notification::ActiveModel {
        user_id: Set(user_id),
        booking_id: Set(Some(booking_id)),
        title: Set(title),
        message: Set(message),
        is_read: Set(false),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(created)
}

/// Customer confirmation of a payment step on their own booking.
pub async fn advance_as_customer(
    db: &DatabaseConnection,
    user_id: i32,
    booking_id: i32,
) -> AppResult<StageOutcome> {
    let booking = find_booking(db, booking_id).await?;
    if booking.user_id != user_id {
        return Err(AppError::Forbidden(
            "You can only update your own orders".to_string(),
        ));
    }

    match customer_advance(booking.status, booking.order_stage)? {
        Advance::Unchanged => Ok(StageOutcome {
            booking,
            advanced: false,
        }),
        Advance::Moved(transition) => {
            let updated = apply(db, &booking, &transition).await?;
            tracing::info!(
                booking_id,
                from = transition.from.as_str(),
                to = transition.to.as_str(),
                "Order advanced by customer"
            );
            Ok(StageOutcome {
                booking: updated,
                advanced: true,
            })
        }
    }
}

/// Admin confirmation of the callback or the handover. The owner is
/// notified in the same transaction.
pub async fn approve_as_admin(db: &DatabaseConnection, booking_id: i32) -> AppResult<booking::Model> {
    let txn = db.begin().await?;
    let booking = find_booking(&txn, booking_id).await?;

    let transition = admin_approve(booking.status, booking.order_stage)?;
    let notice = approval_notice(
        &transition,
        booking.id,
        &Pricing::from_total(booking.total_price),
    );

    let updated = apply(&txn, &booking, &transition).await?;
    notify(&txn, updated.user_id, updated.id, notice).await?;
    txn.commit().await?;

    tracing::info!(
        booking_id,
        from = transition.from.as_str(),
        to = transition.to.as_str(),
        status = updated.status.as_str(),
        "Order stage approved"
    );
    Ok(updated)
}

pub async fn reject_as_admin(db: &DatabaseConnection, booking_id: i32) -> AppResult<booking::Model> {
    let txn = db.begin().await?;
    let booking = find_booking(&txn, booking_id).await?;

    let status = reject(booking.status, booking.order_stage)?;

    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(status),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking.id))
        .filter(booking::Column::Status.ne(BookingStatus::Rejected))
        .filter(booking::Column::OrderStage.eq(booking.order_stage))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Order was updated in the meantime, please reload".to_string(),
        ));
    }

    notify(&txn, booking.user_id, booking.id, rejection_notice(booking.id)).await?;
    let updated = find_booking(&txn, booking.id).await?;
    txn.commit().await?;

    tracing::warn!(booking_id, stage = updated.order_stage.as_str(), "Order rejected");
    Ok(updated)
}
