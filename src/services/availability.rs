use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::domain::availability::{DateRange, is_available};
use crate::entities::booking::{self, BookingStatus};
use crate::error::AppResult;

fn schedule_entry(b: &booking::Model) -> (BookingStatus, DateRange) {
    (b.status, DateRange::covering(b.start_date, b.end_date))
}

/// Blocking bookings of one car.
pub async fn car_schedule<C>(db: &C, car_id: i32) -> AppResult<Vec<(BookingStatus, DateRange)>>
where
    C: ConnectionTrait,
{
    let bookings = booking::Entity::find()
        .filter(booking::Column::CarId.eq(car_id))
        .filter(booking::Column::Status.is_in(BookingStatus::blocking()))
        .all(db)
        .await?;

    Ok(bookings.iter().map(schedule_entry).collect())
}

pub async fn is_car_available<C>(db: &C, car_id: i32, range: &DateRange) -> AppResult<bool>
where
    C: ConnectionTrait,
{
    Ok(is_available(range, car_schedule(db, car_id).await?))
}

/// Availability of each car in `car_ids` over `range`.
pub async fn availability_by_car<C>(
    db: &C,
    car_ids: &[i32],
    range: &DateRange,
) -> AppResult<HashMap<i32, bool>>
where
    C: ConnectionTrait,
{
    if car_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let bookings = booking::Entity::find()
        .filter(booking::Column::CarId.is_in(car_ids.iter().copied()))
        .filter(booking::Column::Status.is_in(BookingStatus::blocking()))
        .all(db)
        .await?;

    let mut schedules: HashMap<i32, Vec<(BookingStatus, DateRange)>> = HashMap::new();
    for b in &bookings {
        schedules.entry(b.car_id).or_default().push(schedule_entry(b));
    }

    Ok(car_ids
        .iter()
        .map(|id| {
            let schedule = schedules.remove(id).unwrap_or_default();
            (*id, is_available(range, schedule))
        })
        .collect())
}
