//! Order view shared by the customer and admin endpoints.

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::domain::availability::DateRange;
use crate::domain::booking::Pricing;
use crate::domain::validation::matches_keyword;
use crate::entities::booking::{self, BookingStatus, OrderStage};
use crate::entities::{car, user};
use crate::error::{AppError, AppResult};
use crate::utils::time::format_timestamp;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCustomer {
    pub id: i32,
    pub full_name: String,
    pub phone_number: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct OrderCar {
    pub id: i32,
    pub name: String,
    pub car_type: String,
    pub price_per_day: i32,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: i32,
    pub customer: OrderCustomer,
    pub car: OrderCar,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: i64,
    pub current_province: String,
    pub destination_province: String,
    /// `self` or `delivery`.
    pub pickup_type: String,
    pub contact_number: String,
    pub total_price: i64,
    pub deposit: i64,
    pub remaining_amount: i64,
    pub status: BookingStatus,
    pub order_stage: OrderStage,
    pub order_stage_display: &'static str,
    pub completed_at: Option<String>,
    pub created_at: String,
}

impl OrderResponse {
    fn new(booking: booking::Model, customer: &user::Model, car: &car::Model) -> Self {
        let pricing = Pricing::from_total(booking.total_price);
        Self {
            id: booking.id,
            customer: OrderCustomer {
                id: customer.id,
                full_name: customer.full_name.clone(),
                phone_number: customer.phone_number.clone(),
                username: customer.username.clone(),
            },
            car: OrderCar {
                id: car.id,
                name: car.name.clone(),
                car_type: car.car_type.clone(),
                price_per_day: car.price_per_day,
            },
            start_date: booking.start_date,
            end_date: booking.end_date,
            days: DateRange::covering(booking.start_date, booking.end_date).days(),
            current_province: booking.current_province,
            destination_province: booking.destination_province,
            pickup_type: booking.pickup_type,
            contact_number: booking.contact_number,
            total_price: pricing.total_price,
            deposit: pricing.deposit,
            remaining_amount: pricing.remaining_amount,
            status: booking.status,
            order_stage: booking.order_stage,
            order_stage_display: booking.order_stage.label(),
            completed_at: booking.completed_at.as_ref().map(format_timestamp),
            created_at: format_timestamp(&booking.created_at),
        }
    }

    /// Keyword match over the fields an operator searches orders by.
    pub fn matches(&self, keyword: &str) -> bool {
        let id = self.id.to_string();
        matches_keyword(
            keyword,
            [
                id.as_str(),
                self.customer.full_name.as_str(),
                self.customer.username.as_str(),
                self.customer.phone_number.as_str(),
                self.car.name.as_str(),
                self.current_province.as_str(),
                self.destination_province.as_str(),
                self.contact_number.as_str(),
                self.status.as_str(),
                self.order_stage.as_str(),
                self.order_stage_display,
            ],
        )
    }
}

/// Joins bookings with their customers and cars, keeping the input order.
pub async fn build_orders(
    db: &DatabaseConnection,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<OrderResponse>> {
    if bookings.is_empty() {
        return Ok(Vec::new());
    }

    let user_ids: Vec<i32> = bookings.iter().map(|b| b.user_id).collect();
    let car_ids: Vec<i32> = bookings.iter().map(|b| b.car_id).collect();

    let users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(user_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let cars: HashMap<i32, car::Model> = car::Entity::find()
        .filter(car::Column::Id.is_in(car_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    bookings
        .into_iter()
        .map(|b| {
            let (Some(customer), Some(car)) = (users.get(&b.user_id), cars.get(&b.car_id)) else {
                return Err(AppError::Internal(format!(
                    "Order {} references a missing customer or car",
                    b.id
                )));
            };
            Ok(OrderResponse::new(b, customer, car))
        })
        .collect()
}

pub async fn build_order(db: &DatabaseConnection, booking: booking::Model) -> AppResult<OrderResponse> {
    build_orders(db, vec![booking])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Order view is empty".to_string()))
}
