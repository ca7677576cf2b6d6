//! Booking form validation and pricing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::availability::DateRange;
use crate::domain::validation::{IntInput, is_valid_phone};
use crate::entities::booking::PickupType;
use crate::error::AppError;

/// Share of the total collected up front.
pub const DEPOSIT_PERCENT: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("car_id must be a positive integer")]
    InvalidCarId,
    #[error("Pickup type must be either 'self' or 'delivery'")]
    InvalidPickupType,
    #[error("Contact number must be exactly 10 digits")]
    InvalidContactNumber,
    #[error("User not found")]
    UserNotFound,
    #[error("Car not found or not available for booking")]
    CarUnavailable,
    #[error("Dates must use the YYYY-MM-DD format")]
    InvalidDate,
    #[error("Bookings must be made at least 1 day in advance")]
    StartNotInFuture,
    #[error("Return date must be on or after the pickup date")]
    EndBeforeStart,
    #[error("This car is already booked for the selected dates")]
    Overlap,
    #[error("Booking period is too long")]
    PriceOverflow,
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::UserNotFound | BookingError::CarUnavailable => {
                AppError::NotFound(err.to_string())
            }
            BookingError::Overlap => AppError::Conflict(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

/// Total, deposit and outstanding amount for a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pricing {
    pub total_price: i64,
    pub deposit: i64,
    pub remaining_amount: i64,
}

impl Pricing {
    pub fn from_total(total_price: i64) -> Self {
        // Totals are never negative, so integer division floors.
        let deposit = total_price * DEPOSIT_PERCENT / 100;
        Self {
            total_price,
            deposit,
            remaining_amount: total_price - deposit,
        }
    }

    /// Price for renting at `price_per_day` over every day of `range`.
    pub fn quote(price_per_day: i32, range: &DateRange) -> Option<Self> {
        i64::from(price_per_day)
            .checked_mul(range.days())
            .map(Self::from_total)
    }
}

/// Raw booking request as submitted by a customer. `car_id` may arrive as a
/// number or a numeric string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingForm {
    pub car_id: Option<IntInput>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub pickup_type: Option<String>,
    pub current_province: Option<String>,
    pub destination_province: Option<String>,
    pub contact_number: Option<String>,
}

/// A booking form whose fields are present and well formed. Dates are still
/// raw strings: they are parsed only after the car has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedBooking {
    pub car_id: i32,
    pub start_date: String,
    pub end_date: String,
    pub pickup_type: PickupType,
    pub current_province: String,
    pub destination_province: String,
    pub contact_number: String,
}

fn present(value: Option<String>, field: &'static str) -> Result<String, BookingError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(BookingError::MissingField(field))
}

impl BookingForm {
    /// Presence checks first, then the car id, pickup type and contact number.
    pub fn validate(self) -> Result<ValidatedBooking, BookingError> {
        let car_id = self
            .car_id
            .filter(|id| !id.is_blank())
            .ok_or(BookingError::MissingField("car_id"))?;
        let start_date = present(self.start_date, "start_date")?;
        let end_date = present(self.end_date, "end_date")?;
        let pickup_type = present(self.pickup_type, "pickup_type")?;
        let current_province = present(self.current_province, "current_province")?;
        let destination_province = present(self.destination_province, "destination_province")?;
        let contact_number = present(self.contact_number, "contact_number")?;

        let car_id = car_id
            .value()
            .and_then(|id| i32::try_from(id).ok())
            .filter(|id| *id > 0)
            .ok_or(BookingError::InvalidCarId)?;
        let pickup_type = PickupType::parse(&pickup_type).ok_or(BookingError::InvalidPickupType)?;

        if !is_valid_phone(&contact_number) {
            return Err(BookingError::InvalidContactNumber);
        }

        Ok(ValidatedBooking {
            car_id,
            start_date,
            end_date,
            pickup_type,
            current_province,
            destination_province,
            contact_number,
        })
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parses and checks a rental period against the current day.
pub fn rental_period(start: &str, end: &str, today: NaiveDate) -> Result<DateRange, BookingError> {
    let start = parse_date(start).ok_or(BookingError::InvalidDate)?;
    let end = parse_date(end).ok_or(BookingError::InvalidDate)?;

    if start <= today {
        return Err(BookingError::StartNotInFuture);
    }

    DateRange::new(start, end).ok_or(BookingError::EndBeforeStart)
}

impl ValidatedBooking {
    pub fn period(&self, today: NaiveDate) -> Result<DateRange, BookingError> {
        rental_period(&self.start_date, &self.end_date, today)
    }
}
