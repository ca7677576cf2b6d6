//! Booking rules that do not touch the database.
//!
//! Handlers and services feed these functions plain values (dates, statuses,
//! the current day) and persist whatever they return.

pub mod availability;
pub mod booking;
pub mod order_stage;
pub mod validation;
