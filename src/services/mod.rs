//! Database-backed workflows built on the rules in [`crate::domain`].

pub mod accounts;
pub mod availability;
pub mod bookings;
pub mod orders;
