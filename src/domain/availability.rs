//! Inclusive date ranges and the overlap rule for car availability.

use chrono::NaiveDate;
use serde::Serialize;

use crate::entities::booking::BookingStatus;

/// A closed interval of calendar days, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end >= start).then_some(Self { start, end })
    }

    /// Builds a range from stored dates, swapping them if a row is inverted
    /// so a malformed booking still blocks every day it mentions.
    pub fn covering(a: NaiveDate, b: NaiveDate) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of rental days, counting both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

/// True when no blocking booking in `existing` overlaps `requested`.
pub fn is_available<I>(requested: &DateRange, existing: I) -> bool
where
    I: IntoIterator<Item = (BookingStatus, DateRange)>,
{
    !existing
        .into_iter()
        .any(|(status, range)| status.is_blocking() && range.overlaps(requested))
}
