//! Order-stage progression.
//!
//! A booking moves through the stages strictly in order:
//!
//! ```text
//! awaiting_contact -> awaiting_deposit -> awaiting_handover
//!                  -> awaiting_full_payment -> completed
//! ```
//!
//! Customers confirm the two payment steps themselves; the callback and the
//! handover need an admin. `status` is a separate axis: approval of the
//! callback approves the booking, and a rejected booking never moves again.

use crate::domain::booking::Pricing;
use crate::entities::booking::{BookingStatus, OrderStage};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    #[error("Rejected bookings cannot be advanced")]
    Rejected,
    #[error("This order stage does not require admin approval")]
    NotAdminStage(OrderStage),
    #[error("Order is already rejected")]
    AlreadyRejected,
    #[error("Completed orders cannot be rejected")]
    AlreadyCompleted,
    #[error("Inconsistent booking state: {status:?} at {stage:?}")]
    Inconsistent {
        status: BookingStatus,
        stage: OrderStage,
    },
}

impl From<StageError> for AppError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Inconsistent { .. } => AppError::Internal(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl OrderStage {
    pub const ALL: [OrderStage; 5] = [
        OrderStage::AwaitingContact,
        OrderStage::AwaitingDeposit,
        OrderStage::AwaitingHandover,
        OrderStage::AwaitingFullPayment,
        OrderStage::Completed,
    ];

    pub fn next(self) -> Option<OrderStage> {
        match self {
            OrderStage::AwaitingContact => Some(OrderStage::AwaitingDeposit),
            OrderStage::AwaitingDeposit => Some(OrderStage::AwaitingHandover),
            OrderStage::AwaitingHandover => Some(OrderStage::AwaitingFullPayment),
            OrderStage::AwaitingFullPayment => Some(OrderStage::Completed),
            OrderStage::Completed => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStage::AwaitingContact => "Waiting for callback",
            OrderStage::AwaitingDeposit => "Pay 30% deposit",
            OrderStage::AwaitingHandover => "Waiting for pickup or delivery",
            OrderStage::AwaitingFullPayment => "Pay full amount",
            OrderStage::Completed => "Completed",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStage::AwaitingContact => "awaiting_contact",
            OrderStage::AwaitingDeposit => "awaiting_deposit",
            OrderStage::AwaitingHandover => "awaiting_handover",
            OrderStage::AwaitingFullPayment => "awaiting_full_payment",
            OrderStage::Completed => "completed",
        }
    }

    /// Stages the customer confirms without an admin.
    pub fn customer_confirms(self) -> bool {
        match self {
            OrderStage::AwaitingDeposit | OrderStage::AwaitingFullPayment => true,
            OrderStage::AwaitingContact | OrderStage::AwaitingHandover | OrderStage::Completed => {
                false
            }
        }
    }

    /// Stages only an admin can move past.
    pub fn requires_admin(self) -> bool {
        match self {
            OrderStage::AwaitingContact | OrderStage::AwaitingHandover => true,
            OrderStage::AwaitingDeposit | OrderStage::AwaitingFullPayment | OrderStage::Completed => {
                false
            }
        }
    }
}

/// Legal (status, stage) pairs:
/// pending only before the callback, approved anywhere, rejected anywhere
/// but completed.
pub fn check_consistency(status: BookingStatus, stage: OrderStage) -> Result<(), StageError> {
    let legal = match status {
        BookingStatus::Pending => stage == OrderStage::AwaitingContact,
        BookingStatus::Approved => true,
        BookingStatus::Rejected => stage != OrderStage::Completed,
    };
    if legal {
        Ok(())
    } else {
        Err(StageError::Inconsistent { status, stage })
    }
}

/// A single forward step and the state it leaves the booking in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStage,
    pub to: OrderStage,
    pub status: BookingStatus,
}

impl Transition {
    fn step(status: BookingStatus, from: OrderStage, to: OrderStage) -> Self {
        let status = match (to, status) {
            // Completed bookings are approved; rejected ones never get here.
            (OrderStage::Completed, BookingStatus::Rejected) => BookingStatus::Rejected,
            (OrderStage::Completed, _) => BookingStatus::Approved,
            (OrderStage::AwaitingDeposit, BookingStatus::Pending) => BookingStatus::Approved,
            (_, current) => current,
        };
        Self { from, to, status }
    }

    /// Whether this step stamps `completed_at`.
    pub fn completes(&self) -> bool {
        self.to == OrderStage::Completed
    }
}

/// Outcome of a customer confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(Transition),
    /// The current stage waits on an admin, or the order is finished.
    Unchanged,
}

pub fn customer_advance(status: BookingStatus, stage: OrderStage) -> Result<Advance, StageError> {
    if status == BookingStatus::Rejected {
        return Err(StageError::Rejected);
    }
    check_consistency(status, stage)?;

    if !stage.customer_confirms() {
        return Ok(Advance::Unchanged);
    }
    match stage.next() {
        Some(to) => Ok(Advance::Moved(Transition::step(status, stage, to))),
        None => Ok(Advance::Unchanged),
    }
}

pub fn admin_approve(status: BookingStatus, stage: OrderStage) -> Result<Transition, StageError> {
    if status == BookingStatus::Rejected {
        return Err(StageError::Rejected);
    }
    check_consistency(status, stage)?;

    if !stage.requires_admin() {
        return Err(StageError::NotAdminStage(stage));
    }
    let to = stage.next().ok_or(StageError::NotAdminStage(stage))?;
    Ok(Transition::step(status, stage, to))
}

/// Rejection freezes the stage where it is.
pub fn reject(status: BookingStatus, stage: OrderStage) -> Result<BookingStatus, StageError> {
    match (status, stage) {
        (BookingStatus::Rejected, _) => Err(StageError::AlreadyRejected),
        (_, OrderStage::Completed) => Err(StageError::AlreadyCompleted),
        (BookingStatus::Pending | BookingStatus::Approved, _) => Ok(BookingStatus::Rejected),
    }
}

/// Title and message sent to the customer after an admin approval.
pub fn approval_notice(transition: &Transition, booking_id: i32, pricing: &Pricing) -> (String, String) {
    match transition.to {
        OrderStage::AwaitingDeposit => (
            "Booking confirmed".to_string(),
            format!(
                "Order #{booking_id} was confirmed by our staff. Please pay the 30% deposit of {} THB.",
                pricing.deposit
            ),
        ),
        OrderStage::AwaitingFullPayment => (
            "Car handed over".to_string(),
            format!(
                "Order #{booking_id} handover is confirmed. Please pay the remaining {} THB.",
                pricing.remaining_amount
            ),
        ),
        other => (
            "Order updated".to_string(),
            format!("Order #{booking_id} is now: {}.", other.label()),
        ),
    }
}

pub fn rejection_notice(booking_id: i32) -> (String, String) {
    (
        "Booking rejected".to_string(),
        format!("Order #{booking_id} was rejected. Please contact us for details."),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn successor_map_is_linear() {
        for pair in OrderStage::ALL.windows(2) {
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(OrderStage::Completed.next(), None);
    }

    #[rstest]
    #[case(OrderStage::AwaitingContact)]
    #[case(OrderStage::AwaitingHandover)]
    #[case(OrderStage::Completed)]
    fn customer_advance_is_noop_on_admin_and_final_stages(#[case] stage: OrderStage) {
        assert_eq!(
            customer_advance(BookingStatus::Approved, stage).unwrap(),
            Advance::Unchanged
        );
    }

    #[test]
    fn customer_advance_on_pending_callback_is_noop() {
        assert_eq!(
            customer_advance(BookingStatus::Pending, OrderStage::AwaitingContact).unwrap(),
            Advance::Unchanged
        );
    }

    #[test]
    fn customer_pays_deposit() {
        let Advance::Moved(t) =
            customer_advance(BookingStatus::Approved, OrderStage::AwaitingDeposit).unwrap()
        else {
            panic!("expected a move");
        };
        assert_eq!(t.to, OrderStage::AwaitingHandover);
        assert!(!t.completes());
    }

    #[test]
    fn customer_full_payment_completes() {
        let Advance::Moved(t) =
            customer_advance(BookingStatus::Approved, OrderStage::AwaitingFullPayment).unwrap()
        else {
            panic!("expected a move");
        };
        assert_eq!(t.to, OrderStage::Completed);
        assert_eq!(t.status, BookingStatus::Approved);
        assert!(t.completes());
    }

    #[rstest]
    #[case(OrderStage::AwaitingContact)]
    #[case(OrderStage::AwaitingDeposit)]
    #[case(OrderStage::AwaitingFullPayment)]
    fn rejected_bookings_are_frozen(#[case] stage: OrderStage) {
        assert_eq!(
            customer_advance(BookingStatus::Rejected, stage).unwrap_err(),
            StageError::Rejected
        );
        assert_eq!(
            admin_approve(BookingStatus::Rejected, stage).unwrap_err(),
            StageError::Rejected
        );
    }

    #[test]
    fn admin_callback_approval_approves_booking() {
        let t = admin_approve(BookingStatus::Pending, OrderStage::AwaitingContact).unwrap();
        assert_eq!(t.to, OrderStage::AwaitingDeposit);
        assert_eq!(t.status, BookingStatus::Approved);
    }

    #[test]
    fn admin_handover_approval() {
        let t = admin_approve(BookingStatus::Approved, OrderStage::AwaitingHandover).unwrap();
        assert_eq!(t.to, OrderStage::AwaitingFullPayment);
    }

    #[rstest]
    #[case(OrderStage::AwaitingDeposit)]
    #[case(OrderStage::AwaitingFullPayment)]
    #[case(OrderStage::Completed)]
    fn admin_cannot_approve_customer_stages(#[case] stage: OrderStage) {
        let err = admin_approve(BookingStatus::Approved, stage).unwrap_err();
        assert_eq!(err, StageError::NotAdminStage(stage));
        assert_eq!(err.to_string(), "This order stage does not require admin approval");
    }

    #[rstest]
    #[case(BookingStatus::Pending, OrderStage::AwaitingDeposit, false)]
    #[case(BookingStatus::Pending, OrderStage::AwaitingContact, true)]
    #[case(BookingStatus::Approved, OrderStage::Completed, true)]
    #[case(BookingStatus::Rejected, OrderStage::Completed, false)]
    #[case(BookingStatus::Rejected, OrderStage::AwaitingHandover, true)]
    fn consistency_table(
        #[case] status: BookingStatus,
        #[case] stage: OrderStage,
        #[case] legal: bool,
    ) {
        assert_eq!(check_consistency(status, stage).is_ok(), legal);
    }

    #[test]
    fn reject_rules() {
        assert_eq!(
            reject(BookingStatus::Pending, OrderStage::AwaitingContact).unwrap(),
            BookingStatus::Rejected
        );
        assert_eq!(
            reject(BookingStatus::Approved, OrderStage::Completed).unwrap_err(),
            StageError::AlreadyCompleted
        );
        assert_eq!(
            reject(BookingStatus::Rejected, OrderStage::AwaitingDeposit).unwrap_err(),
            StageError::AlreadyRejected
        );
    }

    #[test]
    fn approval_notice_mentions_amounts() {
        let pricing = Pricing::from_total(1500);
        let t = admin_approve(BookingStatus::Pending, OrderStage::AwaitingContact).unwrap();
        let (title, message) = approval_notice(&t, 7, &pricing);
        assert_eq!(title, "Booking confirmed");
        assert!(message.contains("#7"));
        assert!(message.contains("450"));
    }
}
