use car_rental_backend::domain::availability::{DateRange, is_available};
use car_rental_backend::domain::booking::Pricing;
use car_rental_backend::domain::order_stage::{
    Advance, admin_approve, check_consistency, customer_advance, reject,
};
use car_rental_backend::entities::booking::{BookingStatus, OrderStage};
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn range(offset: i64, len: i64) -> DateRange {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let start = base + Duration::days(offset);
    DateRange::new(start, start + Duration::days(len)).unwrap()
}

fn any_stage() -> impl Strategy<Value = OrderStage> {
    prop_oneof![
        Just(OrderStage::AwaitingContact),
        Just(OrderStage::AwaitingDeposit),
        Just(OrderStage::AwaitingHandover),
        Just(OrderStage::AwaitingFullPayment),
        Just(OrderStage::Completed),
    ]
}

fn any_status() -> impl Strategy<Value = BookingStatus> {
    prop_oneof![
        Just(BookingStatus::Pending),
        Just(BookingStatus::Approved),
        Just(BookingStatus::Rejected),
    ]
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in 0i64..60, a_len in 0i64..10, b in 0i64..60, b_len in 0i64..10) {
        let first = range(a, a_len);
        let second = range(b, b_len);
        prop_assert_eq!(first.overlaps(&second), second.overlaps(&first));
    }

    #[test]
    fn overlap_matches_shared_days(a in 0i64..60, a_len in 0i64..10, b in 0i64..60, b_len in 0i64..10) {
        let first = range(a, a_len);
        let second = range(b, b_len);
        let shares_a_day = (a..=a + a_len).any(|day| (b..=b + b_len).contains(&day));
        prop_assert_eq!(first.overlaps(&second), shares_a_day);
    }

    #[test]
    fn rejected_bookings_never_block(a in 0i64..60, a_len in 0i64..10, b in 0i64..60, b_len in 0i64..10) {
        let requested = range(a, a_len);
        let existing = range(b, b_len);
        prop_assert!(is_available(&requested, [(BookingStatus::Rejected, existing)]));
        prop_assert_eq!(
            is_available(&requested, [(BookingStatus::Pending, existing)]),
            !requested.overlaps(&existing)
        );
    }

    #[test]
    fn deposit_and_remainder_add_up(price in 1i32..100_000, len in 0i64..60) {
        let pricing = Pricing::quote(price, &range(0, len)).unwrap();
        prop_assert_eq!(pricing.total_price, i64::from(price) * (len + 1));
        prop_assert_eq!(pricing.deposit + pricing.remaining_amount, pricing.total_price);
        prop_assert!(pricing.deposit <= pricing.remaining_amount);
    }

    #[test]
    fn stage_moves_are_single_forward_steps(status in any_status(), stage in any_stage()) {
        if let Ok(Advance::Moved(t)) = customer_advance(status, stage) {
            prop_assert_eq!(t.from, stage);
            prop_assert_eq!(Some(t.to), stage.next());
            prop_assert!(check_consistency(t.status, t.to).is_ok());
        }
        if let Ok(t) = admin_approve(status, stage) {
            prop_assert_eq!(t.from, stage);
            prop_assert_eq!(Some(t.to), stage.next());
            prop_assert_ne!(t.status, BookingStatus::Rejected);
            prop_assert!(check_consistency(t.status, t.to).is_ok());
        }
    }

    #[test]
    fn rejected_is_terminal(stage in any_stage()) {
        prop_assert!(customer_advance(BookingStatus::Rejected, stage).is_err());
        prop_assert!(admin_approve(BookingStatus::Rejected, stage).is_err());
        prop_assert!(reject(BookingStatus::Rejected, stage).is_err());
    }

    #[test]
    fn customers_and_admins_never_share_a_stage(stage in any_stage()) {
        prop_assert!(!(stage.customer_confirms() && stage.requires_admin()));
    }
}
