mod support;

use axum::http::StatusCode;
use chrono::NaiveDate;
use serde_json::json;

use sea_orm::{ConnectionTrait, DbBackend, EntityTrait, Statement};

use car_rental_backend::domain::booking::BookingForm;
use car_rental_backend::entities::booking::{self, BookingStatus, OrderStage, PickupType};
use car_rental_backend::entities::{car, user};
use car_rental_backend::services::{bookings, orders};
use support::{TestApp, booking_body, days_from_today};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn form(car_id: i64, start: &str, end: &str) -> BookingForm {
    serde_json::from_value(booking_body(car_id, d(start), d(end))).unwrap()
}

#[tokio::test]
async fn booking_is_priced_and_progresses_through_approval() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (alice, alice_session) = app.customer("alice", "0812345678").await;
    let car = app.car(&admin, "Toyota Yaris", 500).await;

    let today = d("2025-01-01");
    let booking = bookings::create_booking(
        &app.state,
        alice as i32,
        form(car, "2025-01-10", "2025-01-12"),
        today,
    )
    .await
    .unwrap();

    assert_eq!(booking.total_price, 1500);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.order_stage, OrderStage::AwaitingContact);
    assert!(booking.completed_at.is_none());

    let order = app
        .get(&format!("/api/bookings/{}", booking.id), Some(&alice_session))
        .await;
    let data = order.assert_ok();
    assert_eq!(data["deposit"], 450);
    assert_eq!(data["remaining_amount"], 1050);
    assert_eq!(data["days"], 3);

    // The callback waits on an admin.
    let outcome = orders::advance_as_customer(&app.state.db, alice as i32, booking.id)
        .await
        .unwrap();
    assert!(!outcome.advanced);
    assert_eq!(outcome.booking.order_stage, OrderStage::AwaitingContact);

    let approved = app
        .post(
            &format!("/admin/api/orders/{}/approve", booking.id),
            Some(&admin),
            json!({}),
        )
        .await;
    let data = approved.assert_ok();
    assert_eq!(data["order_stage"], "awaiting_deposit");
    assert_eq!(data["status"], "approved");

    let notifications = app.get("/api/notifications", Some(&alice_session)).await;
    let data = notifications.assert_ok();
    assert_eq!(data["items"].as_array().unwrap().len(), 1);
    assert_eq!(data["unread_count"], 1);
    assert_eq!(data["items"][0]["booking_id"], booking.id);
}

#[tokio::test]
async fn bookings_must_start_after_today() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("bob", "0899999999").await;
    let car = app.car(&admin, "Honda City", 800).await;

    let same_day = app
        .book(&session, car, days_from_today(0), days_from_today(1))
        .await;
    assert_eq!(
        same_day.assert_error(StatusCode::BAD_REQUEST),
        "Bookings must be made at least 1 day in advance"
    );

    let tomorrow = app
        .book(&session, car, days_from_today(1), days_from_today(1))
        .await;
    assert_eq!(tomorrow.status, StatusCode::CREATED);
    assert_eq!(tomorrow.assert_ok()["total_price"], 800);
}

#[tokio::test]
async fn overlapping_bookings_are_refused_until_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, first) = app.customer("carol", "0811111111").await;
    let (_, second) = app.customer("dave", "0822222222").await;
    let car = app.car(&admin, "Mazda 2", 600).await;

    let held = app
        .book(&first, car, days_from_today(10), days_from_today(12))
        .await;
    let held_id = held.assert_ok()["id"].as_i64().unwrap();

    // Shares only the last day.
    let clash = app
        .book(&second, car, days_from_today(12), days_from_today(14))
        .await;
    assert_eq!(
        clash.assert_error(StatusCode::BAD_REQUEST),
        "This car is already booked for the selected dates"
    );

    let adjacent = app
        .book(&second, car, days_from_today(13), days_from_today(14))
        .await;
    assert_eq!(adjacent.status, StatusCode::CREATED);

    app.post(
        &format!("/admin/api/orders/{held_id}/reject"),
        Some(&admin),
        json!({}),
    )
    .await
    .assert_ok();

    let retry = app
        .book(&second, car, days_from_today(10), days_from_today(12))
        .await;
    assert_eq!(retry.status, StatusCode::CREATED);
}

#[tokio::test]
async fn concurrent_requests_for_the_same_dates_admit_one_booking() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (erin, _) = app.customer("erin", "0833333333").await;
    let (frank, _) = app.customer("frank", "0844444444").await;
    let car = app.car(&admin, "Isuzu D-Max", 1200).await;

    let today = d("2025-03-01");
    let (a, b) = tokio::join!(
        bookings::create_booking(
            &app.state,
            erin as i32,
            form(car, "2025-03-05", "2025-03-08"),
            today
        ),
        bookings::create_booking(
            &app.state,
            frank as i32,
            form(car, "2025-03-07", "2025-03-09"),
            today
        ),
    );

    assert_eq!(
        [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
        1,
        "exactly one booking must win"
    );
}

#[tokio::test]
async fn full_lifecycle_ends_in_history() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("gina", "0855555555").await;
    let car = app.car(&admin, "Nissan Almera", 700).await;

    let created = app
        .book(&session, car, days_from_today(3), days_from_today(4))
        .await;
    let id = created.assert_ok()["id"].as_i64().unwrap();
    let advance = format!("/api/bookings/{id}/advance");
    let approve = format!("/admin/api/orders/{id}/approve");

    let step = app.post(&approve, Some(&admin), json!({})).await;
    assert_eq!(step.assert_ok()["order_stage"], "awaiting_deposit");

    let step = app.post(&advance, Some(&session), json!({})).await;
    let data = step.assert_ok();
    assert_eq!(data["advanced"], true);
    assert_eq!(data["order"]["order_stage"], "awaiting_handover");

    // Handover waits on the admin.
    let step = app.post(&advance, Some(&session), json!({})).await;
    assert_eq!(step.assert_ok()["advanced"], false);

    let step = app.post(&approve, Some(&admin), json!({})).await;
    assert_eq!(step.assert_ok()["order_stage"], "awaiting_full_payment");

    let step = app.post(&approve, Some(&admin), json!({})).await;
    assert_eq!(
        step.assert_error(StatusCode::BAD_REQUEST),
        "This order stage does not require admin approval"
    );

    let step = app.post(&advance, Some(&session), json!({})).await;
    let data = step.assert_ok();
    assert_eq!(data["order"]["order_stage"], "completed");
    assert_eq!(data["order"]["status"], "approved");
    assert!(data["order"]["completed_at"].is_string());

    let step = app.post(&advance, Some(&session), json!({})).await;
    assert_eq!(step.assert_ok()["advanced"], false);

    let history = app.get("/api/history", Some(&session)).await;
    let items = history.assert_ok().as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);

    let admin_history = app.get("/admin/api/history", Some(&admin)).await;
    assert_eq!(admin_history.assert_ok().as_array().unwrap().len(), 1);

    let open = app.get("/admin/api/orders", Some(&admin)).await;
    assert!(open.assert_ok().as_array().unwrap().is_empty());

    let reject = app
        .post(&format!("/admin/api/orders/{id}/reject"), Some(&admin), json!({}))
        .await;
    assert_eq!(
        reject.assert_error(StatusCode::BAD_REQUEST),
        "Completed orders cannot be rejected"
    );
}

#[tokio::test]
async fn rejected_orders_never_move_again() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("hank", "0866666666").await;
    let car = app.car(&admin, "Ford Ranger", 1500).await;

    let created = app
        .book(&session, car, days_from_today(5), days_from_today(6))
        .await;
    let id = created.assert_ok()["id"].as_i64().unwrap();

    let rejected = app
        .post(&format!("/admin/api/orders/{id}/reject"), Some(&admin), json!({}))
        .await;
    let data = rejected.assert_ok();
    assert_eq!(data["status"], "rejected");
    assert_eq!(data["order_stage"], "awaiting_contact");

    let advance = app
        .post(&format!("/api/bookings/{id}/advance"), Some(&session), json!({}))
        .await;
    assert_eq!(
        advance.assert_error(StatusCode::BAD_REQUEST),
        "Rejected bookings cannot be advanced"
    );

    let approve = app
        .post(&format!("/admin/api/orders/{id}/approve"), Some(&admin), json!({}))
        .await;
    approve.assert_error(StatusCode::BAD_REQUEST);

    let again = app
        .post(&format!("/admin/api/orders/{id}/reject"), Some(&admin), json!({}))
        .await;
    assert_eq!(
        again.assert_error(StatusCode::BAD_REQUEST),
        "Order is already rejected"
    );
}

#[tokio::test]
async fn booking_form_errors_are_reported_in_order() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("ivy", "0877777777").await;
    let car = app.car(&admin, "Suzuki Swift", 400).await;

    let mut body = booking_body(car, days_from_today(2), days_from_today(3));
    body["pickup_type"] = json!("teleport");
    body["contact_number"] = json!("");
    let missing = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(
        missing.assert_error(StatusCode::BAD_REQUEST),
        "contact_number is required"
    );

    let mut body = booking_body(car, days_from_today(2), days_from_today(3));
    body["pickup_type"] = json!("teleport");
    let pickup = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(
        pickup.assert_error(StatusCode::BAD_REQUEST),
        "Pickup type must be either 'self' or 'delivery'"
    );

    let mut body = booking_body(car, days_from_today(2), days_from_today(3));
    body["contact_number"] = json!("12345");
    let contact = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(
        contact.assert_error(StatusCode::BAD_REQUEST),
        "Contact number must be exactly 10 digits"
    );

    let unknown_car = app
        .book(&session, 9999, days_from_today(2), days_from_today(3))
        .await;
    unknown_car.assert_error(StatusCode::NOT_FOUND);

    let mut body = booking_body(car, days_from_today(2), days_from_today(3));
    body["start_date"] = json!("next tuesday");
    let bad_date = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(
        bad_date.assert_error(StatusCode::BAD_REQUEST),
        "Dates must use the YYYY-MM-DD format"
    );

    let reversed = app
        .book(&session, car, days_from_today(5), days_from_today(4))
        .await;
    assert_eq!(
        reversed.assert_error(StatusCode::BAD_REQUEST),
        "Return date must be on or after the pickup date"
    );
}

#[tokio::test]
async fn availability_endpoint_quotes_and_flags() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("jack", "0888888888").await;
    let car = app.car(&admin, "Toyota Vios", 1000).await;

    let start = days_from_today(20);
    let end = days_from_today(21);
    let uri = format!("/api/bookings/availability?car_id={car}&start_date={start}&end_date={end}");

    let before = app.get(&uri, Some(&session)).await;
    let data = before.assert_ok();
    assert_eq!(data["is_available"], true);
    assert_eq!(data["days"], 2);
    assert_eq!(data["total_price"], 2000);
    assert_eq!(data["deposit"], 600);

    app.book(&session, car, start, end).await.assert_ok();

    let after = app.get(&uri, Some(&session)).await;
    assert_eq!(after.assert_ok()["is_available"], false);

    let listed = app
        .get(&format!("/api/cars?start_date={start}&end_date={end}"), None)
        .await;
    let cars = listed.assert_ok().as_array().unwrap().clone();
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0]["is_available"], false);

    let unfiltered = app.get("/api/cars", None).await;
    assert!(unfiltered.assert_ok()[0].get("is_available").is_none());
}

#[tokio::test]
async fn customers_only_see_their_own_orders() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, owner) = app.customer("kate", "0810000001").await;
    let (_, other) = app.customer("liam", "0810000002").await;
    let car = app.car(&admin, "Kia Soluto", 650).await;

    let created = app
        .book(&owner, car, days_from_today(7), days_from_today(8))
        .await;
    let id = created.assert_ok()["id"].as_i64().unwrap();

    let peek = app.get(&format!("/api/bookings/{id}"), Some(&other)).await;
    assert_eq!(
        peek.assert_error(StatusCode::FORBIDDEN),
        "You can only view your own orders"
    );

    let advance = app
        .post(&format!("/api/bookings/{id}/advance"), Some(&other), json!({}))
        .await;
    advance.assert_error(StatusCode::FORBIDDEN);

    let list = app.get("/api/bookings", Some(&other)).await;
    assert!(list.assert_ok().as_array().unwrap().is_empty());

    let missing = app.get("/api/bookings/424242", Some(&owner)).await;
    assert_eq!(missing.assert_error(StatusCode::NOT_FOUND), "Order not found");
}

async fn stored_pickup_type(app: &TestApp, booking_id: i64) -> String {
    let row = app
        .state
        .db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT pickup_type FROM booking WHERE id = ?",
            [booking_id.into()],
        ))
        .await
        .unwrap()
        .expect("booking row");
    row.try_get::<String>("", "pickup_type").unwrap()
}

#[tokio::test]
async fn pickup_type_is_stored_as_its_wire_name() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("kim", "0866666666").await;
    let car = app.car(&admin, "Nissan Almera", 700).await;

    for (offset, pickup) in [(2, "self"), (6, "delivery")] {
        let mut body = booking_body(car, days_from_today(offset), days_from_today(offset + 1));
        body["pickup_type"] = json!(pickup);
        let created = app.post("/api/bookings", Some(&session), body).await;
        let data = created.assert_ok();
        assert_eq!(data["pickup_type"], pickup);

        let id = data["id"].as_i64().unwrap();
        assert_eq!(stored_pickup_type(&app, id).await, pickup);

        let model = booking::Entity::find_by_id(id as i32)
            .one(&app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(model.pickup(), PickupType::parse(pickup));
    }
}

#[tokio::test]
async fn car_id_may_be_sent_as_a_string() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (_, session) = app.customer("lena", "0855555555").await;
    let car = app.car(&admin, "Mazda 2", 650).await;

    let mut body = booking_body(car, days_from_today(2), days_from_today(2));
    body["car_id"] = json!(car.to_string());
    let created = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(created.assert_ok()["car"]["id"], car);

    let mut body = booking_body(car, days_from_today(4), days_from_today(4));
    body["car_id"] = json!("abc");
    let invalid = app.post("/api/bookings", Some(&session), body).await;
    assert_eq!(
        invalid.assert_error(StatusCode::BAD_REQUEST),
        "car_id must be a positive integer"
    );
}

#[tokio::test]
async fn booked_cars_and_customers_cannot_be_deleted_underneath_a_booking() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let (customer, session) = app.customer("mona", "0844444444").await;
    let car_id = app.car(&admin, "Ford Ranger", 1800).await;
    let created = app
        .book(&session, car_id, days_from_today(3), days_from_today(4))
        .await;
    let booking_id = created.assert_ok()["id"].as_i64().unwrap() as i32;

    assert!(car::Entity::delete_by_id(car_id as i32).exec(&app.state.db).await.is_err());
    assert!(user::Entity::delete_by_id(customer as i32).exec(&app.state.db).await.is_err());
    assert!(
        booking::Entity::find_by_id(booking_id)
            .one(&app.state.db)
            .await
            .unwrap()
            .is_some()
    );

    let removed = app
        .delete(&format!("/admin/api/cars/{car_id}"), Some(&admin))
        .await;
    assert_eq!(removed.assert_ok()["deleted"], false);
    let removed = app
        .delete(&format!("/admin/api/users/{customer}"), Some(&admin))
        .await;
    assert_eq!(
        removed.assert_error(StatusCode::BAD_REQUEST),
        "User has bookings and cannot be deleted"
    );
}
