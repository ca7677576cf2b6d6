//! Shared harness: the full router over a fresh in-memory SQLite database.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{Duration, NaiveDate};
use http_body_util::BodyExt;
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tower::ServiceExt;

use car_rental_backend::{
    AppState, Config, db, routes::create_router, services::accounts::seed_admin,
    utils::time::today,
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }

    pub fn assert_ok(&self) -> &Value {
        assert!(
            self.status.is_success(),
            "expected success, got {}: {}",
            self.status,
            self.body
        );
        assert_eq!(self.body["success"], true);
        self.data()
    }

    pub fn assert_error(&self, status: StatusCode) -> &str {
        assert_eq!(self.status, status, "unexpected body: {}", self.body);
        assert_eq!(self.body["success"], false);
        self.message()
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = db::connect_url("sqlite::memory:")
            .await
            .expect("in-memory database");
        migration::Migrator::up(&db, None)
            .await
            .expect("migrations apply");

        let media_root = std::env::temp_dir().join(format!(
            "car-rental-test-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let config = Config {
            media_root,
            ..Config::default()
        };
        seed_admin(&db, &config.admin).await.expect("admin seeded");

        let state = AppState::new(db, config);
        let router = create_router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        session: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {session}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        self.send(request).await
    }

    pub async fn get(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.call(Method::GET, uri, session, None).await
    }

    pub async fn post(&self, uri: &str, session: Option<&str>, body: Value) -> TestResponse {
        self.call(Method::POST, uri, session, Some(body)).await
    }

    pub async fn put(&self, uri: &str, session: Option<&str>, body: Value) -> TestResponse {
        self.call(Method::PUT, uri, session, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, session: Option<&str>) -> TestResponse {
        self.call(Method::DELETE, uri, session, None).await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        response.assert_ok()["session_id"]
            .as_str()
            .expect("session id in login response")
            .to_string()
    }

    pub async fn admin(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Signs up a customer and returns `(user id, session id)`.
    pub async fn customer(&self, username: &str, phone_number: &str) -> (i64, String) {
        let response = self
            .post(
                "/api/auth/signup",
                None,
                json!({
                    "fullName": format!("{username} Tester"),
                    "phoneNumber": phone_number,
                    "username": username,
                    "password": "pass1",
                }),
            )
            .await;
        let id = response.assert_ok()["id"].as_i64().expect("user id");
        (id, self.login(username, "pass1").await)
    }

    pub async fn car(&self, admin: &str, name: &str, price_per_day: i64) -> i64 {
        let response = self
            .post(
                "/admin/api/cars",
                Some(admin),
                json!({
                    "name": name,
                    "price_per_day": price_per_day,
                    "fuel_type": "Petrol",
                    "fuel_consumption": "15 km/l",
                    "car_type": "Sedan",
                }),
            )
            .await;
        response.assert_ok()["id"].as_i64().expect("car id")
    }

    pub async fn book(
        &self,
        session: &str,
        car_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> TestResponse {
        self.post("/api/bookings", Some(session), booking_body(car_id, start, end))
            .await
    }
}

pub fn booking_body(car_id: i64, start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "car_id": car_id,
        "start_date": start.to_string(),
        "end_date": end.to_string(),
        "pickup_type": "self",
        "current_province": "Bangkok",
        "destination_province": "Chiang Mai",
        "contact_number": "0812345678",
    })
}

/// A date `n` days after the server's current day.
pub fn days_from_today(n: i64) -> NaiveDate {
    today() + Duration::days(n)
}

pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session_id="))
        .map(str::to_string)
}
