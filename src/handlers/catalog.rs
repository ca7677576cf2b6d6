use std::collections::HashMap;

use axum::extract::State;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::config::ShopInfo;
use crate::domain::availability::DateRange;
use crate::domain::booking::parse_date;
use crate::domain::validation::matches_keyword;
use crate::entities::{car, car_image};
use crate::error::{AppError, AppResult};
use crate::services::availability::availability_by_car;
use crate::utils::extract::{AppPath, AppQuery};
use crate::utils::response::{ApiJson, ok};
use crate::utils::time::format_timestamp;

#[derive(Debug, Serialize)]
pub struct CarImageResponse {
    pub id: i32,
    pub image_url: String,
    pub caption: String,
    pub created_at: String,
}

impl From<car_image::Model> for CarImageResponse {
    fn from(image: car_image::Model) -> Self {
        Self {
            id: image.id,
            created_at: format_timestamp(&image.created_at),
            image_url: image.image_url,
            caption: image.caption,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CarResponse {
    pub id: i32,
    pub name: String,
    pub price_per_day: i32,
    pub fuel_type: String,
    pub fuel_consumption: String,
    pub car_type: String,
    pub seat_capacity: i32,
    pub engine_cc: i32,
    pub horsepower: i32,
    pub is_active: bool,
    pub images: Vec<CarImageResponse>,
    /// Present only when the listing was asked about a date range.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl CarResponse {
    fn new(car: car::Model, images: Vec<CarImageResponse>) -> Self {
        Self {
            id: car.id,
            name: car.name,
            price_per_day: car.price_per_day,
            fuel_type: car.fuel_type,
            fuel_consumption: car.fuel_consumption,
            car_type: car.car_type,
            seat_capacity: car.seat_capacity,
            engine_cc: car.engine_cc,
            horsepower: car.horsepower,
            is_active: car.is_active,
            images,
            is_available: None,
        }
    }
}

pub fn car_matches(car: &car::Model, keyword: &str) -> bool {
    matches_keyword(
        keyword,
        [
            car.name.as_str(),
            car.fuel_type.as_str(),
            car.fuel_consumption.as_str(),
            car.car_type.as_str(),
        ],
    )
}

/// Attaches each car's images, oldest first.
pub async fn load_car_responses(
    db: &DatabaseConnection,
    cars: Vec<car::Model>,
) -> AppResult<Vec<CarResponse>> {
    let ids: Vec<i32> = cars.iter().map(|c| c.id).collect();
    let mut images: HashMap<i32, Vec<CarImageResponse>> = HashMap::new();

    if !ids.is_empty() {
        let rows = car_image::Entity::find()
            .filter(car_image::Column::CarId.is_in(ids))
            .order_by_asc(car_image::Column::Id)
            .all(db)
            .await?;
        for image in rows {
            images.entry(image.car_id).or_default().push(image.into());
        }
    }

    Ok(cars
        .into_iter()
        .map(|car| {
            let car_images = images.remove(&car.id).unwrap_or_default();
            CarResponse::new(car, car_images)
        })
        .collect())
}

pub async fn load_car_response(db: &DatabaseConnection, car: car::Model) -> AppResult<CarResponse> {
    load_car_responses(db, vec![car])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("Car view is empty".to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct CarListQuery {
    pub q: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn requested_range(query: &CarListQuery) -> AppResult<Option<DateRange>> {
    let (Some(start), Some(end)) = (query.start_date.as_deref(), query.end_date.as_deref()) else {
        return Ok(None);
    };
    let invalid = || AppError::BadRequest("Dates must use the YYYY-MM-DD format".to_string());
    let start = parse_date(start).ok_or_else(invalid)?;
    let end = parse_date(end).ok_or_else(invalid)?;
    DateRange::new(start, end)
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("Return date must be on or after the pickup date".to_string()))
}

/// List active cars, optionally flagged for a date range
pub async fn list_cars(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CarListQuery>,
) -> AppResult<ApiJson<Vec<CarResponse>>> {
    let range = requested_range(&query)?;
    let keyword = query.q.as_deref().unwrap_or("");

    let cars: Vec<car::Model> = car::Entity::find()
        .filter(car::Column::IsActive.eq(true))
        .order_by_asc(car::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|car| car_matches(car, keyword))
        .collect();

    let mut responses = load_car_responses(&state.db, cars).await?;

    if let Some(range) = range {
        let ids: Vec<i32> = responses.iter().map(|c| c.id).collect();
        let available = availability_by_car(&state.db, &ids, &range).await?;
        for car in &mut responses {
            car.is_available = Some(available.get(&car.id).copied().unwrap_or(true));
        }
    }

    Ok(ok(responses))
}

pub async fn get_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<CarResponse>> {
    let car = car::Entity::find_by_id(id)
        .filter(car::Column::IsActive.eq(true))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))?;

    Ok(ok(load_car_response(&state.db, car).await?))
}

/// Pickup centre for self pickup
pub async fn shop_info(State(state): State<AppState>) -> ApiJson<ShopInfo> {
    ok(state.config.shop.clone())
}
