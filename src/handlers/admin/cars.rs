use axum::{
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::domain::validation::{IntInput, max_len, required};
use crate::entities::{booking, car, car_image};
use crate::error::{AppError, AppResult};
use crate::handlers::SearchQuery;
use crate::handlers::catalog::{
    CarImageResponse, CarResponse, car_matches, load_car_response, load_car_responses,
};
use crate::utils::extract::{AppJson, AppPath, AppQuery};
use crate::utils::media::{remove_car_image, store_car_image, validate_image};
use crate::utils::response::{ApiJson, Message, message, ok};
use crate::utils::time::now;

const MAX_NAME: usize = 100;
const MAX_SPEC_TEXT: usize = 50;
const MAX_IMAGE_URL: usize = 500;
const MAX_CAPTION: usize = 100;
const MAX_SEATS: i32 = 99;
const DEFAULT_SEATS: i32 = 4;

#[derive(Debug, Default, Deserialize)]
pub struct ImageForm {
    pub image_url: Option<String>,
    pub caption: Option<String>,
}

/// Car fields as sent by the admin forms. Numbers may arrive as strings.
#[derive(Debug, Default, Deserialize)]
pub struct CarForm {
    pub name: Option<String>,
    pub price_per_day: Option<IntInput>,
    pub fuel_type: Option<String>,
    pub fuel_consumption: Option<String>,
    pub car_type: Option<String>,
    pub seat_capacity: Option<IntInput>,
    pub engine_cc: Option<IntInput>,
    pub horsepower: Option<IntInput>,
    pub is_active: Option<bool>,
    pub images: Option<Vec<ImageForm>>,
}

fn text_field(field: &str, value: &str, max: usize) -> AppResult<String> {
    let value = required(field, Some(value))?;
    max_len(field, &value, max)?;
    Ok(value)
}

fn parse_caption(raw: Option<&str>) -> AppResult<String> {
    let caption = raw.unwrap_or("").trim().to_string();
    max_len("caption", &caption, MAX_CAPTION)?;
    Ok(caption)
}

fn parse_image_url(raw: Option<&str>) -> AppResult<String> {
    let url = required("image_url", raw)?;
    max_len("image_url", &url, MAX_IMAGE_URL)?;
    Ok(url)
}

/// Validates every image before anything is written.
fn validate_images(images: Option<Vec<ImageForm>>) -> AppResult<Vec<(String, String)>> {
    images
        .unwrap_or_default()
        .iter()
        .map(|img| Ok((parse_image_url(img.image_url.as_deref())?, parse_caption(img.caption.as_deref())?)))
        .collect()
}

async fn insert_image<C>(db: &C, car_id: i32, url: String, caption: String) -> AppResult<car_image::Model>
where
    C: ConnectionTrait,
{
    let image = car_image::ActiveModel {
        car_id: Set(car_id),
        image_url: Set(url),
        caption: Set(caption),
        created_at: Set(now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(image)
}

async fn find_car(db: &DatabaseConnection, id: i32) -> AppResult<car::Model> {
    car::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Car not found".to_string()))
}

async fn find_image(db: &DatabaseConnection, car_id: i32, image_id: i32) -> AppResult<car_image::Model> {
    car_image::Entity::find_by_id(image_id)
        .filter(car_image::Column::CarId.eq(car_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
}

/// All cars, including inactive ones
pub async fn list_cars(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> AppResult<ApiJson<Vec<CarResponse>>> {
    let cars: Vec<car::Model> = car::Entity::find()
        .order_by_asc(car::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|car| car_matches(car, query.keyword()))
        .collect();

    Ok(ok(load_car_responses(&state.db, cars).await?))
}

pub async fn create_car(
    State(state): State<AppState>,
    AppJson(form): AppJson<CarForm>,
) -> AppResult<(StatusCode, ApiJson<CarResponse>)> {
    let name = text_field("name", form.name.as_deref().unwrap_or(""), MAX_NAME)?;
    let price_per_day = form
        .price_per_day
        .ok_or_else(|| AppError::BadRequest("price_per_day is required".to_string()))?
        .bounded("price_per_day", 1, i32::MAX)?;
    let fuel_type = text_field("fuel_type", form.fuel_type.as_deref().unwrap_or(""), MAX_SPEC_TEXT)?;
    let fuel_consumption = text_field(
        "fuel_consumption",
        form.fuel_consumption.as_deref().unwrap_or(""),
        MAX_SPEC_TEXT,
    )?;
    let car_type = text_field("car_type", form.car_type.as_deref().unwrap_or(""), MAX_SPEC_TEXT)?;
    let seat_capacity = match &form.seat_capacity {
        Some(v) => v.bounded("seat_capacity", 1, MAX_SEATS)?,
        None => DEFAULT_SEATS,
    };
    let engine_cc = match &form.engine_cc {
        Some(v) => v.bounded("engine_cc", 0, i32::MAX)?,
        None => 0,
    };
    let horsepower = match &form.horsepower {
        Some(v) => v.bounded("horsepower", 0, i32::MAX)?,
        None => 0,
    };
    let images = validate_images(form.images)?;

    let txn = state.db.begin().await?;
    let car = car::ActiveModel {
        name: Set(name),
        price_per_day: Set(price_per_day),
        fuel_type: Set(fuel_type),
        fuel_consumption: Set(fuel_consumption),
        car_type: Set(car_type),
        seat_capacity: Set(seat_capacity),
        engine_cc: Set(engine_cc),
        horsepower: Set(horsepower),
        is_active: Set(form.is_active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    for (url, caption) in images {
        insert_image(&txn, car.id, url, caption).await?;
    }
    txn.commit().await?;

    tracing::info!(car_id = car.id, name = %car.name, "Car created");
    Ok((StatusCode::CREATED, ok(load_car_response(&state.db, car).await?)))
}

pub async fn get_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<CarResponse>> {
    let car = find_car(&state.db, id).await?;
    Ok(ok(load_car_response(&state.db, car).await?))
}

/// Partial update; supplied images are appended.
pub async fn update_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(form): AppJson<CarForm>,
) -> AppResult<ApiJson<CarResponse>> {
    let existing = find_car(&state.db, id).await?;
    let mut active: car::ActiveModel = existing.clone().into();

    if let Some(name) = &form.name {
        active.name = Set(text_field("name", name, MAX_NAME)?);
    }
    if let Some(price) = &form.price_per_day {
        active.price_per_day = Set(price.bounded("price_per_day", 1, i32::MAX)?);
    }
    if let Some(fuel_type) = &form.fuel_type {
        active.fuel_type = Set(text_field("fuel_type", fuel_type, MAX_SPEC_TEXT)?);
    }
    if let Some(fuel_consumption) = &form.fuel_consumption {
        active.fuel_consumption = Set(text_field("fuel_consumption", fuel_consumption, MAX_SPEC_TEXT)?);
    }
    if let Some(car_type) = &form.car_type {
        active.car_type = Set(text_field("car_type", car_type, MAX_SPEC_TEXT)?);
    }
    if let Some(seats) = &form.seat_capacity {
        active.seat_capacity = Set(seats.bounded("seat_capacity", 1, MAX_SEATS)?);
    }
    if let Some(engine_cc) = &form.engine_cc {
        active.engine_cc = Set(engine_cc.bounded("engine_cc", 0, i32::MAX)?);
    }
    if let Some(horsepower) = &form.horsepower {
        active.horsepower = Set(horsepower.bounded("horsepower", 0, i32::MAX)?);
    }
    if let Some(is_active) = form.is_active {
        active.is_active = Set(is_active);
    }
    let images = validate_images(form.images)?;

    let txn = state.db.begin().await?;
    let car = if active.is_changed() {
        active.update(&txn).await?
    } else {
        existing
    };
    for (url, caption) in images {
        insert_image(&txn, car.id, url, caption).await?;
    }
    txn.commit().await?;

    Ok(ok(load_car_response(&state.db, car).await?))
}

#[derive(Debug, Serialize)]
pub struct CarDeleted {
    pub message: String,
    /// False when the car was only deactivated because bookings reference it.
    pub deleted: bool,
}

pub async fn delete_car(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiJson<CarDeleted>> {
    let car = find_car(&state.db, id).await?;
    // Serializes with booking creation for this car.
    let _guard = state.car_locks.acquire(car.id).await;

    let txn = state.db.begin().await?;
    let bookings = booking::Entity::find()
        .filter(booking::Column::CarId.eq(car.id))
        .count(&txn)
        .await?;

    if bookings > 0 {
        let mut active: car::ActiveModel = car.into();
        active.is_active = Set(false);
        let car = active.update(&txn).await?;
        txn.commit().await?;
        tracing::info!(car_id = car.id, bookings, "Car deactivated instead of deleted");
        return Ok(ok(CarDeleted {
            message: "Car has bookings and was deactivated".to_string(),
            deleted: false,
        }));
    }

    let images = car_image::Entity::find()
        .filter(car_image::Column::CarId.eq(car.id))
        .all(&txn)
        .await?;
    car_image::Entity::delete_many()
        .filter(car_image::Column::CarId.eq(car.id))
        .exec(&txn)
        .await?;
    car::Entity::delete_by_id(car.id).exec(&txn).await?;
    txn.commit().await?;

    for image in &images {
        remove_car_image(&state.config.media_root, &state.config.media_url, &image.image_url).await;
    }

    tracing::warn!(car_id = car.id, images = images.len(), "Car deleted");
    Ok(ok(CarDeleted {
        message: "Car deleted".to_string(),
        deleted: true,
    }))
}

pub async fn list_images(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i32>,
) -> AppResult<ApiJson<Vec<CarImageResponse>>> {
    let car = find_car(&state.db, car_id).await?;
    let images = car_image::Entity::find()
        .filter(car_image::Column::CarId.eq(car.id))
        .order_by_asc(car_image::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(CarImageResponse::from)
        .collect();

    Ok(ok(images))
}

/// Register an image by URL
pub async fn add_image(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i32>,
    AppJson(form): AppJson<ImageForm>,
) -> AppResult<(StatusCode, ApiJson<CarImageResponse>)> {
    let car = find_car(&state.db, car_id).await?;
    let url = parse_image_url(form.image_url.as_deref())?;
    let caption = parse_caption(form.caption.as_deref())?;

    let image = insert_image(&state.db, car.id, url, caption).await?;
    Ok((StatusCode::CREATED, ok(image.into())))
}

pub async fn update_image(
    State(state): State<AppState>,
    AppPath((car_id, image_id)): AppPath<(i32, i32)>,
    AppJson(form): AppJson<ImageForm>,
) -> AppResult<ApiJson<CarImageResponse>> {
    let image = find_image(&state.db, car_id, image_id).await?;
    let mut active: car_image::ActiveModel = image.clone().into();

    if let Some(url) = form.image_url.as_deref() {
        active.image_url = Set(parse_image_url(Some(url))?);
    }
    if let Some(text) = form.caption.as_deref() {
        active.caption = Set(parse_caption(Some(text))?);
    }

    if !active.is_changed() {
        return Ok(ok(image.into()));
    }
    Ok(ok(active.update(&state.db).await?.into()))
}

pub async fn delete_image(
    State(state): State<AppState>,
    AppPath((car_id, image_id)): AppPath<(i32, i32)>,
) -> AppResult<ApiJson<Message>> {
    let image = find_image(&state.db, car_id, image_id).await?;
    car_image::Entity::delete_by_id(image.id).exec(&state.db).await?;
    remove_car_image(&state.config.media_root, &state.config.media_url, &image.image_url).await;
    Ok(message("Image deleted"))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("Image must be 10 MB or smaller".to_string())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// Multipart upload: `image_file` plus an optional `caption`
pub async fn upload_image(
    State(state): State<AppState>,
    AppPath(car_id): AppPath<i32>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, ApiJson<CarImageResponse>)> {
    let car = find_car(&state.db, car_id).await?;

    let mut file = None;
    let mut caption_text = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("image_file") => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            Some("caption") => {
                caption_text = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("image_file is required".to_string()))?;
    let extension = validate_image(&file_name, content_type.as_deref(), bytes.len())?;
    let caption = parse_caption(caption_text.as_deref())?;

    let url = store_car_image(
        &state.config.media_root,
        &state.config.media_url,
        &extension,
        &bytes,
    )
    .await?;
    let image = insert_image(&state.db, car.id, url, caption).await?;

    tracing::info!(car_id = car.id, image_id = image.id, size = bytes.len(), "Car image uploaded");
    Ok((StatusCode::CREATED, ok(image.into())))
}
