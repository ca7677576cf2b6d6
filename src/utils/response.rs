use axum::Json;
use serde::Serialize;

/// Success envelope: `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiJson<T> = Json<ApiResponse<T>>;

pub fn ok<T: Serialize>(data: T) -> ApiJson<T> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

pub fn message(text: impl Into<String>) -> ApiJson<Message> {
    ok(Message {
        message: text.into(),
    })
}
