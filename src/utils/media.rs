//! Uploaded car images on local disk.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
pub const CAR_IMAGE_DIR: &str = "car_images";

/// Checks an upload and returns its lower-cased extension.
pub fn validate_image(file_name: &str, content_type: Option<&str>, size: usize) -> AppResult<String> {
    if size == 0 {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }
    if size > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(
            "Image must be 10 MB or smaller".to_string(),
        ));
    }

    let is_image = content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);
    if !is_image {
        return Err(AppError::BadRequest(
            "Only image files can be uploaded".to_string(),
        ));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Image extension must be one of: {}",
                ALLOWED_EXTENSIONS.join(", ")
            ))
        })?;

    Ok(extension)
}

/// Writes `bytes` under `<media_root>/car_images/` and returns the public URL.
pub async fn store_car_image(
    media_root: &Path,
    media_url: &str,
    extension: &str,
    bytes: &[u8],
) -> AppResult<String> {
    let dir = media_root.join(CAR_IMAGE_DIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create media directory: {}", e)))?;

    let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);
    tokio::fs::write(dir.join(&file_name), bytes)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to store image: {}", e)))?;

    Ok(format!("{media_url}{CAR_IMAGE_DIR}/{file_name}"))
}

/// Maps a stored image URL back to its file. Only URLs this module produced
/// resolve; external URLs and anything with path separators yield `None`.
pub fn local_image_path(media_root: &Path, media_url: &str, image_url: &str) -> Option<PathBuf> {
    let file_name = image_url
        .strip_prefix(media_url)?
        .strip_prefix(CAR_IMAGE_DIR)?
        .strip_prefix('/')?;
    if file_name.is_empty() || file_name.starts_with('.') || file_name.contains(['/', '\\']) {
        return None;
    }
    Some(media_root.join(CAR_IMAGE_DIR).join(file_name))
}

/// Best-effort removal of an uploaded image. Failures are logged, not returned.
pub async fn remove_car_image(media_root: &Path, media_url: &str, image_url: &str) {
    let Some(path) = local_image_path(media_root, media_url, image_url) else {
        return;
    };
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove car image");
    }
}
