use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Pickup centre shown to customers who collect the car themselves.
#[derive(Clone, Debug, Serialize)]
pub struct ShopInfo {
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

impl Default for ShopInfo {
    fn default() -> Self {
        Self {
            name: "Modern Drive Pickup Center".to_string(),
            address: "999 Rama I Rd, Pathum Wan, Bangkok 10330".to_string(),
            lat: 13.7466,
            lng: 100.5393,
        }
    }
}

/// Credentials of the admin account seeded at startup.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
    pub phone_number: String,
    pub full_name: String,
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            phone_number: "0000000000".to_string(),
            full_name: "Administrator".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub session_ttl_hours: u64,
    pub server_host: String,
    pub server_port: u16,
    pub media_root: PathBuf,
    pub media_url: String,
    pub admin: AdminSeed,
    pub shop: ShopInfo,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            session_ttl_hours: 24,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            media_root: PathBuf::from("media"),
            media_url: "/media/".to_string(),
            admin: AdminSeed::default(),
            shop: ShopInfo::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let shop = ShopInfo {
            name: env::var("SHOP_NAME").unwrap_or(defaults.shop.name),
            address: env::var("SHOP_ADDRESS").unwrap_or(defaults.shop.address),
            lat: env_float("SHOP_LAT", defaults.shop.lat),
            lng: env_float("SHOP_LNG", defaults.shop.lng),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| AppError::Internal("DATABASE_URL must be set".to_string()))?,
            session_ttl_hours: env_parse("SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env_parse("SERVER_PORT", defaults.server_port)?,
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            media_url: env::var("MEDIA_URL")
                .map(|url| normalize_media_url(&url))
                .unwrap_or(defaults.media_url),
            admin: AdminSeed {
                username: env::var("ADMIN_USERNAME").unwrap_or(defaults.admin.username),
                password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin.password),
                phone_number: env::var("ADMIN_PHONE").unwrap_or(defaults.admin.phone_number),
                full_name: env::var("ADMIN_FULL_NAME").unwrap_or(defaults.admin.full_name),
            },
            shop,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Internal(format!("{name} must be a number"))),
        Err(_) => Ok(default),
    }
}

// Coordinates are cosmetic: a bad value falls back instead of failing startup.
fn env_float(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn normalize_media_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
