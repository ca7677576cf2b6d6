pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::bookings::CarLocks;
use session::{MemorySessionStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub car_locks: CarLocks,
}

impl AppState {
    /// State with the in-memory session store, expiring after the configured TTL.
    pub fn new(db: DatabaseConnection, config: Config) -> Self {
        let ttl = Duration::from_secs(config.session_ttl_hours.saturating_mul(3600));
        Self {
            db,
            config,
            sessions: Arc::new(MemorySessionStore::new(ttl)),
            car_locks: CarLocks::default(),
        }
    }
}
