pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod customer;
pub mod orders;

use serde::Deserialize;

/// `?q=` keyword filter shared by the list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

impl SearchQuery {
    pub fn keyword(&self) -> &str {
        self.q.as_deref().unwrap_or("").trim()
    }
}
