//! Back-office JSON API, mounted under `/admin/api` behind `require_admin`.

pub mod cars;
pub mod dashboard;
pub mod orders;
pub mod users;
