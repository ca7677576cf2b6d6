use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::entities::user::UserRole;
use crate::error::{method_not_allowed, not_found};
use crate::handlers::admin::{cars, dashboard, orders, users};
use crate::handlers::{account, auth, catalog, customer};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::{create_global_governor, log_request};
use crate::middleware::user_rate_limit::create_user_governor;
use crate::utils::media::MAX_IMAGE_BYTES;

/// Room for the multipart framing around a maximum-size image.
const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 1024 * 1024;

fn account_routes(prefix: &str, role: UserRole) -> Router<AppState> {
    Router::new()
        .route(prefix, get(users::list).post(users::create))
        .route(
            &format!("{prefix}/{{id}}"),
            get(users::get).put(users::update).delete(users::delete),
        )
        .layer(Extension(role))
}

/// Path prefix to serve uploads under, when the media URL is a local path.
fn media_mount(media_url: &str) -> Option<&str> {
    let path = media_url.trim_end_matches('/');
    (path.starts_with('/') && path.len() > 1).then_some(path)
}

/// Server-wide layers, outermost first: tracing, CORS, per-IP limit, request
/// log. Requests must carry `ConnectInfo<SocketAddr>`.
pub fn with_http_layers(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
            .layer(create_global_governor())
            .layer(middleware::from_fn(log_request)),
    )
}

pub fn create_router(state: AppState) -> Router {
    // Public: signup and login
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/me", get(auth::me))
                .method_not_allowed_fallback(method_not_allowed)
                .layer(middleware::from_fn_with_state(state.clone(), auth_middleware)),
        )
        .method_not_allowed_fallback(method_not_allowed);

    // Public catalogue
    let public_routes = Router::new()
        .route("/cars", get(catalog::list_cars))
        .route("/cars/{id}", get(catalog::get_car))
        .route("/shop", get(catalog::shop_info))
        .method_not_allowed_fallback(method_not_allowed);

    // Any logged-in account, limited per user
    let customer_routes = Router::new()
        .route(
            "/bookings",
            get(customer::list_bookings).post(customer::create_booking),
        )
        .route("/bookings/availability", get(customer::availability))
        .route("/bookings/{id}", get(customer::get_booking))
        .route("/bookings/{id}/advance", post(customer::advance_booking))
        .route("/history", get(customer::history))
        .route("/notifications", get(account::list_notifications))
        .route(
            "/notifications/read-all",
            post(account::mark_all_notifications_read),
        )
        .route(
            "/notifications/{id}/read",
            post(account::mark_notification_read),
        )
        .route("/profile", get(account::profile))
        .route("/profile/phone", post(account::change_phone))
        .route("/profile/password", post(account::change_password))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(create_user_governor())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin back office (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .merge(account_routes("/users", UserRole::Customer))
        .merge(account_routes("/admins", UserRole::Admin))
        .route("/cars", get(cars::list_cars).post(cars::create_car))
        .route(
            "/cars/{id}",
            get(cars::get_car).put(cars::update_car).delete(cars::delete_car),
        )
        .route(
            "/cars/{id}/images",
            get(cars::list_images).post(cars::add_image),
        )
        .route(
            "/cars/{id}/images/upload",
            post(cars::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/cars/{id}/images/{image_id}",
            put(cars::update_image).delete(cars::delete_image),
        )
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}/approve", post(orders::approve_order))
        .route("/orders/{id}/reject", post(orders::reject_order))
        .route("/history", get(orders::history))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let mut router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes.merge(customer_routes))
        .nest("/admin/api", admin_routes);

    if let Some(path) = media_mount(&state.config.media_url) {
        router = router.nest_service(path, ServeDir::new(&state.config.media_root));
    }

    router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_is_served_only_from_local_paths() {
        assert_eq!(media_mount("/media/"), Some("/media"));
        assert_eq!(media_mount("/static/uploads/"), Some("/static/uploads"));
        assert_eq!(media_mount("https://cdn.example.com/media/"), None);
        assert_eq!(media_mount("/"), None);
    }
}
