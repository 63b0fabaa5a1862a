// ============================================================================
// HTTP API - actix-web boundary over `OrderService`
// ============================================================================
//
// - dto: request/response shapes and field constraints
// - handlers: one async fn per route
// - error: ApiError and its mapping to status codes
// - response: JSON envelopes
//
// ============================================================================

pub mod dto;
pub mod error;
pub mod handlers;
pub mod response;

use actix_web::web;

use crate::metrics;

pub use error::ApiError;

/// Registers every route. Expects `web::Data<OrderService>` and
/// `web::Data<Arc<Metrics>>` on the app.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::InvalidBody(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| {
                ApiError::InvalidQuery {
                    param: "query",
                    reason: err.to_string(),
                }
                .into()
            }),
    )
    .route("/health", web::get().to(metrics::health_handler))
    .route("/metrics", web::get().to(metrics::metrics_handler))
    .service(
        web::scope("/api/v1/orders")
            .service(
                web::resource("")
                    .route(web::post().to(handlers::create_order))
                    .route(web::get().to(handlers::list_orders))
                    .route(web::patch().to(handlers::partial_update_order))
                    .route(web::put().to(handlers::modify_order)),
            )
            // literal segments before the catch-all code route
            .route("/metrics", web::get().to(handlers::order_metrics))
            .route("/track/{code}", web::get().to(handlers::track_order))
            .route("/id/{id}", web::get().to(handlers::get_order_by_id))
            .route("/{code}", web::get().to(handlers::get_order_by_code)),
    );
}
