pub mod error_code;
pub mod health;
pub mod helpers;
pub mod revenue;
pub mod select;
pub mod track;

pub use error_code::ErrorCode;
pub use health::{AppStartTime, HealthService, health_routes};
pub use revenue::RevenueService;
pub use select::SelectService;
pub use track::TrackService;

use actix_web::web;

/// `/api` 路由
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .app_data(helpers::json_config())
        .route("/revenue", web::get().to(RevenueService::dashboard))
        .route("/{campaign}/track", web::post().to(TrackService::track))
        .route("/{campaign}/track", web::get().to(TrackService::report))
        .route("/{campaign}/select", web::get().to(SelectService::select))
}
