use crate::handlers::{
    adverts::{
        advert_detail, advert_detail_action, create_advert, delete_advert, list_adverts,
        my_advert_detail, my_adverts, rubric_adverts, update_advert,
    },
    auth::{activate, login, register},
    health::health_check,
    images::{add_additional_image, delete_additional_image, set_primary_image},
    profile::{delete_profile, get_profile, update_profile},
    rubrics::list_rubrics,
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Public listings
        .route("/api/v1/adverts", get(list_adverts))
        .route("/api/v1/rubrics", get(list_rubrics))
        .route("/api/v1/rubrics/:rubric_id/adverts", get(rubric_adverts))
        .route(
            "/api/v1/rubrics/:rubric_id/adverts/:advert_id",
            get(advert_detail).post(advert_detail_action),
        )
        // Registration and login
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/activate/:token", get(activate))
        .route("/api/v1/auth/login", post(login))
        // Current user account
        .route(
            "/api/v1/profile",
            get(get_profile).put(update_profile).delete(delete_profile),
        )
        // The current user's adverts
        .route(
            "/api/v1/profile/adverts",
            get(my_adverts).post(create_advert),
        )
        .route(
            "/api/v1/profile/adverts/:advert_id",
            get(my_advert_detail).put(update_advert).delete(delete_advert),
        )
        .route(
            "/api/v1/profile/adverts/:advert_id/image",
            put(set_primary_image),
        )
        .route(
            "/api/v1/profile/adverts/:advert_id/images",
            post(add_additional_image),
        )
        .route(
            "/api/v1/profile/adverts/:advert_id/images/:image_id",
            delete(delete_additional_image),
        )
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
