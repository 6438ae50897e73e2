use axum::http::StatusCode;
use axum::response::Json;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use validator::ValidationErrors;

use crate::auth::Signer;
use crate::media::MediaStore;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Token signer (activation links, session tokens)
    pub signer: Signer,
    /// Local store for uploaded images
    pub media: MediaStore,
    /// Page size for advert listings
    pub page_size: u64,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// Maps validator failures onto the common error envelope.
pub fn validation_error_response(errors: &ValidationErrors) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: format!("Validation failed: {errors}"),
            code: "VALIDATION_ERROR".to_string(),
            success: false,
        }),
    )
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::activate,
        crate::handlers::auth::login,
        crate::handlers::profile::get_profile,
        crate::handlers::profile::update_profile,
        crate::handlers::profile::delete_profile,
        crate::handlers::rubrics::list_rubrics,
        crate::handlers::adverts::list_adverts,
        crate::handlers::adverts::rubric_adverts,
        crate::handlers::adverts::advert_detail,
        crate::handlers::adverts::advert_detail_action,
        crate::handlers::adverts::my_adverts,
        crate::handlers::adverts::create_advert,
        crate::handlers::adverts::my_advert_detail,
        crate::handlers::adverts::update_advert,
        crate::handlers::adverts::delete_advert,
        crate::handlers::images::set_primary_image,
        crate::handlers::images::add_additional_image,
        crate::handlers::images::delete_additional_image,
    ),
    components(
        schemas(
            ApiResponse<crate::handlers::profile::UserResponse>,
            ApiResponse<crate::handlers::auth::RegisterResponse>,
            ApiResponse<crate::handlers::auth::LoginResponse>,
            ApiResponse<Vec<crate::handlers::rubrics::SuperRubricResponse>>,
            ApiResponse<crate::handlers::adverts::AdvertResponse>,
            ApiResponse<crate::handlers::adverts::AdvertPageResponse>,
            ApiResponse<crate::handlers::adverts::AdvertDetailResponse>,
            ApiResponse<crate::handlers::adverts::AdvertImageResponse>,
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::RegisterResponse,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::LoginResponse,
            crate::handlers::profile::UserResponse,
            crate::handlers::profile::UpdateProfileRequest,
            crate::handlers::rubrics::RubricResponse,
            crate::handlers::rubrics::SuperRubricResponse,
            crate::handlers::adverts::AdvertResponse,
            crate::handlers::adverts::AdvertImageResponse,
            crate::handlers::adverts::CommentResponse,
            crate::handlers::adverts::AdvertDetailResponse,
            crate::handlers::adverts::AdvertPageResponse,
            crate::handlers::adverts::CreateAdvertRequest,
            crate::handlers::adverts::UpdateAdvertRequest,
            crate::handlers::adverts::DetailActionRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, activation and login"),
        (name = "profile", description = "Current user account and their adverts"),
        (name = "rubrics", description = "Rubric tree endpoints"),
        (name = "adverts", description = "Public advert listings, comments and ratings"),
    ),
    info(
        title = "Adboard API",
        description = "Classifieds board API - adverts under a two-level rubric tree, with comments and ratings",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
