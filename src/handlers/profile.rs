use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use model::entities::user;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::schemas::{validation_error_response, ApiResponse, AppState, ErrorResponse};

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_activated: bool,
    pub send_messages: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            is_activated: model.is_activated,
            send_messages: model.send_messages,
            joined_at: model.joined_at,
        }
    }
}

/// Request body for updating the current user's profile
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    /// New contact email
    #[validate(email)]
    pub email: Option<String>,
    /// Whether to notify about new comments
    pub send_messages: Option<bool>,
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<ApiResponse<UserResponse>> {
    debug!("Fetching profile for user {}", user.id);

    Json(ApiResponse {
        data: UserResponse::from(user),
        message: "Profile retrieved successfully".to_string(),
        success: true,
    })
}

/// Update the current user's profile
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Updating profile for user {}", user.id);

    if let Err(errors) = request.validate() {
        warn!("Profile update failed validation: {}", errors);
        return Err(validation_error_response(&errors));
    }

    let user_id = user.id;
    let mut active: user::ActiveModel = user.into();
    if let Some(email) = request.email {
        active.email = Set(email);
    }
    if let Some(send_messages) = request.send_messages {
        active.send_messages = Set(send_messages);
    }

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Profile of user {} updated", user_id);
            Ok(Json(ApiResponse {
                data: UserResponse::from(updated),
                message: "Profile updated successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to update profile of user {}: {}", user_id, db_error);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update profile".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Delete the current user's account
///
/// Takes every advert the user authored with it (their images, comments and
/// ratings included) and removes the uploaded files from disk. Outstanding
/// session tokens stop working once the row is gone.
#[utoipa::path(
    delete,
    path = "/api/v1/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = user.id;
    debug!("Deleting account of user {}", user_id);

    let orphaned_media = match user.delete_with_adverts(&state.db).await {
        Ok(paths) => paths,
        Err(db_error) => {
            error!("Failed to delete user {}: {}", user_id, db_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to delete account".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    for path in &orphaned_media {
        if let Err(media_error) = state.media.remove(path).await {
            // The rows are already gone; a stale file is worth a warning, not a failure
            warn!("Failed to remove media file {}: {}", path, media_error);
        }
    }

    info!("User {} deleted", user_id);
    Ok(Json(ApiResponse {
        data: format!("User {user_id} deleted"),
        message: "Account deleted successfully".to_string(),
        success: true,
    }))
}
