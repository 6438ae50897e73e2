use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Json,
};
use model::entities::{advert, advert_image};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tracing::{debug, error, info, instrument, warn};

use crate::auth::AuthUser;
use crate::handlers::adverts::{load_owned_advert, AdvertImageResponse, AdvertResponse};
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Pulls the file out of a multipart form field.
///
/// Returns `Ok(None)` when the form carried no field of that name.
async fn read_upload(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<Option<(String, Vec<u8>)>, (StatusCode, Json<ErrorResponse>)> {
    let upload_error = |message: String| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: message,
                code: "UPLOAD_ERROR".to_string(),
                success: false,
            }),
        )
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(multipart_error) => {
                warn!("Malformed multipart body: {}", multipart_error);
                return Err(upload_error("Malformed multipart body".to_string()));
            }
        };

        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(multipart_error) => {
                warn!("Failed to read uploaded file: {}", multipart_error);
                return Err(upload_error("Failed to read uploaded file".to_string()));
            }
        };
        if data.is_empty() {
            return Err(upload_error("Uploaded file is empty".to_string()));
        }

        return Ok(Some((file_name, data)));
    }
}

fn missing_file(field_name: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: format!("Multipart field '{field_name}' with the image file is required"),
            code: "MISSING_FILE".to_string(),
            success: false,
        }),
    )
}

/// Set or replace the primary image of one of the current user's adverts
///
/// Expects a multipart form with the file in the `image` field. A previously
/// stored primary image file is removed.
#[utoipa::path(
    put,
    path = "/api/v1/profile/adverts/{advert_id}/image",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    responses(
        (status = 200, description = "Primary image set", body = ApiResponse<AdvertResponse>),
        (status = 400, description = "Missing or malformed upload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, multipart))]
pub async fn set_primary_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(advert_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<AdvertResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("User {} uploading primary image for advert {}", user.id, advert_id);

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    let (file_name, data) = read_upload(&mut multipart, "image")
        .await?
        .ok_or_else(|| missing_file("image"))?;

    let media_path = match state.media.save(&file_name, &data).await {
        Ok(path) => path,
        Err(media_error) => {
            error!("Failed to store uploaded image: {}", media_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to store uploaded image".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    let previous_image = advert_model.image.clone();
    let mut active: advert::ActiveModel = advert_model.into();
    active.image = Set(Some(media_path));

    match active.update(&state.db).await {
        Ok(updated) => {
            if let Some(previous) = previous_image {
                if let Err(media_error) = state.media.remove(&previous).await {
                    warn!("Failed to remove replaced image {}: {}", previous, media_error);
                }
            }
            info!("Primary image of advert {} updated", advert_id);
            Ok(Json(ApiResponse {
                data: AdvertResponse::from(updated),
                message: "Primary image updated successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to update advert {}: {}", advert_id, db_error);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to update advert".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Attach an additional image to one of the current user's adverts
///
/// Expects a multipart form with the file in the `image` field.
#[utoipa::path(
    post,
    path = "/api/v1/profile/adverts/{advert_id}/images",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    responses(
        (status = 201, description = "Image attached", body = ApiResponse<AdvertImageResponse>),
        (status = 400, description = "Missing or malformed upload", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, multipart))]
pub async fn add_additional_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(advert_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<AdvertImageResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    debug!("User {} attaching image to advert {}", user.id, advert_id);

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    let (file_name, data) = read_upload(&mut multipart, "image")
        .await?
        .ok_or_else(|| missing_file("image"))?;

    let media_path = match state.media.save(&file_name, &data).await {
        Ok(path) => path,
        Err(media_error) => {
            error!("Failed to store uploaded image: {}", media_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to store uploaded image".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    let new_image = advert_image::ActiveModel {
        advert_id: Set(advert_model.id),
        image: Set(media_path.clone()),
        ..Default::default()
    };

    match new_image.insert(&state.db).await {
        Ok(image_model) => {
            info!("Image {} attached to advert {}", image_model.id, advert_id);
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse {
                    data: AdvertImageResponse::from(image_model),
                    message: "Image attached successfully".to_string(),
                    success: true,
                }),
            ))
        }
        Err(db_error) => {
            error!("Failed to attach image to advert {}: {}", advert_id, db_error);
            // The row never landed; don't leave the file behind
            if let Err(media_error) = state.media.remove(&media_path).await {
                warn!("Failed to remove stored file {}: {}", media_path, media_error);
            }
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to attach image".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Remove an additional image from one of the current user's adverts
#[utoipa::path(
    delete,
    path = "/api/v1/profile/adverts/{advert_id}/images/{image_id}",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
        ("image_id" = i32, Path, description = "Image ID"),
    ),
    responses(
        (status = 200, description = "Image removed", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert or image not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_additional_image(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((advert_id, image_id)): Path<(i32, i32)>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    debug!(
        "User {} removing image {} from advert {}",
        user.id, image_id, advert_id
    );

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    let image_model = match advert_image::Entity::find_by_id(image_id)
        .filter(advert_image::Column::AdvertId.eq(advert_model.id))
        .one(&state.db)
        .await
    {
        Ok(Some(image_model)) => image_model,
        Ok(None) => {
            warn!("Image {} not found on advert {}", image_id, advert_id);
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Image with ID {image_id} not found"),
                    code: "NOT_FOUND".to_string(),
                    success: false,
                }),
            ));
        }
        Err(db_error) => {
            error!("Failed to fetch image {}: {}", image_id, db_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch image".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    let media_path = image_model.image.clone();
    if let Err(db_error) = advert_image::Entity::delete_by_id(image_model.id)
        .exec(&state.db)
        .await
    {
        error!("Failed to delete image {}: {}", image_id, db_error);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to delete image".to_string(),
                code: "ERROR".to_string(),
                success: false,
            }),
        ));
    }

    if let Err(media_error) = state.media.remove(&media_path).await {
        warn!("Failed to remove media file {}: {}", media_path, media_error);
    }

    info!("Image {} removed from advert {}", image_id, advert_id);
    Ok(Json(ApiResponse {
        data: format!("Image {image_id} deleted"),
        message: "Image deleted successfully".to_string(),
        success: true,
    }))
}
