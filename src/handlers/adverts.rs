use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use model::entities::{advert, advert_image, comment, rating, rubric, user};
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::auth::{AuthUser, OptionalAuthUser};
use crate::schemas::{validation_error_response, ApiResponse, AppState, ErrorResponse};

/// How many adverts the front-page listing shows.
const INDEX_LIMIT: u64 = 10;

/// Request structure for creating a new advert
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateAdvertRequest {
    /// Sub-rubric to file the advert under
    pub rubric_id: i32,
    /// Name of the offered goods
    #[validate(length(min = 1, max = 40))]
    pub title: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    /// How to reach the seller
    #[validate(length(min = 1))]
    pub contacts: String,
}

/// Request structure for updating an existing advert
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct UpdateAdvertRequest {
    pub rubric_id: Option<i32>,
    #[validate(length(min = 1, max = 40))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub content: Option<String>,
    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,
    #[validate(length(min = 1))]
    pub contacts: Option<String>,
    /// Hide or re-show the advert in public listings
    pub is_active: Option<bool>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price < Decimal::ZERO {
        return Err(ValidationError::new("price_must_not_be_negative"));
    }
    Ok(())
}

/// Response structure for advert operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvertResponse {
    pub id: i32,
    pub rubric_id: i32,
    pub title: String,
    pub content: String,
    pub price: Decimal,
    pub contacts: String,
    /// Media path of the primary image, when one was uploaded
    pub image: Option<String>,
    pub author_id: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<advert::Model> for AdvertResponse {
    fn from(model: advert::Model) -> Self {
        Self {
            id: model.id,
            rubric_id: model.rubric_id,
            title: model.title,
            content: model.content,
            price: model.price,
            contacts: model.contacts,
            image: model.image,
            author_id: model.author_id,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

/// An additional image attached to an advert
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvertImageResponse {
    pub id: i32,
    pub image: String,
}

impl From<advert_image::Model> for AdvertImageResponse {
    fn from(model: advert_image::Model) -> Self {
        Self {
            id: model.id,
            image: model.image,
        }
    }
}

/// A visible comment on an advert
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(model: comment::Model) -> Self {
        Self {
            id: model.id,
            author: model.author,
            content: model.content,
            created_at: model.created_at,
        }
    }
}

/// Everything the advert detail page is made of
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvertDetailResponse {
    pub advert: AdvertResponse,
    pub images: Vec<AdvertImageResponse>,
    /// Visible comments, oldest first
    pub comments: Vec<CommentResponse>,
    /// Mean score, 0.0 when nobody voted yet
    pub average_rating: f64,
    pub rating_count: u64,
    /// The viewer's own score, when authenticated and they voted before
    pub my_rating: Option<i16>,
}

/// One page of adverts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdvertPageResponse {
    pub items: Vec<AdvertResponse>,
    /// 1-based page number actually served
    pub page: u64,
    pub page_size: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

/// Query parameters for listing adverts in a rubric
#[derive(Debug, Deserialize, IntoParams)]
pub struct AdvertListQuery {
    /// Case-insensitive substring to search for in title or content
    pub keyword: Option<String>,
    /// 1-based page number; out-of-range values clamp to the last page
    pub page: Option<u64>,
}

/// POST body for the advert detail endpoint; the `action` field picks the
/// sub-action the way the submit buttons on the detail page would.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DetailActionRequest {
    /// Add a comment. Guests name themselves via `author`; for logged-in
    /// users the account's username wins over anything supplied here.
    CommentSubmit {
        author: Option<String>,
        content: String,
    },
    /// Save or refresh the caller's score for this advert
    RatingSubmit { score: i16 },
}

fn advert_not_found(advert_id: i32) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Advert with ID {advert_id} not found"),
            code: "NOT_FOUND".to_string(),
            success: false,
        }),
    )
}

fn store_error(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
            code: "ERROR".to_string(),
            success: false,
        }),
    )
}

/// Loads an advert owned by `owner_id`. Somebody else's advert answers the
/// same 404 as a missing one, so the route leaks nothing about existence.
pub(crate) async fn load_owned_advert(
    state: &AppState,
    owner_id: i32,
    advert_id: i32,
) -> Result<advert::Model, (StatusCode, Json<ErrorResponse>)> {
    match advert::Entity::find_by_id(advert_id)
        .filter(advert::Column::AuthorId.eq(owner_id))
        .one(&state.db)
        .await
    {
        Ok(Some(model)) => Ok(model),
        Ok(None) => {
            warn!("Advert {} not found for owner {}", advert_id, owner_id);
            Err(advert_not_found(advert_id))
        }
        Err(db_error) => {
            error!("Failed to fetch advert {}: {}", advert_id, db_error);
            Err(store_error("Failed to fetch advert"))
        }
    }
}

async fn build_detail(
    state: &AppState,
    advert: &advert::Model,
    viewer: Option<&user::Model>,
) -> Result<AdvertDetailResponse, sea_orm::DbErr> {
    let images = advert.additional_images(&state.db).await?;
    let comments = advert.active_comments(&state.db).await?;
    let average_rating = advert.average_rating(&state.db).await?;
    let rating_count = advert.rating_count(&state.db).await?;

    let my_rating = match viewer {
        Some(viewer) => rating::Entity::find()
            .filter(rating::Column::AdvertId.eq(advert.id))
            .filter(rating::Column::UserId.eq(viewer.id))
            .one(&state.db)
            .await?
            .map(|r| r.score),
        None => None,
    };

    Ok(AdvertDetailResponse {
        advert: AdvertResponse::from(advert.clone()),
        images: images.into_iter().map(AdvertImageResponse::from).collect(),
        comments: comments.into_iter().map(CommentResponse::from).collect(),
        average_rating,
        rating_count,
        my_rating,
    })
}

/// Get the latest active adverts
#[utoipa::path(
    get,
    path = "/api/v1/adverts",
    tag = "adverts",
    responses(
        (status = 200, description = "Latest active adverts", body = ApiResponse<Vec<AdvertResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_adverts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AdvertResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Fetching latest active adverts");

    match advert::Entity::find()
        .filter(advert::Column::IsActive.eq(true))
        .order_by_desc(advert::Column::CreatedAt)
        .order_by_desc(advert::Column::Id)
        .limit(INDEX_LIMIT)
        .all(&state.db)
        .await
    {
        Ok(adverts) => {
            info!("Retrieved {} adverts for the index listing", adverts.len());
            Ok(Json(ApiResponse {
                data: adverts.into_iter().map(AdvertResponse::from).collect(),
                message: "Adverts retrieved successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to fetch adverts: {}", db_error);
            Err(store_error("Failed to fetch adverts"))
        }
    }
}

/// List active adverts in a sub-rubric
///
/// Supports a case-insensitive keyword search over title and content, and
/// page-based pagination (newest first).
#[utoipa::path(
    get,
    path = "/api/v1/rubrics/{rubric_id}/adverts",
    tag = "adverts",
    params(
        ("rubric_id" = i32, Path, description = "Sub-rubric ID"),
        AdvertListQuery,
    ),
    responses(
        (status = 200, description = "One page of matching adverts", body = ApiResponse<AdvertPageResponse>),
        (status = 404, description = "Rubric not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn rubric_adverts(
    State(state): State<AppState>,
    Path(rubric_id): Path<i32>,
    Query(query): Query<AdvertListQuery>,
) -> Result<Json<ApiResponse<AdvertPageResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Listing adverts in rubric {}", rubric_id);

    match rubric::Entity::find_sub_by_id(&state.db, rubric_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Sub-rubric {} not found", rubric_id);
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Rubric with ID {rubric_id} not found"),
                    code: "NOT_FOUND".to_string(),
                    success: false,
                }),
            ));
        }
        Err(db_error) => {
            error!("Failed to fetch rubric {}: {}", rubric_id, db_error);
            return Err(store_error("Failed to fetch rubric"));
        }
    }

    let mut select = advert::Entity::find()
        .filter(advert::Column::IsActive.eq(true))
        .filter(advert::Column::RubricId.eq(rubric_id));

    if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.is_empty()) {
        debug!("Applying keyword filter: {}", keyword);
        let pattern = format!("%{}%", keyword.to_lowercase());
        select = select.filter(
            Condition::any()
                .add(
                    Expr::expr(Func::lower(Expr::col(advert::Column::Title)))
                        .like(pattern.clone()),
                )
                .add(Expr::expr(Func::lower(Expr::col(advert::Column::Content))).like(pattern)),
        );
    }

    let select = select
        .order_by_desc(advert::Column::CreatedAt)
        .order_by_desc(advert::Column::Id);

    let paginator = select.paginate(&state.db, state.page_size);
    let totals = match paginator.num_items_and_pages().await {
        Ok(totals) => totals,
        Err(db_error) => {
            error!("Failed to count adverts in rubric {}: {}", rubric_id, db_error);
            return Err(store_error("Failed to fetch adverts"));
        }
    };

    let mut page = query.page.unwrap_or(1).max(1);
    if totals.number_of_pages > 0 && page > totals.number_of_pages {
        page = totals.number_of_pages;
    }

    let items = match paginator.fetch_page(page - 1).await {
        Ok(items) => items,
        Err(db_error) => {
            error!("Failed to fetch adverts page {}: {}", page, db_error);
            return Err(store_error("Failed to fetch adverts"));
        }
    };

    info!(
        "Serving page {} of {} ({} adverts total) for rubric {}",
        page, totals.number_of_pages, totals.number_of_items, rubric_id
    );
    Ok(Json(ApiResponse {
        data: AdvertPageResponse {
            items: items.into_iter().map(AdvertResponse::from).collect(),
            page,
            page_size: state.page_size,
            total_items: totals.number_of_items,
            total_pages: totals.number_of_pages,
        },
        message: "Adverts retrieved successfully".to_string(),
        success: true,
    }))
}

/// Get an advert's detail view
///
/// Composes the advert with its images, its visible comments and the rating
/// aggregate; authenticated viewers also see their own score.
#[utoipa::path(
    get,
    path = "/api/v1/rubrics/{rubric_id}/adverts/{advert_id}",
    tag = "adverts",
    params(
        ("rubric_id" = i32, Path, description = "Sub-rubric ID"),
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    responses(
        (status = 200, description = "Advert detail", body = ApiResponse<AdvertDetailResponse>),
        (status = 404, description = "Advert not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn advert_detail(
    State(state): State<AppState>,
    Path((_rubric_id, advert_id)): Path<(i32, i32)>,
    OptionalAuthUser(viewer): OptionalAuthUser,
) -> Result<Json<ApiResponse<AdvertDetailResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Fetching detail for advert {}", advert_id);

    let advert_model = match advert::Entity::find_by_id(advert_id).one(&state.db).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            warn!("Advert {} not found", advert_id);
            return Err(advert_not_found(advert_id));
        }
        Err(db_error) => {
            error!("Failed to fetch advert {}: {}", advert_id, db_error);
            return Err(store_error("Failed to fetch advert"));
        }
    };

    match build_detail(&state, &advert_model, viewer.as_ref()).await {
        Ok(detail) => Ok(Json(ApiResponse {
            data: detail,
            message: "Advert retrieved successfully".to_string(),
            success: true,
        })),
        Err(db_error) => {
            error!("Failed to compose detail of advert {}: {}", advert_id, db_error);
            Err(store_error("Failed to fetch advert"))
        }
    }
}

/// Submit a comment or a rating on an advert
///
/// The request body is discriminated by `action`: `comment_submit` is open to
/// guests and users alike, `rating_submit` needs an authenticated caller.
/// Both answer with the refreshed detail view.
#[utoipa::path(
    post,
    path = "/api/v1/rubrics/{rubric_id}/adverts/{advert_id}",
    tag = "adverts",
    params(
        ("rubric_id" = i32, Path, description = "Sub-rubric ID"),
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    request_body = DetailActionRequest,
    responses(
        (status = 200, description = "Rating updated", body = ApiResponse<AdvertDetailResponse>),
        (status = 201, description = "Comment added or rating saved", body = ApiResponse<AdvertDetailResponse>),
        (status = 400, description = "Invalid submission", body = ErrorResponse),
        (status = 401, description = "Rating requires authentication", body = ErrorResponse),
        (status = 404, description = "Advert not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, viewer, action))]
pub async fn advert_detail_action(
    State(state): State<AppState>,
    Path((_rubric_id, advert_id)): Path<(i32, i32)>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Json(action): Json<DetailActionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdvertDetailResponse>>), (StatusCode, Json<ErrorResponse>)>
{
    let advert_model = match advert::Entity::find_by_id(advert_id).one(&state.db).await {
        Ok(Some(model)) => model,
        Ok(None) => {
            warn!("Advert {} not found", advert_id);
            return Err(advert_not_found(advert_id));
        }
        Err(db_error) => {
            error!("Failed to fetch advert {}: {}", advert_id, db_error);
            return Err(store_error("Failed to fetch advert"));
        }
    };

    let (status, message) = match action {
        DetailActionRequest::CommentSubmit { author, content } => {
            debug!("Comment submission on advert {}", advert_id);

            if content.trim().is_empty() {
                warn!("Rejecting empty comment on advert {}", advert_id);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Comment content must not be empty".to_string(),
                        code: "VALIDATION_ERROR".to_string(),
                        success: false,
                    }),
                ));
            }

            // Logged-in commenters always appear under their username
            let author_name = match &viewer {
                Some(viewer) => viewer.username.clone(),
                None => {
                    let supplied = author.as_deref().map(str::trim).unwrap_or("");
                    if supplied.is_empty() || supplied.chars().count() > 30 {
                        warn!("Rejecting guest comment with bad author name");
                        return Err((
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: "Guest comments need an author name of at most 30 characters"
                                    .to_string(),
                                code: "VALIDATION_ERROR".to_string(),
                                success: false,
                            }),
                        ));
                    }
                    supplied.to_string()
                }
            };

            let new_comment = comment::ActiveModel {
                advert_id: Set(advert_model.id),
                author: Set(author_name),
                content: Set(content),
                is_active: Set(true),
                created_at: Set(Utc::now()),
                ..Default::default()
            };

            if let Err(db_error) = new_comment.insert(&state.db).await {
                error!("Failed to add comment to advert {}: {}", advert_id, db_error);
                return Err(store_error("Failed to add comment"));
            }

            info!("Comment added to advert {}", advert_id);
            (StatusCode::CREATED, "Comment added".to_string())
        }
        DetailActionRequest::RatingSubmit { score } => {
            debug!("Rating submission on advert {}", advert_id);

            let Some(viewer) = &viewer else {
                warn!("Rejecting anonymous rating on advert {}", advert_id);
                return Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "Sign in to rate adverts".to_string(),
                        code: "AUTH_FAILED".to_string(),
                        success: false,
                    }),
                ));
            };

            if !(1..=5).contains(&score) {
                warn!("Rejecting out-of-range score {} on advert {}", score, advert_id);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: "Score must be between 1 and 5".to_string(),
                        code: "VALIDATION_ERROR".to_string(),
                        success: false,
                    }),
                ));
            }

            match rating::upsert(&state.db, advert_model.id, viewer.id, score).await {
                Ok((_, true)) => {
                    info!("User {} rated advert {}", viewer.id, advert_id);
                    (StatusCode::CREATED, "Your rating has been saved".to_string())
                }
                Ok((_, false)) => {
                    info!("User {} re-rated advert {}", viewer.id, advert_id);
                    (StatusCode::OK, "Your rating has been updated".to_string())
                }
                Err(db_error) => {
                    error!("Failed to save rating on advert {}: {}", advert_id, db_error);
                    return Err(store_error("Failed to save rating"));
                }
            }
        }
    };

    match build_detail(&state, &advert_model, viewer.as_ref()).await {
        Ok(detail) => Ok((
            status,
            Json(ApiResponse {
                data: detail,
                message,
                success: true,
            }),
        )),
        Err(db_error) => {
            error!("Failed to compose detail of advert {}: {}", advert_id, db_error);
            Err(store_error("Failed to fetch advert"))
        }
    }
}

/// List the current user's own adverts
///
/// Includes inactive adverts; this is the owner's view.
#[utoipa::path(
    get,
    path = "/api/v1/profile/adverts",
    tag = "profile",
    responses(
        (status = 200, description = "Own adverts, newest first", body = ApiResponse<Vec<AdvertResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn my_adverts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<Vec<AdvertResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Fetching adverts of user {}", user.id);

    match advert::Entity::find()
        .filter(advert::Column::AuthorId.eq(user.id))
        .order_by_desc(advert::Column::CreatedAt)
        .order_by_desc(advert::Column::Id)
        .all(&state.db)
        .await
    {
        Ok(adverts) => {
            info!("Retrieved {} adverts of user {}", adverts.len(), user.id);
            Ok(Json(ApiResponse {
                data: adverts.into_iter().map(AdvertResponse::from).collect(),
                message: "Adverts retrieved successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to fetch adverts of user {}: {}", user.id, db_error);
            Err(store_error("Failed to fetch adverts"))
        }
    }
}

/// Create a new advert
#[utoipa::path(
    post,
    path = "/api/v1/profile/adverts",
    tag = "profile",
    request_body = CreateAdvertRequest,
    responses(
        (status = 201, description = "Advert created", body = ApiResponse<AdvertResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn create_advert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateAdvertRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AdvertResponse>>), (StatusCode, Json<ErrorResponse>)> {
    debug!("User {} creating advert '{}'", user.id, request.title);

    if let Err(errors) = request.validate() {
        warn!("Advert creation failed validation: {}", errors);
        return Err(validation_error_response(&errors));
    }

    match rubric::Entity::find_sub_by_id(&state.db, request.rubric_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!("Sub-rubric {} not found", request.rubric_id);
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!(
                        "Rubric with ID {} not found or is not a sub-rubric",
                        request.rubric_id
                    ),
                    code: "INVALID_RUBRIC".to_string(),
                    success: false,
                }),
            ));
        }
        Err(db_error) => {
            error!("Failed to fetch rubric {}: {}", request.rubric_id, db_error);
            return Err(store_error("Failed to validate rubric"));
        }
    }

    let new_advert = advert::ActiveModel {
        rubric_id: Set(request.rubric_id),
        title: Set(request.title.clone()),
        content: Set(request.content),
        price: Set(request.price),
        contacts: Set(request.contacts),
        image: Set(None),
        author_id: Set(user.id),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    match new_advert.insert(&state.db).await {
        Ok(advert_model) => {
            info!(
                "Advert created with ID: {} by user {}",
                advert_model.id, user.id
            );
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse {
                    data: AdvertResponse::from(advert_model),
                    message: "Advert created successfully".to_string(),
                    success: true,
                }),
            ))
        }
        Err(db_error) => {
            error!("Failed to create advert: {}", db_error);
            Err(store_error("Failed to create advert"))
        }
    }
}

/// Get one of the current user's adverts with its detail view
#[utoipa::path(
    get,
    path = "/api/v1/profile/adverts/{advert_id}",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    responses(
        (status = 200, description = "Advert detail", body = ApiResponse<AdvertDetailResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn my_advert_detail(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(advert_id): Path<i32>,
) -> Result<Json<ApiResponse<AdvertDetailResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("User {} fetching own advert {}", user.id, advert_id);

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    match build_detail(&state, &advert_model, Some(&user)).await {
        Ok(detail) => Ok(Json(ApiResponse {
            data: detail,
            message: "Advert retrieved successfully".to_string(),
            success: true,
        })),
        Err(db_error) => {
            error!("Failed to compose detail of advert {}: {}", advert_id, db_error);
            Err(store_error("Failed to fetch advert"))
        }
    }
}

/// Update one of the current user's adverts
#[utoipa::path(
    put,
    path = "/api/v1/profile/adverts/{advert_id}",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    request_body = UpdateAdvertRequest,
    responses(
        (status = 200, description = "Advert updated", body = ApiResponse<AdvertResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user, request))]
pub async fn update_advert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(advert_id): Path<i32>,
    Json(request): Json<UpdateAdvertRequest>,
) -> Result<Json<ApiResponse<AdvertResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("User {} updating advert {}", user.id, advert_id);

    if let Err(errors) = request.validate() {
        warn!("Advert update failed validation: {}", errors);
        return Err(validation_error_response(&errors));
    }

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    if let Some(rubric_id) = request.rubric_id {
        match rubric::Entity::find_sub_by_id(&state.db, rubric_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("Sub-rubric {} not found", rubric_id);
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!(
                            "Rubric with ID {rubric_id} not found or is not a sub-rubric"
                        ),
                        code: "INVALID_RUBRIC".to_string(),
                        success: false,
                    }),
                ));
            }
            Err(db_error) => {
                error!("Failed to fetch rubric {}: {}", rubric_id, db_error);
                return Err(store_error("Failed to validate rubric"));
            }
        }
    }

    let mut active: advert::ActiveModel = advert_model.into();
    if let Some(rubric_id) = request.rubric_id {
        active.rubric_id = Set(rubric_id);
    }
    if let Some(title) = request.title {
        active.title = Set(title);
    }
    if let Some(content) = request.content {
        active.content = Set(content);
    }
    if let Some(price) = request.price {
        active.price = Set(price);
    }
    if let Some(contacts) = request.contacts {
        active.contacts = Set(contacts);
    }
    if let Some(is_active) = request.is_active {
        active.is_active = Set(is_active);
    }

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("Advert {} updated by user {}", advert_id, user.id);
            Ok(Json(ApiResponse {
                data: AdvertResponse::from(updated),
                message: "Advert updated successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to update advert {}: {}", advert_id, db_error);
            Err(store_error("Failed to update advert"))
        }
    }
}

/// Delete one of the current user's adverts
///
/// Additional images go first (rows and files), then the advert itself;
/// comments and ratings disappear with it.
#[utoipa::path(
    delete,
    path = "/api/v1/profile/adverts/{advert_id}",
    tag = "profile",
    params(
        ("advert_id" = i32, Path, description = "Advert ID"),
    ),
    responses(
        (status = 200, description = "Advert deleted", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 404, description = "Advert not found or not owned", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_advert(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(advert_id): Path<i32>,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("User {} deleting advert {}", user.id, advert_id);

    let advert_model = load_owned_advert(&state, user.id, advert_id).await?;

    let orphaned_media = match advert_model.delete_with_dependents(&state.db).await {
        Ok(paths) => paths,
        Err(db_error) => {
            error!("Failed to delete advert {}: {}", advert_id, db_error);
            return Err(store_error("Failed to delete advert"));
        }
    };

    for path in &orphaned_media {
        if let Err(media_error) = state.media.remove(path).await {
            warn!("Failed to remove media file {}: {}", path, media_error);
        }
    }

    info!("Advert {} deleted by user {}", advert_id, user.id);
    Ok(Json(ApiResponse {
        data: format!("Advert {advert_id} deleted"),
        message: "Advert deleted successfully".to_string(),
        success: true,
    }))
}
