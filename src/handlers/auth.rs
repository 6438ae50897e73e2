use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use model::entities::user;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::{hash_password, verify_password, TokenError};
use crate::handlers::profile::UserResponse;
use crate::schemas::{validation_error_response, ApiResponse, AppState, ErrorResponse};

/// Request body for registering a new account
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct RegisterRequest {
    /// Username (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    /// Contact email, also the target of the activation message
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Response body for a successful registration
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserResponse,
    /// Signed activation token; the account stays inactive until it comes
    /// back through the activation endpoint. Mail delivery is up to the
    /// operator, the API only issues the token.
    pub activation_token: String,
}

/// Request body for logging in
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response body for a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    pub user: UserResponse,
}

/// Register a new user account
///
/// The account is created inactive; the returned activation token has to be
/// presented to `/api/v1/auth/activate/{token}` before login succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, activation pending", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid request data", body = ErrorResponse),
        (status = 409, description = "Username already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisterResponse>>), (StatusCode, Json<ErrorResponse>)> {
    debug!("Registering user with username: {}", request.username);

    if let Err(errors) = request.validate() {
        warn!("Registration request failed validation: {}", errors);
        return Err(validation_error_response(&errors));
    }

    let existing = user::Entity::find()
        .filter(user::Column::Username.eq(request.username.clone()))
        .one(&state.db)
        .await
        .map_err(|db_error| {
            error!("Failed to check username availability: {}", db_error);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to register user".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            )
        })?;
    if existing.is_some() {
        warn!("Username '{}' is already taken", request.username);
        return Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: format!("Username '{}' is already taken", request.username),
                code: "USERNAME_TAKEN".to_string(),
                success: false,
            }),
        ));
    }

    let password_hash = hash_password(&request.password).map_err(|hash_error| {
        error!("Failed to hash password: {}", hash_error);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to register user".to_string(),
                code: "ERROR".to_string(),
                success: false,
            }),
        )
    })?;

    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        email: Set(request.email.clone()),
        password_hash: Set(password_hash),
        is_activated: Set(false),
        send_messages: Set(true),
        is_staff: Set(false),
        is_active: Set(false),
        joined_at: Set(Utc::now()),
        ..Default::default()
    };

    match new_user.insert(&state.db).await {
        Ok(user_model) => {
            info!(
                "User registered with ID: {}, username: {}",
                user_model.id, user_model.username
            );
            let activation_token = state.signer.sign_activation(&user_model.username);
            let response = ApiResponse {
                data: RegisterResponse {
                    user: UserResponse::from(user_model),
                    activation_token,
                },
                message: "User registered, activation required".to_string(),
                success: true,
            };
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(db_error) => {
            error!("Failed to register user '{}': {}", request.username, db_error);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to register user".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Confirm a registration with an activation token
///
/// A valid token activates the account. Presenting the token again is not an
/// error; the response just says the account was already activated.
#[utoipa::path(
    get,
    path = "/api/v1/auth/activate/{token}",
    tag = "auth",
    params(
        ("token" = String, Path, description = "Signed activation token"),
    ),
    responses(
        (status = 200, description = "Account activated (or was already)", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid or tampered token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, token))]
pub async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Processing activation token");

    let username = match state.signer.verify_activation(&token) {
        Ok(username) => username,
        Err(TokenError::Invalid) => {
            warn!("Rejecting invalid activation token");
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Activation link is invalid or has been tampered with".to_string(),
                    code: "INVALID_TOKEN".to_string(),
                    success: false,
                }),
            ));
        }
    };

    let user_model = match user::Entity::find()
        .filter(user::Column::Username.eq(username.clone()))
        .one(&state.db)
        .await
    {
        Ok(Some(user_model)) => user_model,
        Ok(None) => {
            warn!("Activation token for unknown user '{}'", username);
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("User '{username}' not found"),
                    code: "NOT_FOUND".to_string(),
                    success: false,
                }),
            ));
        }
        Err(db_error) => {
            error!("Failed to look up user '{}': {}", username, db_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to activate user".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    if user_model.is_activated {
        info!("User '{}' is already activated", username);
        return Ok(Json(ApiResponse {
            data: UserResponse::from(user_model),
            message: "Account was already activated".to_string(),
            success: true,
        }));
    }

    let mut active: user::ActiveModel = user_model.into();
    active.is_active = Set(true);
    active.is_activated = Set(true);

    match active.update(&state.db).await {
        Ok(updated) => {
            info!("User '{}' activated", updated.username);
            Ok(Json(ApiResponse {
                data: UserResponse::from(updated),
                message: "Account activated successfully".to_string(),
                success: true,
            }))
        }
        Err(db_error) => {
            error!("Failed to activate user '{}': {}", username, db_error);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to activate user".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ))
        }
    }
}

/// Log in with username and password
///
/// All rejections (unknown username, wrong password, account not activated)
/// answer with the same generic 401.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Login rejected", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Login attempt for username: {}", request.username);

    let rejected = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Invalid username or password".to_string(),
                code: "AUTH_FAILED".to_string(),
                success: false,
            }),
        )
    };

    let user_model = match user::Entity::find()
        .filter(user::Column::Username.eq(request.username.clone()))
        .one(&state.db)
        .await
    {
        Ok(Some(user_model)) => user_model,
        Ok(None) => {
            warn!("Login rejected for unknown username '{}'", request.username);
            return Err(rejected());
        }
        Err(db_error) => {
            error!("Failed to look up user '{}': {}", request.username, db_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to log in".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    if !verify_password(&request.password, &user_model.password_hash) {
        warn!("Login rejected for username '{}': bad password", request.username);
        return Err(rejected());
    }
    if !user_model.is_active {
        warn!(
            "Login rejected for username '{}': account not active",
            request.username
        );
        return Err(rejected());
    }

    info!("User '{}' logged in", user_model.username);
    let token = state.signer.sign_session(user_model.id);
    Ok(Json(ApiResponse {
        data: LoginResponse {
            token,
            user: UserResponse::from(user_model),
        },
        message: "Logged in successfully".to_string(),
        success: true,
    }))
}
