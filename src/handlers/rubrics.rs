use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::rubric;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

use crate::schemas::{ApiResponse, AppState, ErrorResponse};

/// Response structure for a single rubric
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RubricResponse {
    pub id: i32,
    pub name: String,
    pub order: i16,
    pub super_rubric_id: Option<i32>,
}

impl From<rubric::Model> for RubricResponse {
    fn from(model: rubric::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            order: model.order,
            super_rubric_id: model.super_rubric_id,
        }
    }
}

/// A super-rubric with its sub-rubrics
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuperRubricResponse {
    pub id: i32,
    pub name: String,
    pub order: i16,
    /// Sub-rubrics, ordered by (order, name)
    pub children: Vec<RubricResponse>,
}

/// Get the rubric tree
///
/// Super-rubrics ordered by (order, name), each carrying its sub-rubrics in
/// the same ordering. Adverts can only be filed under sub-rubrics.
#[utoipa::path(
    get,
    path = "/api/v1/rubrics",
    tag = "rubrics",
    responses(
        (status = 200, description = "Rubric tree", body = ApiResponse<Vec<SuperRubricResponse>>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_rubrics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<SuperRubricResponse>>>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Fetching rubric tree");

    let supers = match rubric::Entity::find_super().all(&state.db).await {
        Ok(supers) => supers,
        Err(db_error) => {
            error!("Failed to fetch super rubrics: {}", db_error);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch rubrics".to_string(),
                    code: "ERROR".to_string(),
                    success: false,
                }),
            ));
        }
    };

    let mut tree = Vec::with_capacity(supers.len());
    for super_rubric in supers {
        let children = match super_rubric.children(&state.db).await {
            Ok(children) => children,
            Err(db_error) => {
                error!(
                    "Failed to fetch children of rubric {}: {}",
                    super_rubric.id, db_error
                );
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch rubrics".to_string(),
                        code: "ERROR".to_string(),
                        success: false,
                    }),
                ));
            }
        };

        tree.push(SuperRubricResponse {
            id: super_rubric.id,
            name: super_rubric.name,
            order: super_rubric.order,
            children: children.into_iter().map(RubricResponse::from).collect(),
        });
    }

    info!("Retrieved {} super rubrics", tree.len());
    Ok(Json(ApiResponse {
        data: tree,
        message: "Rubrics retrieved successfully".to_string(),
        success: true,
    }))
}
