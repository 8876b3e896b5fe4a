use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::{PaginationParams, SubjectDetail};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};

/// Read-only subject catalog, visible to any authenticated user.
pub fn catalog_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/subjects", get(list_subjects))
        .route("/subjects/{id}", get(get_subject))
}

async fn list_subjects(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let subjects = state
        .store
        .list_subjects(cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list subjects")?;

    let (subjects, next_cursor, has_more) =
        paginate(subjects, DEFAULT_PAGE_SIZE as usize, |s| s.code.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(subjects, next_cursor, has_more)))
}

async fn get_subject(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    let prerequisites = state
        .store
        .list_prerequisites(&subject.id)
        .api_err("Failed to list prerequisites")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(SubjectDetail {
        subject,
        prerequisites,
    })))
}
