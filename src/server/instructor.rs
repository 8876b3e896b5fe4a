use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireInstructor;
use crate::enrollment;
use crate::server::AppState;
use crate::server::dto::{CloseSubjectRequest, ClosedResponse, GradeRequest, StudentsParams};
use crate::server::response::{ApiError, ApiResponse};

pub fn instructor_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/instructor/subjects", get(assigned_subjects))
        .route("/instructor/students", get(students))
        .route("/instructor/grade", post(grade))
        .route("/instructor/close", post(close))
}

async fn assigned_subjects(
    auth: RequireInstructor,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let subjects = enrollment::assigned_subjects(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(subjects)))
}

async fn students(
    auth: RequireInstructor,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StudentsParams>,
) -> impl IntoResponse {
    let roster =
        enrollment::students_for_subject(state.store.as_ref(), &auth.user, &params.subject_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(roster)))
}

async fn grade(
    auth: RequireInstructor,
    State(state): State<Arc<AppState>>,
    Json(req): Json<GradeRequest>,
) -> impl IntoResponse {
    let updated = enrollment::grade(
        state.store.as_ref(),
        &auth.user,
        &req.enrollment_id,
        req.value,
    )?;
    Ok::<_, ApiError>(Json(ApiResponse::success(updated)))
}

async fn close(
    auth: RequireInstructor,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CloseSubjectRequest>,
) -> impl IntoResponse {
    let closed = enrollment::close_subject(state.store.as_ref(), &auth.user, &req.subject_id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(ClosedResponse { closed })))
}
