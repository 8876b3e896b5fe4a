use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireStudent;
use crate::enrollment;
use crate::server::AppState;
use crate::server::dto::{EnrollRequest, EnrollResponse, GpaResponse};
use crate::server::response::{ApiError, ApiResponse};

pub fn student_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/student/enroll", post(enroll))
        .route("/student/enrolled", get(enrolled))
        .route("/student/approved", get(approved))
        .route("/student/failed", get(failed))
        .route("/student/history", get(history))
        .route("/student/gpa", get(gpa))
}

async fn enroll(
    auth: RequireStudent,
    State(state): State<Arc<AppState>>,
    Json(req): Json<EnrollRequest>,
) -> impl IntoResponse {
    let enrollment = enrollment::enroll(state.store.as_ref(), &auth.user, &req.subject_id)?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(EnrollResponse { id: enrollment.id })),
    ))
}

async fn enrolled(auth: RequireStudent, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = enrollment::enrolled_subjects(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(records)))
}

async fn approved(auth: RequireStudent, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = enrollment::approved_subjects(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(records)))
}

async fn failed(auth: RequireStudent, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = enrollment::failed_subjects(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(records)))
}

async fn history(auth: RequireStudent, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let records = enrollment::history(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(records)))
}

async fn gpa(auth: RequireStudent, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let gpa = enrollment::gpa(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(GpaResponse { gpa })))
}
