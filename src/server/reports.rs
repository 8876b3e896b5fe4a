use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::auth::RequireAuth;
use crate::reports;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::Token;

pub fn reports_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/student/{id}", get(student_report))
        .route("/reports/instructor/{id}", get(instructor_report))
}

/// Reports are visible to the named user and to admin tokens.
fn require_self_or_admin(token: &Token, user_id: &str) -> Result<(), ApiError> {
    if token.is_admin || token.user_id.as_deref() == Some(user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You may only view your own report"))
    }
}

fn csv_response(filename: String, csv: String) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from(csv))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn student_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_self_or_admin(&auth.0, &id)?;

    let csv = reports::student_report(state.store.as_ref(), &id)?;

    Ok::<_, ApiError>(csv_response(format!("student_report_{id}.csv"), csv))
}

async fn instructor_report(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    require_self_or_admin(&auth.0, &id)?;

    let csv = reports::instructor_report(state.store.as_ref(), &id)?;

    Ok::<_, ApiError>(csv_response(format!("instructor_report_{id}.csv"), csv))
}
