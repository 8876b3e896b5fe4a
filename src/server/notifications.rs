use std::sync::Arc;

use axum::{
    Json,
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};

use crate::auth::RequireUser;
use crate::notify;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};

pub fn notifications_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(unread))
        .route("/notifications/{id}/read", post(mark_read))
}

async fn unread(auth: RequireUser, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let notifications = notify::unread(state.store.as_ref(), &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(notifications)))
}

async fn mark_read(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let notification = notify::mark_read(state.store.as_ref(), &id, &auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(notification)))
}
