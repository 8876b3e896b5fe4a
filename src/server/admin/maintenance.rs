use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};

use crate::auth::RequireAdmin;
use crate::notify;
use crate::server::AppState;
use crate::server::dto::{PurgeNotificationsRequest, PurgedResponse};
use crate::server::response::{ApiError, ApiResponse};
use crate::stats;

pub async fn statistics(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let statistics = stats::statistics(state.store.as_ref())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(statistics)))
}

/// Deletes read notifications older than the cutoff. Unread notifications
/// are always preserved.
pub async fn purge_notifications(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurgeNotificationsRequest>,
) -> impl IntoResponse {
    let days = req.days.unwrap_or(notify::DEFAULT_PURGE_DAYS);
    if days < 0 {
        return Err(ApiError::bad_request("days cannot be negative"));
    }

    let cutoff = Utc::now() - Duration::days(days);
    let purged = notify::purge_old(state.store.as_ref(), cutoff, true)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(PurgedResponse { purged })))
}
