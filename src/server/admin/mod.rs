mod maintenance;
mod subjects;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // User routes
        .route("/users", post(users::create_user))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}", delete(users::delete_user))
        .route("/users/{id}/role", post(users::assign_role))
        .route("/users/{id}/credit-limit", put(users::set_credit_limit))
        .route("/users/{id}/tokens", post(users::create_user_token))
        .route("/roles", get(users::list_roles))
        // Subject routes
        .route("/subjects", post(subjects::create_subject))
        .route("/subjects/{id}", patch(subjects::update_subject))
        .route("/subjects/{id}", delete(subjects::delete_subject))
        .route("/subjects/{id}/instructor", post(subjects::assign_instructor))
        .route(
            "/subjects/{id}/prerequisites",
            put(subjects::set_prerequisites),
        )
        // Statistics and maintenance
        .route("/statistics", get(maintenance::statistics))
        .route(
            "/notifications/purge",
            post(maintenance::purge_notifications),
        )
}
