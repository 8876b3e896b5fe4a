use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireAdmin;
use crate::catalog;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    AssignInstructorRequest, CreateSubjectRequest, SetPrerequisitesRequest, SubjectDetail,
    UpdateSubjectRequest,
};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::{validate_credits, validate_subject_code, validate_subject_name};
use crate::types::{RoleKind, Subject};

pub async fn create_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubjectRequest>,
) -> impl IntoResponse {
    validate_subject_name(&req.name)?;
    validate_subject_code(&req.code)?;
    validate_credits(req.credits)?;

    if state
        .store
        .get_subject_by_code(&req.code)
        .api_err("Failed to check subject code")?
        .is_some()
    {
        return Err(ApiError::conflict("Subject code already exists"));
    }

    // Validate the instructor and prerequisite references before inserting
    // so a failed create leaves nothing behind.
    if let Some(user_id) = &req.assigned_instructor_id {
        let user = state
            .store
            .get_user(user_id)
            .api_err("Failed to get user")?
            .or_not_found("Instructor not found")?;
        if user.role != Some(RoleKind::Instructor) {
            return Err(Error::NotAnInstructor.into());
        }
    }
    for id in &req.prerequisite_ids {
        state
            .store
            .get_subject(id)
            .api_err("Failed to get subject")?
            .or_not_found("Prerequisite subject not found")?;
    }

    let subject = Subject {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        code: req.code,
        credits: req.credits,
        semester: req.semester,
        assigned_instructor_id: req.assigned_instructor_id,
        created_at: Utc::now(),
    };

    state
        .store
        .create_subject(&subject)
        .api_err("Failed to create subject")?;

    let prerequisites = if req.prerequisite_ids.is_empty() {
        Vec::new()
    } else {
        catalog::set_prerequisites(state.store.as_ref(), &subject.id, &req.prerequisite_ids)?
    };

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(SubjectDetail {
            subject,
            prerequisites,
        })),
    ))
}

pub async fn update_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateSubjectRequest>,
) -> impl IntoResponse {
    let mut subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    if let Some(name) = req.name {
        validate_subject_name(&name)?;
        subject.name = name;
    }
    if let Some(code) = req.code {
        validate_subject_code(&code)?;
        if code != subject.code
            && state
                .store
                .get_subject_by_code(&code)
                .api_err("Failed to check subject code")?
                .is_some()
        {
            return Err(ApiError::conflict("Subject code already exists"));
        }
        subject.code = code;
    }
    if let Some(credits) = req.credits {
        validate_credits(credits)?;
        subject.credits = credits;
    }
    if let Some(semester) = req.semester {
        subject.semester = Some(semester);
    }

    state
        .store
        .update_subject(&subject)
        .api_err("Failed to update subject")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subject)))
}

pub async fn delete_subject(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let subject = state
        .store
        .get_subject(&id)
        .api_err("Failed to get subject")?
        .or_not_found("Subject not found")?;

    state
        .store
        .delete_subject(&subject.id)
        .api_err("Failed to delete subject")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn assign_instructor(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AssignInstructorRequest>,
) -> impl IntoResponse {
    let subject = catalog::assign_instructor(state.store.as_ref(), &id, &req.user_id)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subject)))
}

pub async fn set_prerequisites(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SetPrerequisitesRequest>,
) -> impl IntoResponse {
    let prerequisites =
        catalog::set_prerequisites(state.store.as_ref(), &id, &req.prerequisite_ids)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(prerequisites)))
}
