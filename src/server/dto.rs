use serde::{Deserialize, Serialize};

use crate::types::{RoleKind, Subject};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<RoleKind>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: RoleKind,
}

#[derive(Debug, Deserialize)]
pub struct SetCreditLimitRequest {
    pub max_credits_per_term: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
    pub code: String,
    pub credits: u32,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub assigned_instructor_id: Option<String>,
    #[serde(default)]
    pub prerequisite_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubjectRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub credits: Option<u32>,
    #[serde(default)]
    pub semester: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignInstructorRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPrerequisitesRequest {
    pub prerequisite_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub subject_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub enrollment_id: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct CloseSubjectRequest {
    pub subject_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurgeNotificationsRequest {
    /// Age cutoff in days; defaults to the standard 90-day window.
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StudentsParams {
    pub subject_id: String,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct GpaResponse {
    pub gpa: f64,
}

#[derive(Debug, Serialize)]
pub struct ClosedResponse {
    pub closed: bool,
}

#[derive(Debug, Serialize)]
pub struct PurgedResponse {
    pub purged: usize,
}

/// Subject detail with its prerequisite subjects expanded.
#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub prerequisites: Vec<Subject>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}
