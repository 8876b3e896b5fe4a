mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Role operations (rows are seeded by initialize)
    fn list_roles(&self) -> Result<Vec<Role>>;
    fn get_role(&self, kind: RoleKind) -> Result<Option<Role>>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn set_user_role(&self, id: &str, role: RoleKind) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Student profile operations
    fn ensure_student_profile(&self, user_id: &str) -> Result<()>;
    fn get_student_profile(&self, user_id: &str) -> Result<Option<StudentProfile>>;
    fn set_max_credits_per_term(&self, user_id: &str, max_credits: u32) -> Result<()>;

    // Subject operations
    fn create_subject(&self, subject: &Subject) -> Result<()>;
    fn get_subject(&self, id: &str) -> Result<Option<Subject>>;
    fn get_subject_by_code(&self, code: &str) -> Result<Option<Subject>>;
    fn list_subjects(&self, cursor: &str, limit: i32) -> Result<Vec<Subject>>;
    fn update_subject(&self, subject: &Subject) -> Result<()>;
    fn delete_subject(&self, id: &str) -> Result<bool>;
    fn set_assigned_instructor(&self, subject_id: &str, instructor_id: &str) -> Result<()>;
    fn list_assigned_subjects(&self, instructor_id: &str) -> Result<Vec<Subject>>;

    // Prerequisite edge operations
    fn set_prerequisites(&self, subject_id: &str, prerequisite_ids: &[String]) -> Result<()>;
    fn list_prerequisites(&self, subject_id: &str) -> Result<Vec<Subject>>;
    fn list_prerequisite_ids(&self, subject_id: &str) -> Result<Vec<String>>;

    // Enrollment operations
    fn create_enrollment(&self, enrollment: &Enrollment) -> Result<()>;
    fn get_enrollment(&self, id: &str) -> Result<Option<Enrollment>>;
    fn get_enrollment_for(&self, student_id: &str, subject_id: &str) -> Result<Option<Enrollment>>;
    fn list_student_enrollments(
        &self,
        student_id: &str,
        state: Option<EnrollmentState>,
    ) -> Result<Vec<EnrollmentWithSubject>>;
    fn list_subject_enrollments(&self, subject_id: &str) -> Result<Vec<Enrollment>>;
    fn enrolled_credits(&self, student_id: &str) -> Result<u32>;
    fn set_enrollment_grade(&self, id: &str, grade: f64, state: EnrollmentState) -> Result<()>;
    fn count_ungraded_enrollments(&self, subject_id: &str) -> Result<i64>;
    /// Moves every enrollment of the subject to `closed` in one statement.
    /// Returns the number of rows updated.
    fn close_subject_enrollments(&self, subject_id: &str) -> Result<usize>;

    // Notification operations
    fn create_notification(&self, notification: &Notification) -> Result<()>;
    fn get_notification(&self, id: &str) -> Result<Option<Notification>>;
    fn list_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>>;
    fn mark_notification_read(&self, id: &str) -> Result<()>;
    /// Deletes notifications created before `cutoff`. With `keep_unread`,
    /// unread rows survive regardless of age. Returns the rows deleted.
    fn purge_notifications(&self, cutoff: DateTime<Utc>, keep_unread: bool) -> Result<usize>;

    // Statistics queries (read-only aggregates)
    fn count_users_with_role(&self, role: RoleKind) -> Result<i64>;
    fn count_active_students(&self) -> Result<i64>;
    fn count_subjects(&self) -> Result<i64>;
    fn count_subjects_with_instructor(&self) -> Result<i64>;
    fn count_distinct_assigned_instructors(&self) -> Result<i64>;
    fn count_enrollments(&self) -> Result<i64>;
    fn count_enrollments_in_state(&self, state: EnrollmentState) -> Result<i64>;
    fn average_grade(&self) -> Result<Option<f64>>;
    /// Counts of graded enrollments in the five unit-width bins
    /// [0,1) [1,2) [2,3) [3,4) [4,5].
    fn grade_histogram(&self) -> Result<[i64; 5]>;
    /// Per-student mean of approved grades, one entry per student with at
    /// least one approved enrollment.
    fn approved_grade_averages(&self) -> Result<Vec<f64>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;

    // Admin token check
    fn has_admin_token(&self) -> Result<bool>;

    fn close(&self) -> Result<()>;
}
