//! Statistics aggregator: read-only, system-wide counts and distributions
//! over users, subjects, and enrollments.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::Store;
use crate::types::{EnrollmentState, RoleKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCounts {
    pub total_students: i64,
    pub total_instructors: i64,
    pub total_admins: i64,
    pub active_students: i64,
    pub inactive_students: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCounts {
    pub total_subjects: i64,
    pub subjects_with_instructor: i64,
    pub subjects_without_instructor: i64,
    pub avg_subjects_per_instructor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentCounts {
    pub total_enrollments: i64,
    pub enrollments_enrolled: i64,
    pub enrollments_approved: i64,
    pub enrollments_failed: i64,
    pub enrollments_closed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcademicPerformance {
    pub approval_rate: f64,
    pub failure_rate: f64,
    pub system_average_grade: f64,
    pub average_student_gpa: f64,
}

/// Graded enrollments bucketed into five unit-width bins over [0, 5].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeDistribution {
    #[serde(rename = "0_1")]
    pub bin_0_1: i64,
    #[serde(rename = "1_2")]
    pub bin_1_2: i64,
    #[serde(rename = "2_3")]
    pub bin_2_3: i64,
    #[serde(rename = "3_4")]
    pub bin_3_4: i64,
    #[serde(rename = "4_5")]
    pub bin_4_5: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub users: UserCounts,
    pub subjects: SubjectCounts,
    pub enrollments: EnrollmentCounts,
    pub academic_performance: AcademicPerformance,
    pub grade_distribution: GradeDistribution,
    pub instructors_with_assignments: i64,
}

/// Rounds half away from zero to two decimals. Every rate and average in the
/// statistics payload goes through this, so 2/3 reads as 66.67.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the full statistics payload. Ratios with an empty denominator
/// are reported as 0 rather than failing.
pub fn statistics(store: &dyn Store) -> Result<Statistics> {
    let total_students = store.count_users_with_role(RoleKind::Student)?;
    let total_instructors = store.count_users_with_role(RoleKind::Instructor)?;
    let total_admins = store.count_users_with_role(RoleKind::Admin)?;
    let active_students = store.count_active_students()?;

    let total_subjects = store.count_subjects()?;
    let subjects_with_instructor = store.count_subjects_with_instructor()?;
    let instructors_with_assignments = store.count_distinct_assigned_instructors()?;

    let avg_subjects_per_instructor = if instructors_with_assignments > 0 {
        total_subjects as f64 / instructors_with_assignments as f64
    } else {
        0.0
    };

    let enrollments_enrolled = store.count_enrollments_in_state(EnrollmentState::Enrolled)?;
    let enrollments_approved = store.count_enrollments_in_state(EnrollmentState::Approved)?;
    let enrollments_failed = store.count_enrollments_in_state(EnrollmentState::Failed)?;
    let enrollments_closed = store.count_enrollments_in_state(EnrollmentState::Closed)?;

    let graded_open = enrollments_approved + enrollments_failed;
    let (approval_rate, failure_rate) = if graded_open > 0 {
        (
            enrollments_approved as f64 / graded_open as f64 * 100.0,
            enrollments_failed as f64 / graded_open as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let system_average_grade = store.average_grade()?.unwrap_or(0.0);

    let gpas = store.approved_grade_averages()?;
    let average_student_gpa = if gpas.is_empty() {
        0.0
    } else {
        gpas.iter().sum::<f64>() / gpas.len() as f64
    };

    let histogram = store.grade_histogram()?;

    Ok(Statistics {
        users: UserCounts {
            total_students,
            total_instructors,
            total_admins,
            active_students,
            inactive_students: total_students - active_students,
        },
        subjects: SubjectCounts {
            total_subjects,
            subjects_with_instructor,
            subjects_without_instructor: total_subjects - subjects_with_instructor,
            avg_subjects_per_instructor: round2(avg_subjects_per_instructor),
        },
        enrollments: EnrollmentCounts {
            total_enrollments: store.count_enrollments()?,
            enrollments_enrolled,
            enrollments_approved,
            enrollments_failed,
            enrollments_closed,
        },
        academic_performance: AcademicPerformance {
            approval_rate: round2(approval_rate),
            failure_rate: round2(failure_rate),
            system_average_grade: round2(system_average_grade),
            average_student_gpa: round2(average_student_gpa),
        },
        grade_distribution: GradeDistribution {
            bin_0_1: histogram[0],
            bin_1_2: histogram[1],
            bin_2_3: histogram[2],
            bin_3_4: histogram[3],
            bin_4_5: histogram[4],
        },
        instructors_with_assignments,
    })
}
