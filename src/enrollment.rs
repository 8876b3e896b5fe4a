//! Enrollment engine: the state machine over student/subject enrollments.
//!
//! Every operation takes the acting user and re-validates ownership and role
//! constraints against the store; the HTTP layer's extractors are a
//! convenience, not the authority.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::notify;
use crate::store::Store;
use crate::types::{
    DEFAULT_MAX_CREDITS_PER_TERM, Enrollment, EnrollmentState, EnrollmentWithSubject, Subject, User,
};

/// Enrolls a student in a subject.
///
/// Preconditions, checked in order and each failing with its own error kind:
/// 1. no enrollment record exists for (student, subject) — `DuplicateEnrollment`;
/// 2. every prerequisite of the subject is approved — `PrerequisitesNotMet`
///    carrying the missing subject codes;
/// 3. the subject's credits fit under the student's per-term limit, counting
///    only currently `enrolled` enrollments — `CreditLimitExceeded`.
pub fn enroll(store: &dyn Store, student: &User, subject_id: &str) -> Result<Enrollment> {
    let subject = store.get_subject(subject_id)?.ok_or(Error::NotFound)?;

    if store
        .get_enrollment_for(&student.id, &subject.id)?
        .is_some()
    {
        return Err(Error::DuplicateEnrollment);
    }

    let prerequisites = store.list_prerequisites(&subject.id)?;
    if !prerequisites.is_empty() {
        let approved: HashSet<String> = store
            .list_student_enrollments(&student.id, Some(EnrollmentState::Approved))?
            .into_iter()
            .map(|e| e.enrollment.subject_id)
            .collect();

        let missing: Vec<String> = prerequisites
            .iter()
            .filter(|p| !approved.contains(&p.id))
            .map(|p| p.code.clone())
            .collect();

        if !missing.is_empty() {
            return Err(Error::PrerequisitesNotMet { missing });
        }
    }

    let limit = store
        .get_student_profile(&student.id)?
        .map_or(DEFAULT_MAX_CREDITS_PER_TERM, |p| p.max_credits_per_term);
    let used = store.enrolled_credits(&student.id)?;

    if used + subject.credits > limit {
        return Err(Error::CreditLimitExceeded {
            used,
            requested: subject.credits,
            limit,
        });
    }

    let enrollment = Enrollment {
        id: Uuid::new_v4().to_string(),
        student_id: student.id.clone(),
        subject_id: subject.id.clone(),
        state: EnrollmentState::Enrolled,
        grade: None,
        created_at: Utc::now(),
    };

    match store.create_enrollment(&enrollment) {
        Ok(()) => Ok(enrollment),
        // Lost a race against a concurrent enroll for the same pair; the
        // unique constraint decides the winner.
        Err(Error::AlreadyExists) => Err(Error::DuplicateEnrollment),
        Err(e) => Err(e),
    }
}

/// Assigns a grade to an enrollment.
///
/// The value must lie in [0.0, 5.0]; the enrollment must be in state
/// `enrolled`; the acting user must be the subject's assigned instructor.
/// The raw value is stored and compared un-rounded against the 3.0
/// threshold, and the student is notified of the result.
pub fn grade(
    store: &dyn Store,
    instructor: &User,
    enrollment_id: &str,
    value: f64,
) -> Result<Enrollment> {
    if !(0.0..=5.0).contains(&value) {
        return Err(Error::InvalidGradeValue(value));
    }

    let enrollment = store.get_enrollment(enrollment_id)?.ok_or(Error::NotFound)?;
    let subject = store
        .get_subject(&enrollment.subject_id)?
        .ok_or(Error::NotFound)?;

    if subject.assigned_instructor_id.as_deref() != Some(instructor.id.as_str()) {
        return Err(Error::PermissionDenied);
    }

    if enrollment.state != EnrollmentState::Enrolled {
        return Err(Error::InvalidStateTransition(enrollment.state.to_string()));
    }

    let state = EnrollmentState::for_grade(value);
    store.set_enrollment_grade(&enrollment.id, value, state)?;

    let updated = Enrollment {
        state,
        grade: Some(value),
        ..enrollment
    };

    notify::grade_assigned(store, &updated, &subject)?;

    Ok(updated)
}

/// Closes a subject: every enrollment under it moves to `closed`.
///
/// Fails with `UngradedEnrollmentsExist` (and mutates nothing) while any
/// enrollment still has a null grade. Returns `false` when the subject has
/// no enrollments at all.
pub fn close_subject(store: &dyn Store, instructor: &User, subject_id: &str) -> Result<bool> {
    let subject = store.get_subject(subject_id)?.ok_or(Error::NotFound)?;

    if subject.assigned_instructor_id.as_deref() != Some(instructor.id.as_str()) {
        return Err(Error::PermissionDenied);
    }

    let enrollments = store.list_subject_enrollments(&subject.id)?;
    if enrollments.is_empty() {
        return Ok(false);
    }

    if enrollments.iter().any(|e| e.grade.is_none()) {
        return Err(Error::UngradedEnrollmentsExist);
    }

    store.close_subject_enrollments(&subject.id)?;
    Ok(true)
}

/// Enrollments the student is currently taking.
pub fn enrolled_subjects(store: &dyn Store, student: &User) -> Result<Vec<EnrollmentWithSubject>> {
    store.list_student_enrollments(&student.id, Some(EnrollmentState::Enrolled))
}

/// Enrollments the student has approved.
pub fn approved_subjects(store: &dyn Store, student: &User) -> Result<Vec<EnrollmentWithSubject>> {
    store.list_student_enrollments(&student.id, Some(EnrollmentState::Approved))
}

/// Enrollments the student has failed.
pub fn failed_subjects(store: &dyn Store, student: &User) -> Result<Vec<EnrollmentWithSubject>> {
    store.list_student_enrollments(&student.id, Some(EnrollmentState::Failed))
}

/// Full academic history, every state, oldest first.
pub fn history(store: &dyn Store, student: &User) -> Result<Vec<EnrollmentWithSubject>> {
    store.list_student_enrollments(&student.id, None)
}

/// Grade point average: the arithmetic mean of grades over `approved`
/// enrollments. Failed grades are excluded. A student with no approved
/// enrollments has a GPA of 0.0.
pub fn gpa(store: &dyn Store, student: &User) -> Result<f64> {
    let approved = approved_subjects(store, student)?;

    let grades: Vec<f64> = approved
        .iter()
        .filter_map(|e| e.enrollment.grade)
        .collect();

    if grades.is_empty() {
        return Ok(0.0);
    }

    Ok(grades.iter().sum::<f64>() / grades.len() as f64)
}

/// Subjects assigned to the instructor.
pub fn assigned_subjects(store: &dyn Store, instructor: &User) -> Result<Vec<Subject>> {
    store.list_assigned_subjects(&instructor.id)
}

/// The roster of a subject the instructor teaches. Fails with
/// `PermissionDenied` when the subject belongs to someone else.
pub fn students_for_subject(
    store: &dyn Store,
    instructor: &User,
    subject_id: &str,
) -> Result<Vec<Enrollment>> {
    let subject = store.get_subject(subject_id)?.ok_or(Error::NotFound)?;

    if subject.assigned_instructor_id.as_deref() != Some(instructor.id.as_str()) {
        return Err(Error::PermissionDenied);
    }

    store.list_subject_enrollments(&subject.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::RoleKind;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn make_user(store: &dyn Store, username: &str, role: RoleKind) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.edu"),
            password_hash: "x".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: Some(role),
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();
        if role == RoleKind::Student {
            store.ensure_student_profile(&user.id).unwrap();
        }
        user
    }

    fn make_subject(store: &dyn Store, code: &str, credits: u32, instructor: &User) -> Subject {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: format!("Subject {code}"),
            code: code.to_string(),
            credits,
            semester: None,
            assigned_instructor_id: Some(instructor.id.clone()),
            created_at: Utc::now(),
        };
        store.create_subject(&subject).unwrap();
        subject
    }

    struct Fixture {
        store: SqliteStore,
        student: User,
        instructor: User,
    }

    fn fixture() -> Fixture {
        let store = test_store();
        let student = make_user(&store, "student", RoleKind::Student);
        let instructor = make_user(&store, "instructor", RoleKind::Instructor);
        Fixture {
            store,
            student,
            instructor,
        }
    }

    #[test]
    fn test_enroll_creates_enrolled_record() {
        let f = fixture();
        let subject = make_subject(&f.store, "MAT101", 4, &f.instructor);

        let enrollment = enroll(&f.store, &f.student, &subject.id).unwrap();
        assert_eq!(enrollment.state, EnrollmentState::Enrolled);
        assert!(enrollment.grade.is_none());
    }

    #[test]
    fn test_enroll_twice_is_duplicate() {
        let f = fixture();
        let subject = make_subject(&f.store, "MAT101", 4, &f.instructor);

        enroll(&f.store, &f.student, &subject.id).unwrap();
        let err = enroll(&f.store, &f.student, &subject.id).unwrap_err();
        assert!(matches!(err, Error::DuplicateEnrollment));
    }

    #[test]
    fn test_failed_enrollment_still_blocks_reenroll() {
        let f = fixture();
        let subject = make_subject(&f.store, "MAT101", 4, &f.instructor);

        let e = enroll(&f.store, &f.student, &subject.id).unwrap();
        grade(&f.store, &f.instructor, &e.id, 1.0).unwrap();

        let err = enroll(&f.store, &f.student, &subject.id).unwrap_err();
        assert!(matches!(err, Error::DuplicateEnrollment));
    }

    #[test]
    fn test_enroll_unknown_subject_is_not_found() {
        let f = fixture();
        let err = enroll(&f.store, &f.student, "missing").unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_enroll_requires_approved_prerequisite() {
        let f = fixture();
        let basic = make_subject(&f.store, "PRO101", 3, &f.instructor);
        let advanced = make_subject(&f.store, "PRO102", 3, &f.instructor);
        f.store
            .set_prerequisites(&advanced.id, &[basic.id.clone()])
            .unwrap();

        let err = enroll(&f.store, &f.student, &advanced.id).unwrap_err();
        match err {
            Error::PrerequisitesNotMet { missing } => assert_eq!(missing, vec!["PRO101"]),
            other => panic!("expected PrerequisitesNotMet, got {other:?}"),
        }

        // An enrolled-but-ungraded prerequisite is not enough
        let e = enroll(&f.store, &f.student, &basic.id).unwrap();
        let err = enroll(&f.store, &f.student, &advanced.id).unwrap_err();
        assert!(matches!(err, Error::PrerequisitesNotMet { .. }));

        // Approving it unlocks the advanced subject
        grade(&f.store, &f.instructor, &e.id, 4.0).unwrap();
        enroll(&f.store, &f.student, &advanced.id).unwrap();
    }

    #[test]
    fn test_enroll_with_multiple_prerequisites_names_all_missing() {
        let f = fixture();
        let p1 = make_subject(&f.store, "PRE001", 3, &f.instructor);
        let p2 = make_subject(&f.store, "PRE002", 3, &f.instructor);
        let advanced = make_subject(&f.store, "ADV001", 4, &f.instructor);
        f.store
            .set_prerequisites(&advanced.id, &[p1.id.clone(), p2.id.clone()])
            .unwrap();

        let e1 = enroll(&f.store, &f.student, &p1.id).unwrap();
        grade(&f.store, &f.instructor, &e1.id, 3.5).unwrap();

        let err = enroll(&f.store, &f.student, &advanced.id).unwrap_err();
        match err {
            Error::PrerequisitesNotMet { missing } => assert_eq!(missing, vec!["PRE002"]),
            other => panic!("expected PrerequisitesNotMet, got {other:?}"),
        }

        let e2 = enroll(&f.store, &f.student, &p2.id).unwrap();
        grade(&f.store, &f.instructor, &e2.id, 3.5).unwrap();
        enroll(&f.store, &f.student, &advanced.id).unwrap();
    }

    #[test]
    fn test_enroll_credit_limit() {
        let f = fixture();

        // 3 credits against a 16-credit limit succeeds
        let first = make_subject(&f.store, "SUB001", 3, &f.instructor);
        enroll(&f.store, &f.student, &first.id).unwrap();

        // 14 more would make 17 total
        let second = make_subject(&f.store, "SUB002", 14, &f.instructor);
        let err = enroll(&f.store, &f.student, &second.id).unwrap_err();
        match err {
            Error::CreditLimitExceeded {
                used,
                requested,
                limit,
            } => {
                assert_eq!(used, 3);
                assert_eq!(requested, 14);
                assert_eq!(limit, 16);
            }
            other => panic!("expected CreditLimitExceeded, got {other:?}"),
        }

        // Exactly reaching the limit is allowed
        let third = make_subject(&f.store, "SUB003", 13, &f.instructor);
        enroll(&f.store, &f.student, &third.id).unwrap();
    }

    #[test]
    fn test_configured_credit_limit_overrides_default() {
        let f = fixture();
        f.store
            .set_max_credits_per_term(&f.student.id, 6)
            .unwrap();

        let first = make_subject(&f.store, "SUB001", 4, &f.instructor);
        enroll(&f.store, &f.student, &first.id).unwrap();

        let second = make_subject(&f.store, "SUB002", 3, &f.instructor);
        let err = enroll(&f.store, &f.student, &second.id).unwrap_err();
        assert!(matches!(err, Error::CreditLimitExceeded { limit: 6, .. }));
    }

    #[test]
    fn test_graded_enrollments_free_up_credits() {
        let f = fixture();
        let first = make_subject(&f.store, "SUB001", 10, &f.instructor);
        let e = enroll(&f.store, &f.student, &first.id).unwrap();
        grade(&f.store, &f.instructor, &e.id, 4.0).unwrap();

        // Approved enrollments no longer count against the term limit
        let second = make_subject(&f.store, "SUB002", 16, &f.instructor);
        enroll(&f.store, &f.student, &second.id).unwrap();
    }

    #[test]
    fn test_grade_threshold_inclusive_at_three() {
        let f = fixture();
        let s1 = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let s2 = make_subject(&f.store, "SUB002", 3, &f.instructor);

        let e1 = enroll(&f.store, &f.student, &s1.id).unwrap();
        let updated = grade(&f.store, &f.instructor, &e1.id, 3.0).unwrap();
        assert_eq!(updated.state, EnrollmentState::Approved);

        let e2 = enroll(&f.store, &f.student, &s2.id).unwrap();
        let updated = grade(&f.store, &f.instructor, &e2.id, 2.9999).unwrap();
        assert_eq!(updated.state, EnrollmentState::Failed);
        assert_eq!(updated.grade, Some(2.9999));
    }

    #[test]
    fn test_grade_rejects_out_of_range() {
        let f = fixture();
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let e = enroll(&f.store, &f.student, &subject.id).unwrap();

        for value in [-0.1, 5.1, f64::NAN] {
            let err = grade(&f.store, &f.instructor, &e.id, value).unwrap_err();
            assert!(matches!(err, Error::InvalidGradeValue(_)));
        }

        // Boundary values are accepted
        grade(&f.store, &f.instructor, &e.id, 0.0).unwrap();
    }

    #[test]
    fn test_grade_requires_owning_instructor() {
        let f = fixture();
        let other = make_user(&f.store, "other", RoleKind::Instructor);
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let e = enroll(&f.store, &f.student, &subject.id).unwrap();

        let err = grade(&f.store, &other, &e.id, 4.0).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied));
    }

    #[test]
    fn test_grade_rejects_terminal_states() {
        let f = fixture();
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let e = enroll(&f.store, &f.student, &subject.id).unwrap();

        grade(&f.store, &f.instructor, &e.id, 4.0).unwrap();
        let err = grade(&f.store, &f.instructor, &e.id, 2.0).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition(_)));

        // The stored grade is untouched by the rejected attempt
        let stored = f.store.get_enrollment(&e.id).unwrap().unwrap();
        assert_eq!(stored.grade, Some(4.0));
        assert_eq!(stored.state, EnrollmentState::Approved);
    }

    #[test]
    fn test_failing_grade_notifies_student() {
        let f = fixture();
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let e = enroll(&f.store, &f.student, &subject.id).unwrap();

        let updated = grade(&f.store, &f.instructor, &e.id, 2.0).unwrap();
        assert_eq!(updated.state, EnrollmentState::Failed);

        let unread = notify::unread(&f.store, &f.student).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, notify::KIND_GRADE);
        assert!(unread[0].message.contains("2"));
        assert!(unread[0].message.contains(&subject.name));
    }

    #[test]
    fn test_close_subject_blocked_by_ungraded() {
        let f = fixture();
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let graded_student = make_user(&f.store, "graded", RoleKind::Student);

        let ungraded = enroll(&f.store, &f.student, &subject.id).unwrap();
        let e = enroll(&f.store, &graded_student, &subject.id).unwrap();
        grade(&f.store, &f.instructor, &e.id, 4.0).unwrap();

        let err = close_subject(&f.store, &f.instructor, &subject.id).unwrap_err();
        assert!(matches!(err, Error::UngradedEnrollmentsExist));

        // All-or-nothing: the graded sibling must not have been closed
        let stored = f.store.get_enrollment(&e.id).unwrap().unwrap();
        assert_eq!(stored.state, EnrollmentState::Approved);

        grade(&f.store, &f.instructor, &ungraded.id, 2.5).unwrap();
        assert!(close_subject(&f.store, &f.instructor, &subject.id).unwrap());

        for id in [&ungraded.id, &e.id] {
            let stored = f.store.get_enrollment(id).unwrap().unwrap();
            assert_eq!(stored.state, EnrollmentState::Closed);
        }
    }

    #[test]
    fn test_close_subject_without_enrollments_is_noop() {
        let f = fixture();
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        assert!(!close_subject(&f.store, &f.instructor, &subject.id).unwrap());
    }

    #[test]
    fn test_close_subject_requires_owning_instructor() {
        let f = fixture();
        let other = make_user(&f.store, "other", RoleKind::Instructor);
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);

        let err = close_subject(&f.store, &other, &subject.id).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied));
    }

    #[test]
    fn test_gpa_over_approved_only() {
        let f = fixture();
        let s1 = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let s2 = make_subject(&f.store, "SUB002", 3, &f.instructor);
        let s3 = make_subject(&f.store, "SUB003", 3, &f.instructor);

        let e1 = enroll(&f.store, &f.student, &s1.id).unwrap();
        grade(&f.store, &f.instructor, &e1.id, 4.5).unwrap();
        let e2 = enroll(&f.store, &f.student, &s2.id).unwrap();
        grade(&f.store, &f.instructor, &e2.id, 4.0).unwrap();

        // A failed grade must not drag the average down
        let e3 = enroll(&f.store, &f.student, &s3.id).unwrap();
        grade(&f.store, &f.instructor, &e3.id, 1.0).unwrap();

        let value = gpa(&f.store, &f.student).unwrap();
        assert!((value - 4.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_gpa_zero_without_approved_enrollments() {
        let f = fixture();
        assert_eq!(gpa(&f.store, &f.student).unwrap(), 0.0);

        // An in-progress enrollment still yields zero
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        enroll(&f.store, &f.student, &subject.id).unwrap();
        assert_eq!(gpa(&f.store, &f.student).unwrap(), 0.0);
    }

    #[test]
    fn test_history_ordered_and_complete() {
        let f = fixture();
        let s1 = make_subject(&f.store, "SUB001", 3, &f.instructor);
        let s2 = make_subject(&f.store, "SUB002", 3, &f.instructor);

        let e1 = enroll(&f.store, &f.student, &s1.id).unwrap();
        grade(&f.store, &f.instructor, &e1.id, 2.0).unwrap();
        enroll(&f.store, &f.student, &s2.id).unwrap();

        let all = history(&f.store, &f.student).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].subject.code, "SUB001");
        assert_eq!(all[0].enrollment.state, EnrollmentState::Failed);
        assert_eq!(all[1].subject.code, "SUB002");
        assert_eq!(all[1].enrollment.state, EnrollmentState::Enrolled);

        assert_eq!(enrolled_subjects(&f.store, &f.student).unwrap().len(), 1);
        assert_eq!(failed_subjects(&f.store, &f.student).unwrap().len(), 1);
        assert!(approved_subjects(&f.store, &f.student).unwrap().is_empty());
    }

    #[test]
    fn test_students_for_subject_scoped_to_owner() {
        let f = fixture();
        let other = make_user(&f.store, "other", RoleKind::Instructor);
        let subject = make_subject(&f.store, "SUB001", 3, &f.instructor);
        enroll(&f.store, &f.student, &subject.id).unwrap();

        let roster = students_for_subject(&f.store, &f.instructor, &subject.id).unwrap();
        assert_eq!(roster.len(), 1);

        let err = students_for_subject(&f.store, &other, &subject.id).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied));
    }

    #[test]
    fn test_assigned_subjects_filters_by_instructor() {
        let f = fixture();
        let other = make_user(&f.store, "other", RoleKind::Instructor);
        make_subject(&f.store, "SUB001", 3, &f.instructor);
        make_subject(&f.store, "SUB002", 3, &other);

        let mine = assigned_subjects(&f.store, &f.instructor).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].code, "SUB001");
    }
}
