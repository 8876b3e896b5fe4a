//! CSV report building for student transcripts and instructor summaries.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::RoleKind;

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_grade(grade: Option<f64>) -> String {
    grade.map_or(String::new(), |g| g.to_string())
}

/// One row per enrollment of the student: `Name,Subject,Grade,State`.
/// The target must hold the student role.
pub fn student_report(store: &dyn Store, student_id: &str) -> Result<String> {
    let student = store.get_user(student_id)?.ok_or(Error::NotFound)?;
    if student.role != Some(RoleKind::Student) {
        return Err(Error::NotFound);
    }

    let mut out = String::from("Name,Subject,Grade,State\n");
    for record in store.list_student_enrollments(&student.id, None)? {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&student.full_name()),
            csv_field(&record.subject.name),
            format_grade(record.enrollment.grade),
            record.enrollment.state,
        ));
    }
    Ok(out)
}

/// One row per subject the instructor teaches: `Name,Subject,Average`,
/// where the average spans that subject's graded enrollments and is empty
/// when nothing has been graded yet.
pub fn instructor_report(store: &dyn Store, instructor_id: &str) -> Result<String> {
    let instructor = store.get_user(instructor_id)?.ok_or(Error::NotFound)?;
    if instructor.role != Some(RoleKind::Instructor) {
        return Err(Error::NotFound);
    }

    let mut out = String::from("Name,Subject,Average\n");
    for subject in store.list_assigned_subjects(&instructor.id)? {
        let grades: Vec<f64> = store
            .list_subject_enrollments(&subject.id)?
            .iter()
            .filter_map(|e| e.grade)
            .collect();

        let average = if grades.is_empty() {
            String::new()
        } else {
            (grades.iter().sum::<f64>() / grades.len() as f64).to_string()
        };

        out.push_str(&format!(
            "{},{},{}\n",
            csv_field(&instructor.full_name()),
            csv_field(&subject.name),
            average,
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::enrollment;
    use crate::store::SqliteStore;
    use crate::types::{Subject, User};

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn make_user(store: &dyn Store, username: &str, first: &str, last: &str, role: RoleKind) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.edu"),
            password_hash: "x".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
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

    #[test]
    fn test_student_report_rows() {
        let store = test_store();
        let instructor = make_user(&store, "turing", "Alan", "Turing", RoleKind::Instructor);
        let student = make_user(&store, "ada", "Ada", "Lovelace", RoleKind::Student);

        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: "Algorithms, Advanced".to_string(),
            code: "ALG201".to_string(),
            credits: 3,
            semester: None,
            assigned_instructor_id: Some(instructor.id.clone()),
            created_at: Utc::now(),
        };
        store.create_subject(&subject).unwrap();

        let e = enrollment::enroll(&store, &student, &subject.id).unwrap();
        enrollment::grade(&store, &instructor, &e.id, 4.5).unwrap();

        let csv = student_report(&store, &student.id).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Subject,Grade,State");
        // The comma in the subject name forces quoting
        assert_eq!(lines[1], "Ada Lovelace,\"Algorithms, Advanced\",4.5,approved");
    }

    #[test]
    fn test_student_report_rejects_non_students() {
        let store = test_store();
        let instructor = make_user(&store, "turing", "Alan", "Turing", RoleKind::Instructor);

        let err = student_report(&store, &instructor.id).unwrap_err();
        assert!(matches!(err, Error::NotFound));
    }

    #[test]
    fn test_instructor_report_averages() {
        let store = test_store();
        let instructor = make_user(&store, "turing", "Alan", "Turing", RoleKind::Instructor);
        let alice = make_user(&store, "alice", "", "", RoleKind::Student);
        let bob = make_user(&store, "bob", "", "", RoleKind::Student);

        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: "Discrete Mathematics".to_string(),
            code: "MAT101".to_string(),
            credits: 4,
            semester: None,
            assigned_instructor_id: Some(instructor.id.clone()),
            created_at: Utc::now(),
        };
        store.create_subject(&subject).unwrap();

        let e = enrollment::enroll(&store, &alice, &subject.id).unwrap();
        enrollment::grade(&store, &instructor, &e.id, 4.0).unwrap();
        let e = enrollment::enroll(&store, &bob, &subject.id).unwrap();
        enrollment::grade(&store, &instructor, &e.id, 3.0).unwrap();

        let csv = instructor_report(&store, &instructor.id).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Name,Subject,Average");
        assert_eq!(lines[1], "Alan Turing,Discrete Mathematics,3.5");
    }

    #[test]
    fn test_instructor_report_empty_average_when_ungraded() {
        let store = test_store();
        let instructor = make_user(&store, "turing", "Alan", "Turing", RoleKind::Instructor);

        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: "Operating Systems".to_string(),
            code: "SO101".to_string(),
            credits: 3,
            semester: None,
            assigned_instructor_id: Some(instructor.id.clone()),
            created_at: Utc::now(),
        };
        store.create_subject(&subject).unwrap();

        let csv = instructor_report(&store, &instructor.id).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with("Operating Systems,"));
    }
}
