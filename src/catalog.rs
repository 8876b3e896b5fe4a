//! Subject catalog rules: instructor assignment and the prerequisite graph.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{RoleKind, Subject};

/// Assigns an instructor to a subject, overwriting any previous assignment.
/// The target user must hold the instructor role.
pub fn assign_instructor(store: &dyn Store, subject_id: &str, user_id: &str) -> Result<Subject> {
    let subject = store.get_subject(subject_id)?.ok_or(Error::NotFound)?;
    let user = store.get_user(user_id)?.ok_or(Error::NotFound)?;

    if user.role != Some(RoleKind::Instructor) {
        return Err(Error::NotAnInstructor);
    }

    store.set_assigned_instructor(&subject.id, &user.id)?;

    Ok(Subject {
        assigned_instructor_id: Some(user.id),
        ..subject
    })
}

/// Replaces a subject's prerequisite set.
///
/// Rejects edge sets that would make the prerequisite graph cyclic: a
/// subject may not require itself, directly or through any chain of
/// prerequisites.
pub fn set_prerequisites(
    store: &dyn Store,
    subject_id: &str,
    prerequisite_ids: &[String],
) -> Result<Vec<Subject>> {
    let subject = store.get_subject(subject_id)?.ok_or(Error::NotFound)?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut edges = Vec::with_capacity(prerequisite_ids.len());
    let mut prerequisites = Vec::with_capacity(prerequisite_ids.len());
    for id in prerequisite_ids {
        if !seen.insert(id) {
            continue;
        }
        if *id == subject.id {
            return Err(Error::PrerequisiteCycle(subject.code.clone()));
        }
        let prerequisite = store.get_subject(id)?.ok_or(Error::NotFound)?;
        if reaches(store, &prerequisite.id, &subject.id)? {
            return Err(Error::PrerequisiteCycle(prerequisite.code.clone()));
        }
        edges.push(id.clone());
        prerequisites.push(prerequisite);
    }

    store.set_prerequisites(&subject.id, &edges)?;
    Ok(prerequisites)
}

/// Walks the existing prerequisite graph from `from`, looking for `target`.
fn reaches(store: &dyn Store, from: &str, target: &str) -> Result<bool> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack = vec![from.to_string()];

    while let Some(id) = stack.pop() {
        if id == target {
            return Ok(true);
        }
        if seen.insert(id.clone()) {
            stack.extend(store.list_prerequisite_ids(&id)?);
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::User;

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
        user
    }

    fn make_subject(store: &dyn Store, code: &str) -> Subject {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: format!("Subject {code}"),
            code: code.to_string(),
            credits: 3,
            semester: None,
            assigned_instructor_id: None,
            created_at: Utc::now(),
        };
        store.create_subject(&subject).unwrap();
        subject
    }

    #[test]
    fn test_assign_instructor() {
        let store = test_store();
        let instructor = make_user(&store, "instructor", RoleKind::Instructor);
        let subject = make_subject(&store, "MAT101");

        let updated = assign_instructor(&store, &subject.id, &instructor.id).unwrap();
        assert_eq!(updated.assigned_instructor_id.as_deref(), Some(instructor.id.as_str()));

        // Idempotent: assigning again overwrites with the same result
        let updated = assign_instructor(&store, &subject.id, &instructor.id).unwrap();
        assert_eq!(updated.assigned_instructor_id.as_deref(), Some(instructor.id.as_str()));
    }

    #[test]
    fn test_assign_instructor_rejects_other_roles() {
        let store = test_store();
        let student = make_user(&store, "student", RoleKind::Student);
        let subject = make_subject(&store, "MAT101");

        let err = assign_instructor(&store, &subject.id, &student.id).unwrap_err();
        assert!(matches!(err, Error::NotAnInstructor));
    }

    #[test]
    fn test_set_prerequisites_replaces_edges() {
        let store = test_store();
        let a = make_subject(&store, "AAA101");
        let b = make_subject(&store, "BBB101");
        let c = make_subject(&store, "CCC101");

        set_prerequisites(&store, &c.id, &[a.id.clone(), b.id.clone()]).unwrap();
        assert_eq!(store.list_prerequisites(&c.id).unwrap().len(), 2);

        set_prerequisites(&store, &c.id, &[a.id.clone()]).unwrap();
        let remaining = store.list_prerequisites(&c.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].code, "AAA101");
    }

    #[test]
    fn test_self_prerequisite_rejected() {
        let store = test_store();
        let a = make_subject(&store, "AAA101");

        let err = set_prerequisites(&store, &a.id, &[a.id.clone()]).unwrap_err();
        assert!(matches!(err, Error::PrerequisiteCycle(_)));
    }

    #[test]
    fn test_transitive_cycle_rejected() {
        let store = test_store();
        let a = make_subject(&store, "AAA101");
        let b = make_subject(&store, "BBB101");
        let c = make_subject(&store, "CCC101");

        // a <- b <- c is fine; closing the loop with c -> a is not
        set_prerequisites(&store, &b.id, &[a.id.clone()]).unwrap();
        set_prerequisites(&store, &c.id, &[b.id.clone()]).unwrap();

        let err = set_prerequisites(&store, &a.id, &[c.id.clone()]).unwrap_err();
        match err {
            Error::PrerequisiteCycle(code) => assert_eq!(code, "CCC101"),
            other => panic!("expected PrerequisiteCycle, got {other:?}"),
        }

        // The failed write must not have left an edge behind
        assert!(store.list_prerequisites(&a.id).unwrap().is_empty());
    }
}
