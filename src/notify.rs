//! Notification emitter: reacts to grading and user-creation events, and
//! owns the read/purge lifecycle of notification records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Enrollment, Notification, Subject, User};

pub const KIND_GRADE: &str = "grade";
pub const KIND_WELCOME: &str = "welcome";

/// Default cutoff for [`purge_old`]: read notifications older than this
/// many days are deleted by the maintenance job.
pub const DEFAULT_PURGE_DAYS: i64 = 90;

fn append(store: &dyn Store, user_id: &str, kind: &str, message: String) -> Result<Notification> {
    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: kind.to_string(),
        message,
        created_at: Utc::now(),
        read: false,
    };
    store.create_notification(&notification)?;
    Ok(notification)
}

/// Fired by the enrollment engine when an instructor assigns a grade.
pub fn grade_assigned(
    store: &dyn Store,
    enrollment: &Enrollment,
    subject: &Subject,
) -> Result<Notification> {
    let grade = enrollment.grade.unwrap_or_default();
    append(
        store,
        &enrollment.student_id,
        KIND_GRADE,
        format!("Grade {grade} in {}", subject.name),
    )
}

/// Fired when a user account is created.
pub fn user_created(store: &dyn Store, user: &User) -> Result<Notification> {
    append(store, &user.id, KIND_WELCOME, "User created".to_string())
}

/// Unread notifications for a user, newest first.
pub fn unread(store: &dyn Store, user: &User) -> Result<Vec<Notification>> {
    store.list_unread_notifications(&user.id)
}

/// Marks a notification as read. Only the owning user may do so.
pub fn mark_read(store: &dyn Store, notification_id: &str, user: &User) -> Result<Notification> {
    let notification = store
        .get_notification(notification_id)?
        .ok_or(Error::NotFound)?;

    if notification.user_id != user.id {
        return Err(Error::PermissionDenied);
    }

    store.mark_notification_read(&notification.id)?;
    Ok(Notification {
        read: true,
        ..notification
    })
}

/// Deletes read notifications created before `before`. Unread notifications
/// are preserved regardless of age unless `keep_unread` is false.
pub fn purge_old(store: &dyn Store, before: DateTime<Utc>, keep_unread: bool) -> Result<usize> {
    store.purge_notifications(before, keep_unread)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::store::SqliteStore;
    use crate::types::RoleKind;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn make_user(store: &dyn Store, username: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: format!("{username}@example.edu"),
            password_hash: "x".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            role: Some(RoleKind::Student),
            created_at: now,
            updated_at: now,
        };
        store.create_user(&user).unwrap();
        user
    }

    #[test]
    fn test_welcome_notification_on_user_creation() {
        let store = test_store();
        let user = make_user(&store, "ada");

        user_created(&store, &user).unwrap();

        let unread = unread(&store, &user).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, KIND_WELCOME);
        assert_eq!(unread[0].message, "User created");
    }

    #[test]
    fn test_mark_read_requires_ownership() {
        let store = test_store();
        let owner = make_user(&store, "owner");
        let other = make_user(&store, "other");

        let n = user_created(&store, &owner).unwrap();

        let err = mark_read(&store, &n.id, &other).unwrap_err();
        assert!(matches!(err, Error::PermissionDenied));

        let marked = mark_read(&store, &n.id, &owner).unwrap();
        assert!(marked.read);
        assert!(unread(&store, &owner).unwrap().is_empty());
    }

    #[test]
    fn test_purge_keeps_unread_and_recent() {
        let store = test_store();
        let user = make_user(&store, "ada");

        let old_read = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            kind: KIND_GRADE.to_string(),
            message: "old read".to_string(),
            created_at: Utc::now() - Duration::days(120),
            read: true,
        };
        let old_unread = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            kind: KIND_GRADE.to_string(),
            message: "old unread".to_string(),
            created_at: Utc::now() - Duration::days(120),
            read: false,
        };
        let recent_read = Notification {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            kind: KIND_GRADE.to_string(),
            message: "recent read".to_string(),
            created_at: Utc::now(),
            read: true,
        };
        for n in [&old_read, &old_unread, &recent_read] {
            store.create_notification(n).unwrap();
        }

        let cutoff = Utc::now() - Duration::days(DEFAULT_PURGE_DAYS);
        let purged = purge_old(&store, cutoff, true).unwrap();
        assert_eq!(purged, 1);

        assert!(store.get_notification(&old_read.id).unwrap().is_none());
        assert!(store.get_notification(&old_unread.id).unwrap().is_some());
        assert!(store.get_notification(&recent_read.id).unwrap().is_some());
    }
}
