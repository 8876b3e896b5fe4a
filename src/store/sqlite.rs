use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_state(s: &str) -> EnrollmentState {
    EnrollmentState::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid enrollment state in database: '{}'", s);
        EnrollmentState::Enrolled
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == ErrorCode::ConstraintViolation
    )
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        first_name: row.get(4)?,
        last_name: row.get(5)?,
        role: row
            .get::<_, Option<String>>(6)?
            .as_deref()
            .and_then(RoleKind::parse),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, \
     r.name, u.created_at, u.updated_at";

fn row_to_subject(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        credits: row.get(3)?,
        semester: row.get(4)?,
        assigned_instructor_id: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

const SUBJECT_COLUMNS: &str =
    "id, name, code, credits, semester, assigned_instructor_id, created_at";

fn row_to_enrollment(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        subject_id: row.get(2)?,
        state: parse_state(&row.get::<_, String>(3)?),
        grade: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const ENROLLMENT_COLUMNS: &str = "id, student_id, subject_id, state, grade, created_at";

fn row_to_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        message: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        read: row.get(5)?,
    })
}

fn row_to_token(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Role operations

    fn list_roles(&self) -> Result<Vec<Role>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, display_name FROM roles ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            let name: String = row.get(1)?;
            Ok((row.get::<_, i64>(0)?, name, row.get::<_, String>(2)?))
        })?;

        let mut roles = Vec::new();
        for row in rows {
            let (id, name, display_name) = row?;
            match RoleKind::parse(&name) {
                Some(kind) => roles.push(Role {
                    id,
                    name: kind,
                    display_name,
                }),
                None => tracing::error!("Invalid role in database: '{}'", name),
            }
        }
        Ok(roles)
    }

    fn get_role(&self, kind: RoleKind) -> Result<Option<Role>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, display_name FROM roles WHERE name = ?1",
            params![kind.as_str()],
            |row| {
                Ok(Role {
                    id: row.get(0)?,
                    name: kind,
                    display_name: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, (SELECT id FROM roles WHERE name = ?7), ?8, ?9)",
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.role.map(RoleKind::as_str),
                    format_datetime(&user.created_at),
                    format_datetime(&user.updated_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u
                 LEFT JOIN roles r ON r.id = u.role_id WHERE u.id = ?1"
            ),
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u
                 LEFT JOIN roles r ON r.id = u.role_id WHERE u.username = ?1"
            ),
            params![username],
            row_to_user,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             LEFT JOIN roles r ON r.id = u.role_id
             WHERE u.id > ?1 ORDER BY u.id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], row_to_user)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn set_user_role(&self, id: &str, role: RoleKind) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET role_id = (SELECT id FROM roles WHERE name = ?1), updated_at = ?2
             WHERE id = ?3",
            params![role.as_str(), format_datetime(&Utc::now()), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Student profile operations

    fn ensure_student_profile(&self, user_id: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO student_profiles (user_id, max_credits_per_term)
             VALUES (?1, ?2)",
            params![user_id, DEFAULT_MAX_CREDITS_PER_TERM],
        )?;
        Ok(())
    }

    fn get_student_profile(&self, user_id: &str) -> Result<Option<StudentProfile>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, max_credits_per_term FROM student_profiles WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(StudentProfile {
                    user_id: row.get(0)?,
                    max_credits_per_term: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_max_credits_per_term(&self, user_id: &str, max_credits: u32) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE student_profiles SET max_credits_per_term = ?1 WHERE user_id = ?2",
            params![max_credits, user_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Subject operations

    fn create_subject(&self, subject: &Subject) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO subjects (id, name, code, credits, semester, assigned_instructor_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    subject.id,
                    subject.name,
                    subject.code,
                    subject.credits,
                    subject.semester,
                    subject.assigned_instructor_id,
                    format_datetime(&subject.created_at),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_subject(&self, id: &str) -> Result<Option<Subject>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1"),
            params![id],
            row_to_subject,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_subject_by_code(&self, code: &str) -> Result<Option<Subject>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE code = ?1"),
            params![code],
            row_to_subject,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_subjects(&self, cursor: &str, limit: i32) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE code > ?1 ORDER BY code LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], row_to_subject)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_subject(&self, subject: &Subject) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE subjects SET name = ?1, code = ?2, credits = ?3, semester = ?4 WHERE id = ?5",
            params![
                subject.name,
                subject.code,
                subject.credits,
                subject.semester,
                subject.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_subject(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM subjects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn set_assigned_instructor(&self, subject_id: &str, instructor_id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE subjects SET assigned_instructor_id = ?1 WHERE id = ?2",
            params![instructor_id, subject_id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn list_assigned_subjects(&self, instructor_id: &str) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBJECT_COLUMNS} FROM subjects WHERE assigned_instructor_id = ?1 ORDER BY code"
        ))?;

        let rows = stmt.query_map(params![instructor_id], row_to_subject)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Prerequisite edge operations

    fn set_prerequisites(&self, subject_id: &str, prerequisite_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM subject_prerequisites WHERE subject_id = ?1",
            params![subject_id],
        )?;
        for prerequisite_id in prerequisite_ids {
            tx.execute(
                "INSERT INTO subject_prerequisites (subject_id, prerequisite_id) VALUES (?1, ?2)",
                params![subject_id, prerequisite_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_prerequisites(&self, subject_id: &str) -> Result<Vec<Subject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.code, s.credits, s.semester, s.assigned_instructor_id, s.created_at
             FROM subjects s
             JOIN subject_prerequisites p ON p.prerequisite_id = s.id
             WHERE p.subject_id = ?1 ORDER BY s.code",
        )?;

        let rows = stmt.query_map(params![subject_id], row_to_subject)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_prerequisite_ids(&self, subject_id: &str) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT prerequisite_id FROM subject_prerequisites WHERE subject_id = ?1",
        )?;

        let rows = stmt.query_map(params![subject_id], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Enrollment operations

    fn create_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO enrollments (id, student_id, subject_id, state, grade, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    enrollment.id,
                    enrollment.student_id,
                    enrollment.subject_id,
                    enrollment.state.as_str(),
                    enrollment.grade,
                    format_datetime(&enrollment.created_at),
                ],
            )
            .map_err(|e| {
                // The UNIQUE(student_id, subject_id) constraint backstops
                // concurrent enrolls; the loser sees AlreadyExists.
                if is_unique_violation(&e) {
                    Error::AlreadyExists
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_enrollment(&self, id: &str) -> Result<Option<Enrollment>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = ?1"),
            params![id],
            row_to_enrollment,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_enrollment_for(&self, student_id: &str, subject_id: &str) -> Result<Option<Enrollment>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
                 WHERE student_id = ?1 AND subject_id = ?2"
            ),
            params![student_id, subject_id],
            row_to_enrollment,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_student_enrollments(
        &self,
        student_id: &str,
        state: Option<EnrollmentState>,
    ) -> Result<Vec<EnrollmentWithSubject>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT e.id, e.student_id, e.subject_id, e.state, e.grade, e.created_at,
                    s.id, s.name, s.code, s.credits, s.semester, s.assigned_instructor_id, s.created_at
             FROM enrollments e
             JOIN subjects s ON s.id = e.subject_id
             WHERE e.student_id = ?1 AND (?2 IS NULL OR e.state = ?2)
             ORDER BY e.created_at, e.id",
        )?;

        let rows = stmt.query_map(
            params![student_id, state.map(EnrollmentState::as_str)],
            |row| {
                Ok(EnrollmentWithSubject {
                    enrollment: Enrollment {
                        id: row.get(0)?,
                        student_id: row.get(1)?,
                        subject_id: row.get(2)?,
                        state: parse_state(&row.get::<_, String>(3)?),
                        grade: row.get(4)?,
                        created_at: parse_datetime(&row.get::<_, String>(5)?),
                    },
                    subject: Subject {
                        id: row.get(6)?,
                        name: row.get(7)?,
                        code: row.get(8)?,
                        credits: row.get(9)?,
                        semester: row.get(10)?,
                        assigned_instructor_id: row.get(11)?,
                        created_at: parse_datetime(&row.get::<_, String>(12)?),
                    },
                })
            },
        )?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_subject_enrollments(&self, subject_id: &str) -> Result<Vec<Enrollment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
             WHERE subject_id = ?1 ORDER BY created_at, id"
        ))?;

        let rows = stmt.query_map(params![subject_id], row_to_enrollment)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn enrolled_credits(&self, student_id: &str) -> Result<u32> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COALESCE(SUM(s.credits), 0)
             FROM enrollments e
             JOIN subjects s ON s.id = e.subject_id
             WHERE e.student_id = ?1 AND e.state = 'enrolled'",
            params![student_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn set_enrollment_grade(&self, id: &str, grade: f64, state: EnrollmentState) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE enrollments SET grade = ?1, state = ?2 WHERE id = ?3",
            params![grade, state.as_str(), id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn count_ungraded_enrollments(&self, subject_id: &str) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE subject_id = ?1 AND grade IS NULL",
            params![subject_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn close_subject_enrollments(&self, subject_id: &str) -> Result<usize> {
        let rows = self.conn().execute(
            "UPDATE enrollments SET state = 'closed' WHERE subject_id = ?1",
            params![subject_id],
        )?;
        Ok(rows)
    }

    // Notification operations

    fn create_notification(&self, notification: &Notification) -> Result<()> {
        self.conn().execute(
            "INSERT INTO notifications (id, user_id, kind, message, created_at, read)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                notification.id,
                notification.user_id,
                notification.kind,
                notification.message,
                format_datetime(&notification.created_at),
                notification.read,
            ],
        )?;
        Ok(())
    }

    fn get_notification(&self, id: &str) -> Result<Option<Notification>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, kind, message, created_at, read FROM notifications WHERE id = ?1",
            params![id],
            row_to_notification,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_unread_notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, message, created_at, read FROM notifications
             WHERE user_id = ?1 AND read = 0 ORDER BY created_at DESC, id",
        )?;

        let rows = stmt.query_map(params![user_id], row_to_notification)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn mark_notification_read(&self, id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1",
            params![id],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn purge_notifications(&self, cutoff: DateTime<Utc>, keep_unread: bool) -> Result<usize> {
        let rows = if keep_unread {
            self.conn().execute(
                "DELETE FROM notifications WHERE created_at < ?1 AND read = 1",
                params![format_datetime(&cutoff)],
            )?
        } else {
            self.conn().execute(
                "DELETE FROM notifications WHERE created_at < ?1",
                params![format_datetime(&cutoff)],
            )?
        };
        Ok(rows)
    }

    // Statistics queries

    fn count_users_with_role(&self, role: RoleKind) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM users u JOIN roles r ON r.id = u.role_id WHERE r.name = ?1",
            params![role.as_str()],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_active_students(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(DISTINCT u.id)
             FROM users u
             JOIN roles r ON r.id = u.role_id
             JOIN enrollments e ON e.student_id = u.id
             WHERE r.name = 'student'",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_subjects(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM subjects", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn count_subjects_with_instructor(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM subjects WHERE assigned_instructor_id IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_distinct_assigned_instructors(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(DISTINCT assigned_instructor_id) FROM subjects
             WHERE assigned_instructor_id IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn count_enrollments(&self) -> Result<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM enrollments", [], |row| row.get(0))
            .map_err(Error::from)
    }

    fn count_enrollments_in_state(&self, state: EnrollmentState) -> Result<i64> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*) FROM enrollments WHERE state = ?1",
            params![state.as_str()],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn average_grade(&self) -> Result<Option<f64>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT AVG(grade) FROM enrollments WHERE grade IS NOT NULL",
            [],
            |row| row.get(0),
        )
        .map_err(Error::from)
    }

    fn grade_histogram(&self) -> Result<[i64; 5]> {
        let conn = self.conn();
        conn.query_row(
            "SELECT
                COALESCE(SUM(grade < 1), 0),
                COALESCE(SUM(grade >= 1 AND grade < 2), 0),
                COALESCE(SUM(grade >= 2 AND grade < 3), 0),
                COALESCE(SUM(grade >= 3 AND grade < 4), 0),
                COALESCE(SUM(grade >= 4 AND grade <= 5), 0)
             FROM enrollments WHERE grade IS NOT NULL",
            [],
            |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ])
            },
        )
        .map_err(Error::from)
    }

    fn approved_grade_averages(&self) -> Result<Vec<f64>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT AVG(grade) FROM enrollments
             WHERE state = 'approved' AND grade IS NOT NULL
             GROUP BY student_id",
        )?;

        let rows = stmt.query_map([], |row| row.get(0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    token.id,
                    token.token_hash,
                    token.token_lookup,
                    token.is_admin,
                    token.user_id,
                    format_datetime(&token.created_at),
                    token.expires_at.as_ref().map(format_datetime),
                    token.last_used_at.as_ref().map(format_datetime),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::TokenLookupCollision
                } else {
                    Error::from(e)
                }
            })?;
        Ok(())
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            row_to_token,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            row_to_token,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], row_to_token)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at"
        ))?;

        let rows = stmt.query_map(params![user_id], row_to_token)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
