use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of roles a user can hold. Permission checks dispatch on
/// this enum, never on raw role-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Admin,
    Instructor,
    Student,
}

impl RoleKind {
    pub const ALL: [RoleKind; 3] = [Self::Admin, Self::Instructor, Self::Student];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Instructor => "instructor",
            Self::Student => "student",
        }
    }

    /// Human-readable name used when seeding the roles table.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Instructor => "Instructor",
            Self::Student => "Student",
        }
    }

    pub fn parse(s: &str) -> Option<RoleKind> {
        match s {
            "admin" => Some(Self::Admin),
            "instructor" => Some(Self::Instructor),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
