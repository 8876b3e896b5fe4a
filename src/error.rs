use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("token lookup collision")]
    TokenLookupCollision,

    #[error("duplicate enrollment")]
    DuplicateEnrollment,

    #[error("prerequisites not met: missing {}", .missing.join(", "))]
    PrerequisitesNotMet { missing: Vec<String> },

    #[error("credit limit exceeded: {used} enrolled + {requested} requested > {limit}")]
    CreditLimitExceeded {
        used: u32,
        requested: u32,
        limit: u32,
    },

    #[error("invalid grade value: {0} (must be within 0.0..=5.0)")]
    InvalidGradeValue(f64),

    #[error("invalid state transition: enrollment is already {0}")]
    InvalidStateTransition(String),

    #[error("ungraded enrollments exist")]
    UngradedEnrollmentsExist,

    #[error("permission denied")]
    PermissionDenied,

    #[error("user is not an instructor")]
    NotAnInstructor,

    #[error("prerequisite cycle through {0}")]
    PrerequisiteCycle(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("token expired")]
    TokenExpired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl Error {
    /// Stable machine-readable name surfaced to API clients alongside the
    /// human-readable message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Database(_) => "Database",
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::TokenLookupCollision => "TokenLookupCollision",
            Self::DuplicateEnrollment => "DuplicateEnrollment",
            Self::PrerequisitesNotMet { .. } => "PrerequisitesNotMet",
            Self::CreditLimitExceeded { .. } => "CreditLimitExceeded",
            Self::InvalidGradeValue(_) => "InvalidGradeValue",
            Self::InvalidStateTransition(_) => "InvalidStateTransition",
            Self::UngradedEnrollmentsExist => "UngradedEnrollmentsExist",
            Self::PermissionDenied => "PermissionDenied",
            Self::NotAnInstructor => "NotAnInstructor",
            Self::PrerequisiteCycle(_) => "PrerequisiteCycle",
            Self::Io(_) => "Io",
            Self::Config(_) => "Config",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::InvalidTokenFormat => "InvalidTokenFormat",
            Self::TokenExpired => "TokenExpired",
            Self::BadRequest(_) => "BadRequest",
            Self::Conflict(_) => "Conflict",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
