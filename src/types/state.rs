use std::fmt;

use serde::{Deserialize, Serialize};

/// Grades at or above this value approve the enrollment; below it, fail.
/// The comparison uses the raw submitted value, inclusive at the threshold.
pub const PASS_THRESHOLD: f64 = 3.0;

/// Lifecycle state of an enrollment.
///
/// `Enrolled` is the only state a grade may be assigned in. `Approved` and
/// `Failed` are graded-but-open; `Closed` is terminal and reachable only
/// through subject closure once every sibling enrollment carries a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentState {
    Enrolled,
    Approved,
    Failed,
    Closed,
}

impl EnrollmentState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::Approved => "approved",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<EnrollmentState> {
        match s {
            "enrolled" => Some(Self::Enrolled),
            "approved" => Some(Self::Approved),
            "failed" => Some(Self::Failed),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    /// State a freshly assigned grade puts an enrollment into.
    #[must_use]
    pub fn for_grade(value: f64) -> EnrollmentState {
        if value >= PASS_THRESHOLD {
            Self::Approved
        } else {
            Self::Failed
        }
    }
}

impl fmt::Display for EnrollmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
