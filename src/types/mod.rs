mod models;
mod role;
mod state;

pub use models::*;
pub use role::RoleKind;
pub use state::{EnrollmentState, PASS_THRESHOLD};
