mod admin;
mod catalog;
pub mod dto;
mod instructor;
mod notifications;
mod reports;
pub mod response;
mod router;
mod student;
pub mod validation;

pub use catalog::catalog_router;
pub use router::{AppState, create_router};
