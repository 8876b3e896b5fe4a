//! # Registrar
//!
//! An academic-records server, usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! registrar = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use registrar::server::{AppState, create_router};
//! use registrar::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/registrar.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the binary's CLI. Disable with `default-features = false`.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod enrollment;
pub mod error;
pub mod notify;
pub mod reports;
pub mod server;
pub mod stats;
pub mod store;
pub mod types;
