//! # Warden
//!
//! Permission caching and access decisions for a CI control plane, usable
//! both as a standalone server and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! warden = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden::config::AccessConfig;
//! use warden::remote::HttpAuthority;
//! use warden::server::{AppState, create_router};
//! use warden::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/warden.db").unwrap();
//! store.initialize().unwrap();
//!
//! let remote = HttpAuthority::new("https://scm.example.com/api/v1").unwrap();
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(remote),
//!     &AccessConfig::default(),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `warden` binary. Disable with `default-features = false`.

pub mod acl;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod remote;
pub mod server;
pub mod store;
pub mod types;
