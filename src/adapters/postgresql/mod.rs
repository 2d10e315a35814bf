//! PostgreSQL document store
//!
//! KE EMu records are stored as JSONB rows in a single `documents` table;
//! completion markers live in `completion_markers`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::{PostgreSQLDocument, PostgreSQLMarker};
