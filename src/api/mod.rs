//! HTTP API.
//!
//! Exposes the clinic pipeline as JSON endpoints under `/api/`. The router
//! is composable and carries its collaborators in [`AppState`]; handlers
//! open a database connection per request and run the blocking pipeline on
//! the blocking thread pool.

pub mod endpoints;
pub mod error;
pub mod router;

pub use router::{api_router, AppState};
