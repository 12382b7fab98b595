//! # autoheal API
//!
//! HTTP control surface for step runs.
//!
//! ## Endpoints
//!
//! - `POST /run` starts a run from an instruction file on the server's disk
//! - `POST /pause`, `POST /resume`, `POST /stop` flip the run-control flags
//! - `GET /status` reports progress and the most recent log lines
//! - `GET /elements` lists actionable elements of the focused window
//! - `GET /results` returns the records of the current or last run
//! - `GET /health` liveness
//!
//! Only one run is active at a time. A run is a single spawned task; every
//! other request only reads or flips shared state.

pub mod error;
pub mod http;
pub mod log_buffer;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use http::routes::create_router;
pub use log_buffer::{RecentLogLayer, RecentLogs};
pub use server::{ApiServer, ServerAddr};
pub use state::AppState;
