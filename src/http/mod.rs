//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, request id + trace layers)
//!     → request.rs (query parsing, correlation id from x-request-id)
//!     → Gateway::execute
//!     → response.rs (FetchResult → JSON, FetchError → status + JSON)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{FetchParams, X_REQUEST_ID};
pub use response::{ErrorBody, FetchResponse};
pub use server::{AppState, HttpServer};
