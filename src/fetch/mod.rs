//! Content acquisition subsystem.
//!
//! # Data Flow
//! ```text
//! FetchRequest (types.rs)
//!     → orchestrator.rs (breaker check, tier loop)
//!         → fast.rs      (reqwest GET)        retried per RetryPolicy
//!         → rendered.rs  (Renderer seam)      retried per RetryPolicy
//!         → validate.rs  (ContentValidator)   per attempt
//!     → FetchResult | FetchError
//! ```
//!
//! # Design Decisions
//! - Strategies are trait objects performing a single attempt each
//! - Tier order is fixed at construction: fast first, rendered last

pub mod fast;
pub mod orchestrator;
pub mod rendered;
pub mod strategy;
pub mod types;
pub mod validate;

pub use fast::FastFetch;
pub use orchestrator::FetchOrchestrator;
pub use rendered::{RenderServiceClient, RenderedFetch, Renderer};
pub use strategy::{AcquireFuture, AcquisitionStrategy};
pub use types::{FetchError, FetchRequest, FetchResult, StrategyKind, TierFailure};
pub use validate::{ContentValidator, NonEmptyContent, RequiredMarkers};
