//! Resilient external-content fetch gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌───────────────────────────────────────────────────────────┐
//!                 │                       FETCH GATEWAY                        │
//!                 │                                                            │
//!   fetch(url)    │  ┌───────────┐   ┌──────────┐   ┌────────────────────┐     │
//!   ──────────────┼─▶│ admission │──▶│ circuit  │──▶│  orchestrator      │     │
//!                 │  │  limiter  │   │ breaker  │   │  tier 1: fast ─────┼─────┼──▶ Origin
//!                 │  └───────────┘   └──────────┘   │  tier 2: rendered ─┼─────┼──▶ Render service
//!                 │                                 └─────────┬──────────┘     │
//!   FetchResult   │                                           │                │
//!   ◀─────────────┼───────────────────────────────────────────┘                │
//!                 │                                                            │
//!                 │  Cross-cutting: config · resilience (retry/backoff/        │
//!                 │  deadline) · observability · lifecycle · health · admin    │
//!                 └───────────────────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod admission;
pub mod config;
pub mod fetch;
pub mod gateway;

// Surfaces
pub mod admin;
pub mod health;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GatewayConfig;
pub use fetch::{FetchError, FetchRequest, FetchResult, StrategyKind};
pub use gateway::{Gateway, GatewayError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
