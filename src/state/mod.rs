//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the frontier stack and visited set owned by the engine
//! - `EngineState`: the lifecycle of a single crawl run (idle, running, draining, ...)

mod crawl_state;
mod engine_state;

// Re-export main types
pub use crawl_state::{CrawlState, StateInvariantError};
pub use engine_state::EngineState;
