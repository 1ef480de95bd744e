//! Differential orchestration: cache-first, then bounded concurrent
//! reasoning calls, then rule-based fallbacks. Never fails on external errors.

pub mod fallback;
pub mod insights;
pub mod orchestrator;
pub mod response;

pub use fallback::*;
pub use insights::*;
pub use orchestrator::*;
pub use response::*;
