//! Repository layer: entity-scoped database operations.

mod differential;

pub use differential::*;
