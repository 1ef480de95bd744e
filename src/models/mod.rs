pub mod enums;
pub mod lab;
pub mod prediction;
pub mod insights;
pub mod differential;

pub use enums::*;
pub use lab::*;
pub use prediction::*;
pub use insights::*;
pub use differential::*;
