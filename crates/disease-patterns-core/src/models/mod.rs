//! Domain models for the disease pattern engine.

mod aggregate;
mod patient;
mod record;
mod summary;

pub use aggregate::*;
pub use patient::*;
pub use record::*;
pub use summary::*;
