//! Export of ranked disease reports.

mod report;

pub use report::*;
