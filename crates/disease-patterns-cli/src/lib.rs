//! Command-line front end for the disease pattern analytics engine.

pub mod commands;
pub mod logging;
pub mod summary;
