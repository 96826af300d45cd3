//! CLI subcommand implementations.

pub mod history;
pub mod punch;
pub mod report;
pub mod settings;
pub mod summary;
pub mod util;
