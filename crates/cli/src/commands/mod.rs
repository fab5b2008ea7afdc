//! CLI subcommand implementations

pub mod feed;
pub mod placement;
