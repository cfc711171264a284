//! Subcommand implementations

pub mod analysis;
pub mod load;
pub mod samples;
