//! Command implementations

pub mod build;
pub mod check;
pub mod completions;
pub mod coverage;
pub mod links;
pub mod orphans;
pub mod utils;
