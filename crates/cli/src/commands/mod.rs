//! CLI commands

pub mod compile;
pub mod completion;
pub mod validate;
pub mod version;
