//! Configuration sources layered over the defaults.

pub mod environment;
pub mod global_file;
pub mod workspace_file;
