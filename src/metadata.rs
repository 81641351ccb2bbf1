//! Metadata domain contracts.
//!
//! Owns the open key/value bag carried by messages and frame configs, plus the
//! well-known keys the engine and chat flow write.

pub mod keys;
pub mod value;

pub use value::{MetaValue, Metadata};
