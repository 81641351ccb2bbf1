//! Integration tests for the branchstack engine

mod chat_flow;
mod config_loading;
mod hierarchy;
mod lifecycle;
mod sled_store;
mod test_utils;
