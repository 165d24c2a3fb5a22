//! arbor-cli library: command handlers, logging setup and tree file loading, exposed for unit tests.

pub mod commands;
pub mod logging;
pub mod tree_file;
