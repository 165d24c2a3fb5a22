pub mod api;
pub mod config;
pub mod context;
pub mod error;
pub mod node;
pub mod queue;
pub mod scheduler;
