pub mod factory;
pub mod filter;
pub mod order;
pub mod reporter;
