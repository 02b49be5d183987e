pub mod state;
pub mod store;
pub mod types;
