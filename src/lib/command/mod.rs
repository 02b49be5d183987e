pub mod probe;
pub mod runner;
pub mod types;
