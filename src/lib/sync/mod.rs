pub mod docker;
pub mod engine;
pub mod skopeo;
pub mod types;
