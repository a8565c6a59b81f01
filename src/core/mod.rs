//! Core business logic abstractions

pub mod allocation;
pub mod backend;
pub mod cache;
pub mod composition;
pub mod config;
pub mod distribution;
pub mod error;
pub mod log;
pub mod model;
pub mod resource;
pub mod session;

// Re-export main types for cleaner imports
pub use backend::Backend;
pub use error::ApiError;
pub use resource::Resource;
pub use session::{Role, Session};
