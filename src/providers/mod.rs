pub mod auth;
pub mod repository;
pub mod rest;
pub mod util;
pub mod wire;

pub use repository::Repository;
pub use rest::ApiClient;
