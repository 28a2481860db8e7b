//! Infrastructure layer: storage backends, database wiring, configuration.

pub mod config;
pub mod db;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use store::{BlogStore, DynBlogStore, InMemoryBlogStore, PostgresBlogStore, StoreError, StoreResult};
