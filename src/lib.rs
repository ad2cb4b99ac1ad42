pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod slug;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{NotekeeperError, Result};
pub use storage::SqliteStore;
pub use web::{router, AppState};
