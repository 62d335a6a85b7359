pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod render;
pub mod server;
pub mod store;

pub use error::{Error, Result};
