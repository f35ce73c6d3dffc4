pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod gateway;
pub mod observability;
pub mod provider;
pub mod services;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
