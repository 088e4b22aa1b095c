//! Common utilities and shared types for subcast-pulse.
//!
//! This crate provides foundational components used across all subcast crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//!
//! # Example
//!
//! ```no_run
//! use subcast_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Listening on port {}", config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;

pub use config::{Config, FeedConfig, NeynarConfig, ServerConfig, UnlockConfig};
pub use error::{AppError, AppResult};
