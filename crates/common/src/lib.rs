//! Common utilities and shared types for huddle.
//!
//! This crate provides foundational components used across all huddle crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Cache**: Key/value and counter-list store via [`CacheStore`], backed by
//!   Redis in production and by [`MemoryCache`] in tests
//!
//! # Example
//!
//! ```no_run
//! use huddle_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {id} for {}", config.database.url);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod id;

pub use cache::{CacheStore, MemoryCache, RedisCache, SharedCache};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
