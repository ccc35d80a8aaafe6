//! Capplan Redis Data Layer
//!
//! Async Redis persistence for quarter records. Each quarter is one hash
//! holding its row metadata plus the serialized live and baseline datasets.

pub mod client;
pub mod queries;

pub use client::{RedisError, RedisPool, RedisResult, init_pool, init_pool_from_env};
pub use queries::quarters;
