//! Redis connection pool management.

use redis::aio::ConnectionManager;
use thiserror::Error;

/// Default Redis URL when neither `CAPPLAN_REDIS_URL` nor `REDIS_URL` is set.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Redis error types.
#[derive(Error, Debug)]
pub enum RedisError {
    #[error("Redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for Redis operations.
pub type RedisResult<T> = Result<T, RedisError>;

/// Redis connection pool. `ConnectionManager` multiplexes internally and is
/// Clone, so callers clone it to get a mutable handle for each operation.
pub type RedisPool = ConnectionManager;

/// Initialize a Redis connection pool from a URL.
///
/// Example URL: `redis://127.0.0.1:6379`
pub async fn init_pool(redis_url: &str) -> RedisResult<RedisPool> {
    let client = redis::Client::open(redis_url)?;
    let manager = ConnectionManager::new(client).await?;
    tracing::debug!(url = redis_url, "Redis connection established");
    Ok(manager)
}

/// Initialize a pool reading `CAPPLAN_REDIS_URL`, then `REDIS_URL`, from the
/// environment, falling back to [`DEFAULT_REDIS_URL`].
pub async fn init_pool_from_env() -> RedisResult<RedisPool> {
    let url = std::env::var("CAPPLAN_REDIS_URL")
        .or_else(|_| std::env::var("REDIS_URL"))
        .unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string());
    init_pool(&url).await
}
