//! Key-value tier error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid cache data: {0}")]
    InvalidData(String),
}

pub type CacheResult<T> = Result<T, CacheError>;
