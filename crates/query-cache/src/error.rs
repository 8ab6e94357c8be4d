use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to serialize value for cache key '{0}': {1}")]
    Serialization(String, serde_json::Error),

    #[error("TTL of {1:?} for cache key '{0}' is out of range")]
    TtlOverflow(String, std::time::Duration),
}
