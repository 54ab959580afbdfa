//! Store collaborator: the only code that talks to the Redis server.
//! Sampling and polling reports depend on the `KeyStore` trait or on
//! `RedisStore` directly; nothing else issues commands.

pub mod info;
pub mod redis_store;

use async_trait::async_trait;

use crate::errors::StatError;

pub use redis_store::RedisStore;

/// Raw key bytes as returned by RANDOMKEY.
pub type Key = Vec<u8>;

/// The two round trips the sampler needs.
///
/// Implement this to sample from something other than a live server
/// (tests use an in-memory fake).
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// `Ok(None)` when the dataset holds no keys.
    async fn random_key(&self) -> Result<Option<Key>, StatError>;

    /// `Ok(None)` when the length can't be obtained for this key.
    async fn serialized_length(&self, key: &Key) -> Result<Option<u64>, StatError>;
}
