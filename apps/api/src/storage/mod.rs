//! Durable key-value state: settings and the History Store's entry list.
//!
//! Every backend stores JSON values under the stable keys in [`keys`], so a
//! deployment can move between Redis and Postgres without a schema change.

pub mod handlers;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;

/// Stable names of everything the service persists.
pub mod keys {
    pub const HH_TOKEN: &str = "hh_token";
    pub const HH_MODEL: &str = "hh_model";
    pub const AD_MAX_TOKENS: &str = "ad_max_tokens";
    pub const AD_PLATFORMS: &str = "ad_platforms";
    pub const AD_STYLE: &str = "ad_style";
    pub const AD_DESCRIPTION: &str = "ad_description";
    pub const AD_CUSTOM_PROMPT: &str = "ad_custom_prompt";
    pub const AD_HISTORY: &str = "ad_history";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Stored value for '{key}' is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value is not serializable: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Writing `Value::Null` removes the key.
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Reads and deserializes `key`. Absent and null values both read as `None`.
pub async fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StorageError> {
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            }),
    }
}

pub async fn save<T: Serialize + ?Sized>(store: &dyn KvStore, key: &str, value: &T) -> Result<(), StorageError> {
    let value = serde_json::to_value(value).map_err(StorageError::Serialize)?;
    store.set(key, value).await
}

/// Picks the backend from configuration: Redis, then Postgres, then memory.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn KvStore>> {
    if let Some(url) = &config.redis_url {
        let store = redis::RedisStore::connect(url).await?;
        info!("Using Redis for persisted state");
        return Ok(Arc::new(store));
    }
    if let Some(url) = &config.database_url {
        let store = postgres::PgStore::connect(url).await?;
        info!("Using PostgreSQL for persisted state");
        return Ok(Arc::new(store));
    }
    warn!("No REDIS_URL or DATABASE_URL set: state is kept in memory and will not survive a restart");
    Ok(Arc::new(memory::MemoryStore::new()))
}
