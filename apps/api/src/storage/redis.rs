use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::info;

use super::{KvStore, StorageError};

const KEY_PREFIX: &str = "textgen:";

/// JSON strings under `textgen:<key>` in Redis.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis connection established");
        Ok(Self { conn })
    }
}

fn prefixed(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(prefixed(key)).await?;
        raw.map(|s| {
            serde_json::from_str(&s).map_err(|source| StorageError::Malformed {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut conn = self.conn.clone();
        if value.is_null() {
            conn.del::<_, ()>(prefixed(key)).await?;
        } else {
            conn.set::<_, _, ()>(prefixed(key), value.to_string()).await?;
        }
        Ok(())
    }
}
