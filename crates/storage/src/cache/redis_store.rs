use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use super::{CacheError, CacheStore};

fn conn(e: redis::RedisError) -> CacheError {
    CacheError::Connection(e.to_string())
}

/// Cache store on a Redis server; expiry is delegated to `SET EX`.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
}

impl RedisCacheStore {
    /// Open a managed connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Connection` if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url).map_err(conn)?;
        let connection = client.get_connection_manager().await.map_err(conn)?;
        info!("connected to redis cache store");
        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        connection.get::<_, Option<String>>(key).await.map_err(conn)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        // EX 0 is rejected by redis
        let seconds = ttl.as_secs().max(1);
        connection
            .set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(conn)
    }
}
