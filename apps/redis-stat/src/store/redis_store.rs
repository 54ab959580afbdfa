use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ErrorKind, RedisResult, Value};
use tracing::{debug, info};

use crate::errors::StatError;
use crate::store::{Key, KeyStore};

const SERIALIZED_LENGTH_FIELD: &str = "serializedlength:";

/// `KeyStore` over a single multiplexed connection to a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Opens the connection and, when a password is given, authenticates it.
    pub async fn connect(url: &str, auth: Option<&str>) -> Result<Self, StatError> {
        info!("Connecting to {url}");
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        let store = Self { conn };

        if let Some(password) = auth {
            store.authenticate(password).await?;
            info!("AUTH succeeded");
        }
        Ok(store)
    }

    pub async fn authenticate(&self, password: &str) -> Result<(), StatError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("AUTH")
            .arg(password)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Raw INFO text.
    pub async fn info(&self) -> Result<String, StatError> {
        let mut conn = self.conn.clone();
        let info: String = redis::cmd("INFO").query_async(&mut conn).await?;
        Ok(info)
    }

    pub async fn ping(&self) -> Result<(), StatError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyStore for RedisStore {
    async fn random_key(&self) -> Result<Option<Key>, StatError> {
        let mut conn = self.conn.clone();
        let key: Option<Key> = redis::cmd("RANDOMKEY").query_async(&mut conn).await?;
        Ok(key)
    }

    async fn serialized_length(&self, key: &Key) -> Result<Option<u64>, StatError> {
        let mut conn = self.conn.clone();

        // The value may be swapped out; GET loads it back. The reply itself is
        // irrelevant (non-string types answer WRONGTYPE).
        let _: RedisResult<Value> = redis::cmd("GET")
            .arg(key.as_slice())
            .query_async(&mut conn)
            .await;

        let reply: RedisResult<String> = redis::cmd("DEBUG")
            .arg("OBJECT")
            .arg(key.as_slice())
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(text) => Ok(parse_serialized_length(&text)),
            Err(e) if e.kind() == ErrorKind::ResponseError => {
                debug!("DEBUG OBJECT refused: {e}");
                Ok(None)
            }
            Err(e) => Err(StatError::Store(e)),
        }
    }
}

/// Extracts the integer following `serializedlength:` in a DEBUG OBJECT reply.
pub(crate) fn parse_serialized_length(reply: &str) -> Option<u64> {
    let start = reply.find(SERIALIZED_LENGTH_FIELD)? + SERIALIZED_LENGTH_FIELD.len();
    let digits: String = reply[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serialized_length() {
        let reply = "Value at:0x7f1c refcount:1 encoding:raw serializedlength:42 lru:123";
        assert_eq!(parse_serialized_length(reply), Some(42));
    }

    #[test]
    fn test_parse_serialized_length_at_end() {
        assert_eq!(
            parse_serialized_length("encoding:int serializedlength:5"),
            Some(5)
        );
    }

    #[test]
    fn test_parse_serialized_length_missing_field() {
        assert_eq!(parse_serialized_length("Value at:0x1 refcount:1"), None);
    }

    #[test]
    fn test_parse_serialized_length_no_digits() {
        assert_eq!(parse_serialized_length("serializedlength: lru:1"), None);
    }
}
