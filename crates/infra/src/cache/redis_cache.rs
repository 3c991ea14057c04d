//! Redis-backed shipping cache invalidation.

use tracing::warn;

use stockgate_core::ProductId;

use super::{ShippingCache, product_key_prefix};

pub struct RedisShippingCache {
    client: redis::Client,
}

impl RedisShippingCache {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
        })
    }
}

impl ShippingCache for RedisShippingCache {
    fn invalidate_product(&self, product_id: ProductId) {
        let pattern = format!("{}*", product_key_prefix(product_id));

        let mut conn = match self.client.get_connection() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(product = %product_id, error = %e, "shipping cache unreachable, skipping invalidation");
                return;
            }
        };

        // SCAN instead of KEYS: invalidation runs on the hot stock path.
        let mut cursor: u64 = 0;
        loop {
            let scanned: Result<(u64, Vec<String>), redis::RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query(&mut conn);

            match scanned {
                Ok((next, keys)) => {
                    if !keys.is_empty() {
                        let deleted: Result<(), redis::RedisError> =
                            redis::cmd("DEL").arg(&keys).query(&mut conn);
                        if let Err(e) = deleted {
                            warn!(product = %product_id, error = %e, "shipping cache delete failed");
                        }
                    }
                    cursor = next;
                    if cursor == 0 {
                        break;
                    }
                }
                Err(e) => {
                    warn!(product = %product_id, error = %e, "shipping cache scan failed");
                    break;
                }
            }
        }
    }
}
