use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use crate::cache::{CacheResult, ObjectCache};
use crate::config::CacheConfig;
use crate::errors::{Result, RollcallError};

pub struct MokaCacheWrapper {
    inner: Cache<String, String>,
}

impl MokaCacheWrapper {
    /// 按 `[cache]` 配置创建
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        if config.memory.max_capacity == 0 {
            return Err(RollcallError::cache_connection(
                "cache.memory.max_capacity must be greater than 0",
            ));
        }
        Ok(Self::with_capacity(
            config.memory.max_capacity,
            config.default_ttl,
        ))
    }

    pub fn with_capacity(max_capacity: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(std::time::Duration::from_secs(ttl_secs))
            .build();

        debug!(
            "MokaCacheWrapper initialized with max capacity: {}, ttl: {}s",
            max_capacity, ttl_secs
        );
        Self { inner }
    }
}

#[async_trait]
impl ObjectCache for MokaCacheWrapper {
    async fn get_raw(&self, key: &str) -> CacheResult<String> {
        if let Some(value) = self.inner.get(key).await {
            debug!("Cache hit: {}", key);
            CacheResult::Found(value)
        } else {
            debug!("Cache miss: {}", key);
            CacheResult::NotFound
        }
    }

    async fn insert_raw(&self, key: String, value: String, ttl: u64) {
        // moka 使用创建时设置的全局 TTL
        self.inner.insert(key, value).await;
        if ttl != 0 {
            debug!("Moka cache ignores per-item TTL, using global TTL configuration");
        }
    }

    async fn remove(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    async fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfig;

    fn config(max_capacity: u64) -> CacheConfig {
        CacheConfig {
            default_ttl: 60,
            memory: MemoryConfig { max_capacity },
        }
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            MokaCacheWrapper::from_config(&config(0)),
            Err(RollcallError::CacheConnection(_))
        ));
        assert!(MokaCacheWrapper::from_config(&config(16)).is_ok());
    }
}
