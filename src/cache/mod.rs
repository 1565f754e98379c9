//! 对象缓存
//!
//! 以 JSON 字符串存放，当前只有 moka 内存后端，用于缓存已认证用户。

pub mod object_cache;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

pub enum CacheResult<T> {
    Found(T),
    NotFound,
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;
    async fn insert_raw(&self, key: String, value: String, ttl: u64);
    async fn remove(&self, key: &str);
    async fn invalidate_all(&self);
}

impl dyn ObjectCache {
    /// 读取并反序列化，反序列化失败的条目会被删除
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> CacheResult<T> {
        match self.get_raw(key).await {
            CacheResult::Found(json) => match serde_json::from_str::<T>(&json) {
                Ok(value) => CacheResult::Found(value),
                Err(e) => {
                    tracing::debug!("Dropping undecodable cache entry {}: {}", key, e);
                    self.remove(key).await;
                    CacheResult::NotFound
                }
            },
            CacheResult::NotFound => CacheResult::NotFound,
        }
    }

    pub async fn insert<T: Serialize + Sync>(&self, key: String, value: &T, ttl: u64) {
        match serde_json::to_string(value) {
            Ok(json) => self.insert_raw(key, json, ttl).await,
            Err(e) => tracing::warn!("Failed to serialize cache entry {}: {}", key, e),
        }
    }
}

/// 已认证用户的缓存键
pub fn user_cache_key(user_id: i64) -> String {
    format!("user:{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::object_cache::moka::MokaCacheWrapper;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache: Arc<dyn ObjectCache> = Arc::new(MokaCacheWrapper::with_capacity(16, 60));
        cache.insert(user_cache_key(1), &vec!["a".to_string()], 0).await;

        match cache.get::<Vec<String>>(&user_cache_key(1)).await {
            CacheResult::Found(v) => assert_eq!(v, vec!["a".to_string()]),
            CacheResult::NotFound => panic!("expected cached value"),
        }

        cache.remove(&user_cache_key(1)).await;
        assert!(matches!(
            cache.get::<Vec<String>>(&user_cache_key(1)).await,
            CacheResult::NotFound
        ));
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_dropped() {
        let cache: Arc<dyn ObjectCache> = Arc::new(MokaCacheWrapper::with_capacity(16, 60));
        cache
            .insert_raw("user:2".to_string(), "not json".to_string(), 0)
            .await;
        assert!(matches!(
            cache.get::<Vec<i64>>("user:2").await,
            CacheResult::NotFound
        ));
        assert!(matches!(cache.get_raw("user:2").await, CacheResult::NotFound));
    }
}
