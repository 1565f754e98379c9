//! 运行时设置缓存
//!
//! 启动时从 `system_settings` 表加载，管理员修改设置后同步更新。
//! 表中没有的键回退到配置文件中的值。

use chrono::FixedOffset;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{AppConfig, offset_from_minutes};

static SETTINGS: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn settings() -> &'static RwLock<HashMap<String, String>> {
    SETTINGS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// 声明一个带配置文件回退值的设置读取函数
macro_rules! setting_getter {
    ($(#[$meta:meta])* $name:ident: $ty:ty = $key:literal, |$cfg:ident| $fallback:expr) => {
        $(#[$meta])*
        pub async fn $name() -> $ty {
            match Self::parsed::<$ty>($key).await {
                Some(value) => value,
                None => {
                    let $cfg = AppConfig::get();
                    $fallback
                }
            }
        }
    };
}

/// 运行时设置访问接口
pub struct DynamicConfig;

impl DynamicConfig {
    /// 用数据库中的全部设置替换缓存内容
    pub async fn init(values: Vec<(String, String)>) {
        let mut guard = settings().write().await;
        *guard = values.into_iter().collect();
        info!("Runtime settings cache loaded with {} entries", guard.len());
    }

    /// 更新单个设置
    pub async fn update(key: &str, value: &str) {
        settings()
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        debug!("运行时设置更新: {} = {}", key, value);
    }

    async fn parsed<T: FromStr>(key: &str) -> Option<T> {
        settings()
            .read()
            .await
            .get(key)
            .and_then(|raw| raw.parse().ok())
    }

    setting_getter!(
        /// 系统名称
        system_name: String = "app.system_name", |cfg| cfg.app.system_name.clone()
    );

    setting_getter!(
        /// Access Token 有效期（分钟）
        access_token_expiry: i64 = "jwt.access_token_expiry", |cfg| cfg.jwt.access_token_expiry
    );

    setting_getter!(
        /// Refresh Token 有效期（天）
        refresh_token_expiry: i64 = "jwt.refresh_token_expiry", |cfg| cfg.jwt.refresh_token_expiry
    );

    setting_getter!(
        refresh_token_remember_me_expiry: i64 = "jwt.refresh_token_remember_me_expiry",
        |cfg| cfg.jwt.refresh_token_remember_me_expiry
    );

    setting_getter!(
        /// 默认签到窗口（分钟）
        attendance_window_minutes: i64 = "attendance.window_minutes",
        |cfg| cfg.attendance.window_minutes
    );

    setting_getter!(
        /// 迟到阈值（分钟），0 表示不区分迟到
        late_after_minutes: i64 = "attendance.late_after_minutes",
        |cfg| cfg.attendance.late_after_minutes
    );

    setting_getter!(
        allow_self_mark: bool = "attendance.allow_self_mark", |cfg| cfg.attendance.allow_self_mark
    );

    setting_getter!(
        /// 学校时区相对 UTC 的偏移（分钟）
        utc_offset_minutes: i64 = "attendance.utc_offset_minutes",
        |cfg| cfg.attendance.utc_offset_minutes
    );

    /// 学校时区
    pub async fn school_offset() -> FixedOffset {
        offset_from_minutes(Self::utc_offset_minutes().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 仅使用测试专用的键
    #[tokio::test]
    async fn test_update_and_parse() {
        DynamicConfig::update("test.cache.number", "42").await;
        DynamicConfig::update("test.cache.flag", "true").await;
        DynamicConfig::update("test.cache.bad", "forty-two").await;

        assert_eq!(DynamicConfig::parsed::<i64>("test.cache.number").await, Some(42));
        assert_eq!(DynamicConfig::parsed::<bool>("test.cache.flag").await, Some(true));
        assert_eq!(DynamicConfig::parsed::<i64>("test.cache.bad").await, None);
        assert_eq!(DynamicConfig::parsed::<i64>("test.cache.missing").await, None);
    }
}
