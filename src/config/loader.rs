use chrono::{FixedOffset, Offset, Utc};
use config::{Config, ConfigError, Environment, File};
use std::sync::OnceLock;

use super::AppConfig;
use crate::models::system::entities::KnownSettingKey;

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl AppConfig {
    /// 加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // 首先加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(
                File::with_name(&format!(
                    "config.{}",
                    std::env::var("APP_ENV").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // 最后加载环境变量覆盖
            .add_source(
                Environment::with_prefix("ROLLCALL")
                    .separator("__")
                    .try_parsing(true),
            );

        // 常用环境变量
        builder = builder
            .set_override_option("app.environment", std::env::var("APP_ENV").ok())?
            .set_override_option("app.log_level", std::env::var("RUST_LOG").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("server.unix_socket_path", std::env::var("UNIX_SOCKET").ok())?
            .set_override_option("server.workers", std::env::var("CPU_COUNT").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("backup.dir", std::env::var("BACKUP_DIR").ok())?;

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        // 处理工作线程数
        if app_config.server.workers == 0 {
            app_config.server.workers = num_cpus::get().min(app_config.server.max_workers);
        }

        if app_config.jwt.secret.is_empty() {
            return Err(ConfigError::Message(
                "jwt.secret must be set (JWT_SECRET)".to_string(),
            ));
        }

        check_setting_ranges(&app_config.setting_defaults())?;

        Ok(app_config)
    }

    /// 作为系统设置回退值的整数配置项
    fn setting_defaults(&self) -> [(KnownSettingKey, i64); 6] {
        [
            (KnownSettingKey::AccessTokenExpiry, self.jwt.access_token_expiry),
            (KnownSettingKey::RefreshTokenExpiry, self.jwt.refresh_token_expiry),
            (
                KnownSettingKey::RefreshTokenRememberMeExpiry,
                self.jwt.refresh_token_remember_me_expiry,
            ),
            (KnownSettingKey::AttendanceWindowMinutes, self.attendance.window_minutes),
            (KnownSettingKey::AttendanceLateAfterMinutes, self.attendance.late_after_minutes),
            (KnownSettingKey::AttendanceUtcOffsetMinutes, self.attendance.utc_offset_minutes),
        ]
    }

    /// 获取全局配置实例
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {e}");
                std::process::exit(1);
            })
        })
    }

    /// 初始化配置 (在应用启动时调用)
    pub fn init() -> Result<(), ConfigError> {
        let config = Self::load()?;
        APP_CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("Configuration already initialized".to_string()))?;
        Ok(())
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    /// 获取服务器绑定地址
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取 Unix 套接字路径 (如果配置了)
    #[cfg(unix)]
    pub fn unix_socket_path(&self) -> Option<&str> {
        if self.server.unix_socket_path.is_empty() {
            None
        } else {
            Some(&self.server.unix_socket_path)
        }
    }
}

/// 配置文件中的回退值与系统设置使用同一取值范围
fn check_setting_ranges(defaults: &[(KnownSettingKey, i64)]) -> Result<(), ConfigError> {
    for (key, value) in defaults {
        key.validate_value(&value.to_string())
            .map_err(ConfigError::Message)?;
    }
    Ok(())
}

/// 分钟偏移转换为固定时区，超出范围时回退到 UTC
pub fn offset_from_minutes(minutes: i64) -> FixedOffset {
    i32::try_from(minutes * 60)
        .ok()
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_from_minutes() {
        assert_eq!(offset_from_minutes(480).local_minus_utc(), 8 * 3600);
        assert_eq!(offset_from_minutes(-300).local_minus_utc(), -5 * 3600);
        assert_eq!(offset_from_minutes(100_000).local_minus_utc(), 0);
    }

    #[test]
    fn test_setting_defaults_are_range_checked() {
        let valid = [
            (KnownSettingKey::AttendanceWindowMinutes, 15),
            (KnownSettingKey::AttendanceLateAfterMinutes, 0),
            (KnownSettingKey::AttendanceUtcOffsetMinutes, 480),
        ];
        assert!(check_setting_ranges(&valid).is_ok());

        let zero_window = [(KnownSettingKey::AttendanceWindowMinutes, 0)];
        let err = check_setting_ranges(&zero_window).unwrap_err();
        assert!(err.to_string().contains("attendance.window_minutes"));

        let far_offset = [(KnownSettingKey::AttendanceUtcOffsetMinutes, 900)];
        assert!(check_setting_ranges(&far_offset).is_err());

        let expired = [(KnownSettingKey::AccessTokenExpiry, -1)];
        assert!(check_setting_ranges(&expired).is_err());
    }
}
