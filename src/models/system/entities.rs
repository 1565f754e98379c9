use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// 配置值类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub enum SettingValueType {
    String,
    Integer,
    Boolean,
}

crate::impl_string_enum!(SettingValueType, "配置值类型", {
    String => "string",
    Integer => "integer",
    Boolean => "boolean",
});

/// 已知配置键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownSettingKey {
    SystemName,
    AccessTokenExpiry,
    RefreshTokenExpiry,
    RefreshTokenRememberMeExpiry,
    AttendanceWindowMinutes,
    AttendanceLateAfterMinutes,
    AttendanceAllowSelfMark,
    AttendanceUtcOffsetMinutes,
}

impl KnownSettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            KnownSettingKey::SystemName => "app.system_name",
            KnownSettingKey::AccessTokenExpiry => "jwt.access_token_expiry",
            KnownSettingKey::RefreshTokenExpiry => "jwt.refresh_token_expiry",
            KnownSettingKey::RefreshTokenRememberMeExpiry => "jwt.refresh_token_remember_me_expiry",
            KnownSettingKey::AttendanceWindowMinutes => "attendance.window_minutes",
            KnownSettingKey::AttendanceLateAfterMinutes => "attendance.late_after_minutes",
            KnownSettingKey::AttendanceAllowSelfMark => "attendance.allow_self_mark",
            KnownSettingKey::AttendanceUtcOffsetMinutes => "attendance.utc_offset_minutes",
        }
    }

    pub fn value_type(&self) -> SettingValueType {
        match self {
            KnownSettingKey::SystemName => SettingValueType::String,
            KnownSettingKey::AttendanceAllowSelfMark => SettingValueType::Boolean,
            _ => SettingValueType::Integer,
        }
    }

    /// 整数配置的取值范围（闭区间）
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            KnownSettingKey::AccessTokenExpiry => Some((1, 1440)),
            KnownSettingKey::RefreshTokenExpiry => Some((1, 365)),
            KnownSettingKey::RefreshTokenRememberMeExpiry => Some((1, 365)),
            KnownSettingKey::AttendanceWindowMinutes => Some((1, 1440)),
            KnownSettingKey::AttendanceLateAfterMinutes => Some((0, 1440)),
            KnownSettingKey::AttendanceUtcOffsetMinutes => Some((-720, 840)),
            KnownSettingKey::SystemName | KnownSettingKey::AttendanceAllowSelfMark => None,
        }
    }

    /// 校验配置值
    pub fn validate_value(&self, value: &str) -> Result<(), String> {
        match self.value_type() {
            SettingValueType::String => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(format!("{} 不能为空", self.as_str()));
                }
                if trimmed.chars().count() > 100 {
                    return Err(format!("{} 长度不能超过 100 个字符", self.as_str()));
                }
                Ok(())
            }
            SettingValueType::Integer => {
                let parsed = value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| format!("{} 必须是整数", self.as_str()))?;
                if let Some((min, max)) = self.integer_range()
                    && !(min..=max).contains(&parsed)
                {
                    return Err(format!(
                        "{} 必须在 {min} 到 {max} 之间",
                        self.as_str()
                    ));
                }
                Ok(())
            }
            SettingValueType::Boolean => match value.trim() {
                "true" | "false" => Ok(()),
                _ => Err(format!("{} 必须是 true 或 false", self.as_str())),
            },
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            KnownSettingKey::SystemName,
            KnownSettingKey::AccessTokenExpiry,
            KnownSettingKey::RefreshTokenExpiry,
            KnownSettingKey::RefreshTokenRememberMeExpiry,
            KnownSettingKey::AttendanceWindowMinutes,
            KnownSettingKey::AttendanceLateAfterMinutes,
            KnownSettingKey::AttendanceAllowSelfMark,
            KnownSettingKey::AttendanceUtcOffsetMinutes,
        ]
    }
}

impl std::str::FromStr for KnownSettingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownSettingKey::all()
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("Unknown setting key: {s}"))
    }
}

/// 系统设置实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub value_type: SettingValueType,
    pub description: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub updated_by: Option<i64>,
}

/// 设置审计日志实体
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/system.ts")]
pub struct SettingAudit {
    pub id: i64,
    pub setting_key: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub changed_by: i64,
    pub changed_at: chrono::DateTime<chrono::Utc>,
    pub ip_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_parse() {
        for key in KnownSettingKey::all() {
            assert_eq!(key.as_str().parse::<KnownSettingKey>().unwrap(), key);
        }
        assert!("upload.max_size".parse::<KnownSettingKey>().is_err());
    }

    #[test]
    fn test_window_range() {
        let key = KnownSettingKey::AttendanceWindowMinutes;
        assert!(key.validate_value("15").is_ok());
        assert!(key.validate_value("1440").is_ok());
        assert!(key.validate_value("0").is_err());
        assert!(key.validate_value("1441").is_err());
        assert!(key.validate_value("abc").is_err());
    }

    #[test]
    fn test_late_threshold_allows_zero() {
        assert!(
            KnownSettingKey::AttendanceLateAfterMinutes
                .validate_value("0")
                .is_ok()
        );
    }

    #[test]
    fn test_utc_offset_range() {
        let key = KnownSettingKey::AttendanceUtcOffsetMinutes;
        assert!(key.validate_value("-720").is_ok());
        assert!(key.validate_value("840").is_ok());
        assert!(key.validate_value("480").is_ok());
        assert!(key.validate_value("-721").is_err());
        assert!(key.validate_value("841").is_err());
    }

    #[test]
    fn test_boolean_and_string_values() {
        let flag = KnownSettingKey::AttendanceAllowSelfMark;
        assert!(flag.validate_value("true").is_ok());
        assert!(flag.validate_value("yes").is_err());

        let name = KnownSettingKey::SystemName;
        assert!(name.validate_value("Rollcall").is_ok());
        assert!(name.validate_value("   ").is_err());
    }
}
