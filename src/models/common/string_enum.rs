//! 字符串枚举辅助宏
//!
//! 数据库中枚举以小写字符串保存，HTTP 层反序列化失败时返回中文提示。

/// 为枚举生成 `as_str`、`Display`、`FromStr` 与 `Deserialize`
///
/// ```ignore
/// impl_string_enum!(UserStatus, "用户状态", {
///     Active => "active",
///     Inactive => "inactive",
/// });
/// ```
#[macro_export]
macro_rules! impl_string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $value:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn variants() -> &'static [&'static str] {
                &[$($value),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(format!(
                        "无效的{}: '{}'. 支持的值: {}",
                        $label,
                        s,
                        Self::variants().join(", ")
                    )),
                }
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse::<$name>().map_err(serde::de::Error::custom)
            }
        }
    };
}
