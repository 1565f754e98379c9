//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。
//! 存储层与工具函数返回该错误，服务层再映射为 HTTP 响应。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_rollcall_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone)]
        pub enum RollcallError {
            $($variant(String),)*
        }

        impl RollcallError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(RollcallError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(RollcallError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(RollcallError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl RollcallError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        RollcallError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_rollcall_errors! {
    CacheConnection("E001", "Cache Connection Error"),
    DatabaseConfig("E002", "Database Configuration Error"),
    DatabaseConnection("E003", "Database Connection Error"),
    DatabaseOperation("E004", "Database Operation Error"),
    FileOperation("E005", "File Operation Error"),
    Validation("E006", "Validation Error"),
    NotFound("E007", "Resource Not Found"),
    Serialization("E008", "Serialization Error"),
    Conflict("E009", "Conflict"),
    DateParse("E010", "Date Parse Error"),
    Authentication("E011", "Authentication Error"),
    Archive("E012", "Archive Error"),
    Export("E013", "Export Error"),
}

impl RollcallError {
    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for RollcallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for RollcallError {}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for RollcallError {
    fn from(err: sea_orm::DbErr) -> Self {
        RollcallError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for RollcallError {
    fn from(err: std::io::Error) -> Self {
        RollcallError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for RollcallError {
    fn from(err: serde_json::Error) -> Self {
        RollcallError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for RollcallError {
    fn from(err: chrono::ParseError) -> Self {
        RollcallError::DateParse(err.to_string())
    }
}

impl From<zip::result::ZipError> for RollcallError {
    fn from(err: zip::result::ZipError) -> Self {
        RollcallError::Archive(err.to_string())
    }
}

impl From<csv::Error> for RollcallError {
    fn from(err: csv::Error) -> Self {
        RollcallError::Export(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for RollcallError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        RollcallError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RollcallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RollcallError::cache_connection("test").code(), "E001");
        assert_eq!(RollcallError::database_config("test").code(), "E002");
        assert_eq!(RollcallError::validation("test").code(), "E006");
        assert_eq!(RollcallError::authentication("test").code(), "E011");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            RollcallError::cache_connection("test").error_type(),
            "Cache Connection Error"
        );
        assert_eq!(
            RollcallError::validation("test").error_type(),
            "Validation Error"
        );
    }

    #[test]
    fn test_conflict_and_archive_codes() {
        assert_eq!(RollcallError::conflict("dup").code(), "E009");
        assert_eq!(RollcallError::archive("bad zip").error_type(), "Archive Error");
        assert_eq!(RollcallError::export("csv").code(), "E013");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing backup");
        let err: RollcallError = io.into();
        assert_eq!(err.code(), "E005");
        assert!(err.message().contains("missing backup"));
    }

    #[test]
    fn test_error_message() {
        let err = RollcallError::validation("Invalid input");
        assert_eq!(err.message(), "Invalid input");
    }

    #[test]
    fn test_format_simple() {
        let err = RollcallError::validation("Invalid window");
        let formatted = err.format_simple();
        assert!(formatted.contains("Validation Error"));
        assert!(formatted.contains("Invalid window"));
    }
}
