//! SQL 相关的小工具

use sea_orm::sea_query::LikeExpr;

/// 转义 LIKE 模式中的通配符，配合 `ESCAPE '\'` 使用
pub fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 构造 `%keyword%` 形式的模糊匹配表达式
pub fn contains_like(keyword: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like_pattern(keyword))).escape('\\')
}

/// 是否为唯一约束冲突（SQLite / PostgreSQL / MySQL）
pub fn is_unique_violation(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("unique constraint")
        || lower.contains("duplicate key")
        || lower.contains("duplicate entry")
}

/// 是否为外键约束失败（SQLite / PostgreSQL / MySQL）
pub fn is_foreign_key_violation(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("foreign key constraint") || lower.contains("violates foreign key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("abc"), "abc");
        assert_eq!(escape_like_pattern("50%"), "50\\%");
        assert_eq!(escape_like_pattern("a_b"), "a\\_b");
        assert_eq!(escape_like_pattern("c:\\"), "c:\\\\");
    }

    #[test]
    fn test_unique_violation_messages() {
        assert!(is_unique_violation(
            "UNIQUE constraint failed: departments.name"
        ));
        assert!(is_unique_violation(
            "duplicate key value violates unique constraint \"uq_attendance\""
        ));
        assert!(is_unique_violation("Duplicate entry 'CS' for key 'code'"));
        assert!(!is_unique_violation("no such table: users"));
    }

    #[test]
    fn test_foreign_key_violation_messages() {
        assert!(is_foreign_key_violation("FOREIGN KEY constraint failed"));
        assert!(is_foreign_key_violation(
            "update or delete on table \"levels\" violates foreign key constraint"
        ));
        assert!(!is_foreign_key_violation("UNIQUE constraint failed"));
    }
}
