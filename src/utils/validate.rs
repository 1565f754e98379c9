use chrono::{NaiveDate, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid username regex"));

static STUDENT_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{1,32}$").expect("Invalid student number regex"));

static SETTING_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)+$").expect("Invalid setting key regex")
});

static BACKUP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^backup-\d{8}-\d{6}-[0-9a-f]{8}\.zip$").expect("Invalid backup name regex")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}$").expect("Invalid email regex")
});

/// 用户名：5..=16 位字母、数字、下划线或连字符
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if !(5..=16).contains(&username.len()) {
        return Err("Username length must be between 5 and 16 characters");
    }
    if !USERNAME_RE.is_match(username) {
        return Err("Username must contain only letters, numbers, underscores or hyphens");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

const WEAK_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "admin123",
    "abcd1234",
    "welcome1",
    "school123",
];

/// 密码规则：不满足时对应的提示
const PASSWORD_RULES: &[(fn(&str) -> bool, &str)] = &[
    (|p| p.chars().count() >= 8, "at least 8 characters"),
    (|p| p.chars().any(|c| c.is_ascii_uppercase()), "an uppercase letter"),
    (|p| p.chars().any(|c| c.is_ascii_lowercase()), "a lowercase letter"),
    (|p| p.chars().any(|c| c.is_ascii_digit()), "a digit"),
];

/// 密码策略校验，失败时一次性列出所有缺失项
pub fn validate_password(password: &str) -> Result<(), String> {
    if WEAK_PASSWORDS
        .iter()
        .any(|weak| password.eq_ignore_ascii_case(weak))
    {
        return Err("Password is too common, please choose a stronger password".to_string());
    }

    let missing: Vec<&str> = PASSWORD_RULES
        .iter()
        .filter(|(check, _)| !check(password))
        .map(|(_, hint)| *hint)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Password must contain {}", missing.join(", ")))
    }
}

/// 学号：字母、数字或连字符，最多 32 位
pub fn validate_student_number(number: &str) -> Result<(), &'static str> {
    if !STUDENT_NUMBER_RE.is_match(number) {
        return Err("Student number must be 1-32 letters, digits or hyphens");
    }
    Ok(())
}

/// 名称类字段（院系、年级、班级、科目）：去除首尾空白后 1..=100 个字符
pub fn validate_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name must not be empty");
    }
    if trimmed.chars().count() > 100 {
        return Err("Name must be at most 100 characters");
    }
    Ok(trimmed.to_string())
}

/// 解析上课时间 "HH:MM" 或 "HH:MM:SS"，返回当天的分钟数
pub fn parse_time_of_day(value: &str) -> Result<i32, &'static str> {
    let value = value.trim();
    let time = NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| "Start time must be in HH:MM format")?;
    Ok((time.hour() * 60 + time.minute()) as i32)
}

/// ISO 星期：1 = 周一 ... 7 = 周日
pub fn validate_day_of_week(day: i32) -> Result<(), &'static str> {
    if !(1..=7).contains(&day) {
        return Err("Day of week must be between 1 (Monday) and 7 (Sunday)");
    }
    Ok(())
}

/// 课程时长 1..=720 分钟
pub fn validate_duration(minutes: i32) -> Result<(), &'static str> {
    if !(1..=720).contains(&minutes) {
        return Err("Duration must be between 1 and 720 minutes");
    }
    Ok(())
}

/// 签到窗口 1..=1440 分钟
pub fn validate_window(minutes: i32) -> Result<(), &'static str> {
    if !(1..=1440).contains(&minutes) {
        return Err("Attendance window must be between 1 and 1440 minutes");
    }
    Ok(())
}

/// 日期区间：起始不晚于结束，且跨度不超过一年
pub fn validate_date_range(from: NaiveDate, to: NaiveDate) -> Result<(), &'static str> {
    if from > to {
        return Err("Start date must not be after end date");
    }
    if (to - from).num_days() > 366 {
        return Err("Date range must not exceed one year");
    }
    Ok(())
}

/// 导出格式：csv（默认）或 xlsx，返回是否为 xlsx
pub fn is_xlsx_format(format: Option<&str>) -> Result<bool, String> {
    match format {
        None | Some("csv") => Ok(false),
        Some("xlsx") => Ok(true),
        Some(other) => Err(format!("Unsupported export format: {other}")),
    }
}

pub fn validate_setting_key(key: &str) -> Result<(), &'static str> {
    if key.len() > 64 || !SETTING_KEY_RE.is_match(key) {
        return Err("Invalid setting key");
    }
    Ok(())
}

/// 备份文件名必须是系统生成的格式，不能包含路径
pub fn validate_backup_name(name: &str) -> Result<(), &'static str> {
    if !BACKUP_NAME_RE.is_match(name) {
        return Err("Invalid backup name");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format() {
        assert_eq!(is_xlsx_format(None), Ok(false));
        assert_eq!(is_xlsx_format(Some("csv")), Ok(false));
        assert_eq!(is_xlsx_format(Some("xlsx")), Ok(true));
        assert!(is_xlsx_format(Some("pdf")).unwrap_err().contains("pdf"));
        assert!(is_xlsx_format(Some("XLSX")).is_err());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("stu_2024-01").is_ok());
        assert!(validate_username("bob").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("averyveryverylongname").is_err());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("teacher@school.edu").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_student_number() {
        assert!(validate_student_number("2024-0001").is_ok());
        assert!(validate_student_number("").is_err());
        assert!(validate_student_number("12 34").is_err());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Physics  ").unwrap(), "Physics");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("08:30"), Ok(510));
        assert_eq!(parse_time_of_day("00:00"), Ok(0));
        assert_eq!(parse_time_of_day("23:59:00"), Ok(1439));
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("8").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn test_schedule_ranges() {
        assert!(validate_day_of_week(1).is_ok());
        assert!(validate_day_of_week(7).is_ok());
        assert!(validate_day_of_week(0).is_err());
        assert!(validate_day_of_week(8).is_err());

        assert!(validate_duration(1).is_ok());
        assert!(validate_duration(720).is_ok());
        assert!(validate_duration(0).is_err());
        assert!(validate_duration(721).is_err());

        assert!(validate_window(1).is_ok());
        assert!(validate_window(1440).is_ok());
        assert!(validate_window(0).is_err());
        assert!(validate_window(1441).is_err());
    }

    #[test]
    fn test_date_range() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        assert!(validate_date_range(d("2025-09-01"), d("2025-09-01")).is_ok());
        assert!(validate_date_range(d("2025-09-02"), d("2025-09-01")).is_err());
        assert!(validate_date_range(d("2024-01-01"), d("2025-06-01")).is_err());
    }

    #[test]
    fn test_setting_key() {
        assert!(validate_setting_key("attendance.window_minutes").is_ok());
        assert!(validate_setting_key("app.system_name").is_ok());
        assert!(validate_setting_key("nodot").is_err());
        assert!(validate_setting_key("../etc").is_err());
        assert!(validate_setting_key("Upper.Case").is_err());
    }

    #[test]
    fn test_backup_name() {
        assert!(validate_backup_name("backup-20250901-083000-1a2b3c4d.zip").is_ok());
        assert!(validate_backup_name("backup-20250901-083000-1a2b3c4d.zip/..").is_err());
        assert!(validate_backup_name("../backup-20250901-083000-1a2b3c4d.zip").is_err());
        assert!(validate_backup_name("backup.zip").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("SecureP@ss1").is_ok());
        assert!(validate_password("Rollcall2025").is_ok());

        let err = validate_password("Ab1").unwrap_err();
        assert_eq!(err, "Password must contain at least 8 characters");

        let err = validate_password("abcdefgh").unwrap_err();
        assert!(err.contains("an uppercase letter") && err.contains("a digit"));
        assert!(!err.contains("lowercase"));

        assert!(validate_password("ABCDE123").unwrap_err().contains("a lowercase letter"));
    }

    #[test]
    fn test_common_password_rejected() {
        let err = validate_password("Password1").unwrap_err();
        assert!(err.contains("too common"));
        assert!(validate_password("ABCD1234").is_err());
    }
}
