use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 课程类型
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub enum LessonKind {
    Scheduled, // 每周固定
    Instant,   // 临时课程
}

crate::impl_string_enum!(LessonKind, "课程类型", {
    Scheduled => "scheduled",
    Instant => "instant",
});

// 课程
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct Lesson {
    pub id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub room: Option<String>,
    pub kind: LessonKind,
    /// ISO 星期：1 = 周一 ... 7 = 周日（仅 scheduled）
    pub day_of_week: Option<i32>,
    /// 学校本地时间的上课时刻（仅 scheduled）
    pub start_time: Option<NaiveTime>,
    /// 开始时刻（仅 instant）
    pub starts_at: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    /// 单独设置的签到窗口，未设置时使用系统默认值
    pub attendance_window_minutes: Option<i32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 写入存储层的课程数据（已完成校验）
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub class_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub room: Option<String>,
    pub kind: LessonKind,
    pub day_of_week: Option<i32>,
    pub start_minute: Option<i32>,
    pub starts_at: Option<i64>,
    pub duration_minutes: i32,
    pub attendance_window_minutes: Option<i32>,
}

/// 课程更新数据（已完成校验）
///
/// `attendance_window_minutes` 为 `Some(None)` 时清除单独设置。
#[derive(Debug, Clone, Default)]
pub struct LessonChanges {
    pub subject: Option<String>,
    pub room: Option<String>,
    pub day_of_week: Option<i32>,
    pub start_minute: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub attendance_window_minutes: Option<Option<i32>>,
    pub active: Option<bool>,
}
