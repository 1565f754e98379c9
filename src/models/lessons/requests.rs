use super::entities::LessonKind;
use crate::models::common::PaginationQuery;
use serde::{Deserialize, Deserializer};
use ts_rs::TS;

// 创建每周固定课程
//
// 教师创建时 teacher_id 可省略（默认为自己），管理员必须指定。
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct CreateLessonRequest {
    pub class_id: i64,
    pub teacher_id: Option<i64>,
    pub subject: String,
    pub room: Option<String>,
    pub day_of_week: i32,
    /// "HH:MM"
    pub start_time: String,
    pub duration_minutes: i32,
    pub attendance_window_minutes: Option<i32>,
}

// 创建临时课程，开始时间为当前时刻
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct CreateInstantLessonRequest {
    pub class_id: i64,
    pub teacher_id: Option<i64>,
    pub subject: String,
    pub room: Option<String>,
    pub duration_minutes: i32,
    pub attendance_window_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct UpdateLessonRequest {
    pub subject: Option<String>,
    pub room: Option<String>,
    pub day_of_week: Option<i32>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<i32>,
    /// 传 null 清除单独设置
    #[serde(default, deserialize_with = "deserialize_some")]
    #[ts(type = "number | null")]
    pub attendance_window_minutes: Option<Option<i32>>,
    pub active: Option<bool>,
}

// 区分“字段缺失”和“显式 null”
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct LessonListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub class_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub day_of_week: Option<i32>,
    pub kind: Option<LessonKind>,
    pub active: Option<bool>,
}

// 课程列表查询参数（用于存储层）
#[derive(Debug, Clone, Default)]
pub struct LessonListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub class_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub day_of_week: Option<i32>,
    pub kind: Option<LessonKind>,
    pub active: Option<bool>,
}

impl From<LessonListParams> for LessonListQuery {
    fn from(params: LessonListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            class_id: params.class_id,
            teacher_id: params.teacher_id,
            day_of_week: params.day_of_week,
            kind: params.kind,
            active: params.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_window_missing_vs_null() {
        let missing: UpdateLessonRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.attendance_window_minutes, None);

        let cleared: UpdateLessonRequest =
            serde_json::from_str(r#"{"attendance_window_minutes": null}"#).unwrap();
        assert_eq!(cleared.attendance_window_minutes, Some(None));

        let set: UpdateLessonRequest =
            serde_json::from_str(r#"{"attendance_window_minutes": 20}"#).unwrap();
        assert_eq!(set.attendance_window_minutes, Some(Some(20)));
    }
}
