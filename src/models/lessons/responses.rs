use super::entities::Lesson;
use crate::models::attendance::entities::Eligibility;
use crate::models::common::PaginationInfo;
use serde::Serialize;
use ts_rs::TS;

// 课程列表项，学生查看时附带当前签到状态
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct LessonListItem {
    #[serde(flatten)]
    #[ts(flatten)]
    pub lesson: Lesson,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub eligibility: Option<Eligibility>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/lesson.ts")]
pub struct LessonListResponse {
    pub items: Vec<LessonListItem>,
    pub pagination: PaginationInfo,
}
