use super::entities::AttendanceStatus;
use crate::models::common::PaginationQuery;
use chrono::NaiveDate;
use serde::Deserialize;
use ts_rs::TS;

// 学生自助签到
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct MarkAttendanceRequest {
    pub lesson_id: i64,
}

// 教师修改单个学生的考勤，不受签到窗口限制
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct OverrideAttendanceRequest {
    /// 默认为最近一次已开始的课次
    pub session_date: Option<NaiveDate>,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct BulkAttendanceEntry {
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub note: Option<String>,
}

// 批量录入一个课次的考勤
#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct BulkAttendanceRequest {
    pub session_date: Option<NaiveDate>,
    pub entries: Vec<BulkAttendanceEntry>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct SessionQuery {
    pub session_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceListParams {
    #[serde(flatten)]
    #[ts(flatten)]
    pub pagination: PaginationQuery,
    pub class_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub student_id: Option<i64>,
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// 考勤记录查询参数（用于存储层）
//
// `teacher_id` 限定为该教师的课程，由服务层根据角色填入。
#[derive(Debug, Clone, Default)]
pub struct AttendanceListQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
    pub class_id: Option<i64>,
    pub lesson_id: Option<i64>,
    pub student_id: Option<i64>,
    pub teacher_id: Option<i64>,
    pub status: Option<AttendanceStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl From<AttendanceListParams> for AttendanceListQuery {
    fn from(params: AttendanceListParams) -> Self {
        Self {
            page: Some(params.pagination.page),
            size: Some(params.pagination.size),
            class_id: params.class_id,
            lesson_id: params.lesson_id,
            student_id: params.student_id,
            teacher_id: None,
            status: params.status,
            from: params.from,
            to: params.to,
        }
    }
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceExportParams {
    pub class_id: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// csv 或 xlsx，默认 csv
    pub format: Option<String>,
}
