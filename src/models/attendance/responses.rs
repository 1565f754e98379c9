use super::entities::{AttendanceRecord, Eligibility};
use crate::models::common::PaginationInfo;
use crate::models::users::entities::User;
use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceListResponse {
    pub items: Vec<AttendanceRecord>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct EligibilityResponse {
    pub lesson_id: i64,
    pub eligibility: Eligibility,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct RosterEntry {
    pub student: User,
    pub record: Option<AttendanceRecord>,
}

// 某课次的班级点名表
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct LessonRosterResponse {
    pub lesson_id: i64,
    pub session_date: NaiveDate,
    pub entries: Vec<RosterEntry>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct BulkRejection {
    pub student_id: i64,
    pub reason: String,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct BulkAttendanceResponse {
    pub session_date: NaiveDate,
    pub created: usize,
    pub updated: usize,
    pub rejected: Vec<BulkRejection>,
}
