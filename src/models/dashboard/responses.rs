use crate::models::attendance::entities::{AttendanceRecord, Eligibility};
use crate::models::lessons::entities::Lesson;
use chrono::NaiveDate;
use serde::Serialize;
use ts_rs::TS;

// 各状态的考勤次数
#[derive(Debug, Default, Clone, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct AttendanceTotals {
    pub present: i64,
    pub late: i64,
    pub absent: i64,
    pub excused: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct StudentLessonToday {
    pub lesson: Lesson,
    pub eligibility: Eligibility,
    /// 本次课的考勤记录
    pub record: Option<AttendanceRecord>,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct StudentDashboardResponse {
    pub date: NaiveDate,
    pub lessons: Vec<StudentLessonToday>,
    pub totals: AttendanceTotals,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct TeacherLessonToday {
    pub lesson: Lesson,
    /// 签到窗口状态（不区分具体学生）
    pub eligibility: Eligibility,
    pub session_date: NaiveDate,
    pub class_size: i64,
    pub marked_count: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct TeacherDashboardResponse {
    pub date: NaiveDate,
    pub lessons: Vec<TeacherLessonToday>,
}

#[derive(Debug, Default, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/dashboard.ts")]
pub struct AdminDashboardResponse {
    pub departments: i64,
    pub levels: i64,
    pub classes: i64,
    pub teachers: i64,
    pub students: i64,
    pub lessons: i64,
    pub records_today: i64,
}
