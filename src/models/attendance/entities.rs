use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 考勤状态
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub enum AttendanceStatus {
    Present, // 出勤
    Late,    // 迟到
    Absent,  // 缺勤
    Excused, // 请假
}

crate::impl_string_enum!(AttendanceStatus, "考勤状态", {
    Present => "present",
    Late => "late",
    Absent => "absent",
    Excused => "excused",
});

// 考勤记录来源
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub enum AttendanceSource {
    #[serde(rename = "self")]
    SelfMark, // 学生自助签到
    Teacher,  // 教师单独修改
    Bulk,     // 教师批量录入
}

crate::impl_string_enum!(AttendanceSource, "考勤来源", {
    SelfMark => "self",
    Teacher => "teacher",
    Bulk => "bulk",
});

// 考勤记录
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub struct AttendanceRecord {
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: i64,
    /// 课程发生的学校本地日期
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    pub source: AttendanceSource,
    pub marked_by: i64,
    pub note: Option<String>,
    pub marked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 自助签到不可用的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub enum DisabledReason {
    LessonInactive,   // 课程已停用
    SelfMarkDisabled, // 系统关闭了自助签到
}

/// 签到窗口判定结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export, export_to = "../frontend/src/types/generated/attendance.ts")]
pub enum Eligibility {
    /// 窗口开放，可签到
    Open {
        session_date: NaiveDate,
        opens_at: DateTime<Utc>,
        closes_at: DateTime<Utc>,
        /// 此刻签到将得到的状态
        status: AttendanceStatus,
    },
    /// 窗口开放，但本次课已有记录
    AlreadyMarked {
        session_date: NaiveDate,
        closes_at: DateTime<Utc>,
    },
    /// 今天有课但尚未开始
    NotYetOpen { opens_at: DateTime<Utc> },
    /// 今天（或临时课程）的窗口已关闭
    Closed { closed_at: DateTime<Utc> },
    /// 今天没有这门课
    NotToday,
    /// 与时间无关，当前不允许自助签到
    Disabled { reason: DisabledReason },
}

impl Eligibility {
    pub fn is_open(&self) -> bool {
        matches!(self, Eligibility::Open { .. })
    }

    /// 窗口对应的课次日期（仅开放状态）
    pub fn open_session(&self) -> Option<NaiveDate> {
        match self {
            Eligibility::Open { session_date, .. }
            | Eligibility::AlreadyMarked { session_date, .. } => Some(*session_date),
            _ => None,
        }
    }
}

/// 写入一条考勤记录（不存在则创建，存在则覆盖状态）
#[derive(Debug, Clone)]
pub struct AttendanceUpsert {
    pub lesson_id: i64,
    pub student_id: i64,
    pub session_date: NaiveDate,
    pub status: AttendanceStatus,
    pub source: AttendanceSource,
    pub marked_by: i64,
    pub note: Option<String>,
}

/// 导出用的考勤行（已关联课程与学生信息）
#[derive(Debug, Clone)]
pub struct AttendanceExportRow {
    pub session_date: NaiveDate,
    pub lesson_id: i64,
    pub subject: String,
    pub student_id: i64,
    pub student_number: Option<String>,
    pub student_name: String,
    pub status: AttendanceStatus,
    pub source: AttendanceSource,
    pub note: Option<String>,
    pub marked_at: DateTime<Utc>,
}

/// 批量写入的结果
#[derive(Debug, Clone, Default)]
pub struct UpsertSummary {
    pub created: usize,
    pub updated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_self_serializes_as_self() {
        let json = serde_json::to_string(&AttendanceSource::SelfMark).unwrap();
        assert_eq!(json, r#""self""#);
        assert_eq!(
            serde_json::from_str::<AttendanceSource>(r#""self""#).unwrap(),
            AttendanceSource::SelfMark
        );
    }

    #[test]
    fn test_eligibility_is_tagged_by_state() {
        let value = serde_json::to_value(Eligibility::NotToday).unwrap();
        assert_eq!(value, serde_json::json!({ "state": "not_today" }));

        let value = serde_json::to_value(Eligibility::Disabled {
            reason: DisabledReason::SelfMarkDisabled,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "state": "disabled", "reason": "self_mark_disabled" })
        );
    }

    #[test]
    fn test_status_rejects_unknown() {
        let err = "sick".parse::<AttendanceStatus>().unwrap_err();
        assert!(err.contains("present, late, absent, excused"));
    }
}
