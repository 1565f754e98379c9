//! 批量录入一个课次的考勤

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashSet;
use tracing::info;

use super::overrides::resolve_session_date;
use super::{AttendanceService, load_managed_lesson, unauthorized};
use crate::config::AppConfig;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    attendance::{
        entities::{AttendanceSource, AttendanceUpsert},
        requests::{BulkAttendanceEntry, BulkAttendanceRequest},
        responses::{BulkAttendanceResponse, BulkRejection},
    },
};
use crate::services::error_response;

/// 按班级名单拆分提交的条目：重复或不在名单中的学生被拒绝
fn partition_entries(
    entries: Vec<BulkAttendanceEntry>,
    roster: &HashSet<i64>,
) -> (Vec<BulkAttendanceEntry>, Vec<BulkRejection>) {
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for entry in entries {
        if !seen.insert(entry.student_id) {
            rejected.push(BulkRejection {
                student_id: entry.student_id,
                reason: "Duplicate entry for student".to_string(),
            });
        } else if !roster.contains(&entry.student_id) {
            rejected.push(BulkRejection {
                student_id: entry.student_id,
                reason: "Student is not in this lesson's class".to_string(),
            });
        } else {
            accepted.push(entry);
        }
    }

    (accepted, rejected)
}

pub async fn bulk_attendance(
    service: &AttendanceService,
    lesson_id: i64,
    req: BulkAttendanceRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    if req.entries.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "entries must not be empty",
        )));
    }

    let max_rows = AppConfig::get().server.limits.max_import_rows;
    if req.entries.len() > max_rows {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ImportTooManyRows,
            format!("At most {max_rows} entries per request"),
        )));
    }

    let storage = service.get_storage(request)?;

    let lesson = match load_managed_lesson(&storage, lesson_id, &user).await {
        Ok(lesson) => lesson,
        Err(response) => return Ok(response),
    };

    let session_date = match resolve_session_date(&lesson, req.session_date).await {
        Ok(date) => date,
        Err(response) => return Ok(response),
    };

    let roster: HashSet<i64> = match storage.list_class_students(lesson.class_id).await {
        Ok(students) => students.into_iter().map(|s| s.id).collect(),
        Err(e) => return Ok(error_response(&e, "获取班级名单失败")),
    };

    let (accepted, rejected) = partition_entries(req.entries, &roster);

    let records: Vec<AttendanceUpsert> = accepted
        .into_iter()
        .map(|entry| AttendanceUpsert {
            lesson_id,
            student_id: entry.student_id,
            session_date,
            status: entry.status,
            source: AttendanceSource::Bulk,
            marked_by: user.id,
            note: entry.note,
        })
        .collect();

    let summary = if records.is_empty() {
        Default::default()
    } else {
        match storage.bulk_upsert_attendance(records).await {
            Ok(summary) => summary,
            Err(e) => return Ok(error_response(&e, "批量录入考勤失败")),
        }
    };

    info!(
        "User {} bulk-recorded lesson {} on {}: {} created, {} updated, {} rejected",
        user.id,
        lesson_id,
        session_date,
        summary.created,
        summary.updated,
        rejected.len()
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        BulkAttendanceResponse {
            session_date,
            created: summary.created,
            updated: summary.updated,
            rejected,
        },
        "批量录入完成",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::entities::AttendanceStatus;

    fn entry(student_id: i64, status: AttendanceStatus) -> BulkAttendanceEntry {
        BulkAttendanceEntry {
            student_id,
            status,
            note: None,
        }
    }

    #[test]
    fn test_partition_rejects_foreign_and_duplicate_students() {
        let roster: HashSet<i64> = [1, 2, 3].into_iter().collect();
        let (accepted, rejected) = partition_entries(
            vec![
                entry(1, AttendanceStatus::Present),
                entry(2, AttendanceStatus::Absent),
                entry(9, AttendanceStatus::Present),
                entry(1, AttendanceStatus::Late),
            ],
            &roster,
        );

        let accepted_ids: Vec<_> = accepted.iter().map(|e| e.student_id).collect();
        assert_eq!(accepted_ids, vec![1, 2]);
        assert_eq!(accepted[0].status, AttendanceStatus::Present);

        let rejected_ids: Vec<_> = rejected.iter().map(|r| r.student_id).collect();
        assert_eq!(rejected_ids, vec![9, 1]);
        assert!(rejected[0].reason.contains("not in this lesson's class"));
        assert!(rejected[1].reason.contains("Duplicate"));
    }

    #[test]
    fn test_partition_empty_roster_rejects_everything() {
        let (accepted, rejected) =
            partition_entries(vec![entry(4, AttendanceStatus::Excused)], &HashSet::new());
        assert!(accepted.is_empty());
        assert_eq!(rejected.len(), 1);
    }
}
