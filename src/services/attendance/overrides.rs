//! 教师修改单个学生的考勤（不受签到窗口限制）

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::NaiveDate;
use tracing::info;

use super::{
    AttendanceService, latest_session_date, load_managed_lesson, occurs_on, schedule_of,
    school_now, unauthorized,
};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    attendance::{
        entities::{AttendanceSource, AttendanceUpsert},
        requests::OverrideAttendanceRequest,
    },
    lessons::entities::Lesson,
    users::entities::UserRole,
};
use crate::services::error_response;

/// 解析教师操作的课次日期：未指定时取最近一次已开始的课次，指定时必须是该课程的上课日
pub(crate) async fn resolve_session_date(
    lesson: &Lesson,
    requested: Option<NaiveDate>,
) -> Result<NaiveDate, HttpResponse> {
    let schedule = schedule_of(lesson).map_err(|e| error_response(&e, "课程时间无效"))?;
    let now = school_now().await;

    match requested {
        None => Ok(latest_session_date(&schedule, now)),
        Some(date) if occurs_on(&schedule, date, *now.offset()) => Ok(date),
        Some(date) => Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::AttendanceDateInvalid,
            format!("Lesson {} has no session on {date}", lesson.id),
        ))),
    }
}

pub async fn override_attendance(
    service: &AttendanceService,
    lesson_id: i64,
    student_id: i64,
    req: OverrideAttendanceRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let lesson = match load_managed_lesson(&storage, lesson_id, &user).await {
        Ok(lesson) => lesson,
        Err(response) => return Ok(response),
    };

    let student = match storage.get_user_by_id(student_id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::UserNotFound,
                "Student not found",
            )));
        }
        Err(e) => return Ok(error_response(&e, "获取学生失败")),
    };

    if student.role != UserRole::Student {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::UserNotStudent,
            "User is not a student",
        )));
    }

    if student.class_id != Some(lesson.class_id) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::AttendanceNotEnrolled,
            "Student does not belong to this lesson's class",
        )));
    }

    let session_date = match resolve_session_date(&lesson, req.session_date).await {
        Ok(date) => date,
        Err(response) => return Ok(response),
    };

    let record = AttendanceUpsert {
        lesson_id,
        student_id,
        session_date,
        status: req.status,
        source: AttendanceSource::Teacher,
        marked_by: user.id,
        note: req.note,
    };

    match storage.upsert_attendance_record(record).await {
        Ok((record, created)) => {
            info!(
                "User {} set attendance of student {} for lesson {} on {} to {}",
                user.id, student_id, lesson_id, session_date, record.status
            );
            let response = if created {
                HttpResponse::Created()
            } else {
                HttpResponse::Ok()
            }
            .json(ApiResponse::success(record, "考勤已更新"));
            Ok(response)
        }
        Err(e) => Ok(error_response(&e, "更新考勤失败")),
    }
}
