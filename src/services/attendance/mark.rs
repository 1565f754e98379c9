//! 学生自助签到

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{info, warn};

use super::{AttendanceService, school_now, student_eligibility, unauthorized};
use crate::errors::RollcallError;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    attendance::{
        entities::{AttendanceSource, AttendanceUpsert, DisabledReason, Eligibility},
        requests::MarkAttendanceRequest,
        responses::EligibilityResponse,
    },
    lessons::entities::Lesson,
    users::entities::User,
};
use crate::services::error_response;
use crate::storage::Storage;
use std::sync::Arc;

/// 读取课程并确认学生属于该课程的班级
async fn load_enrolled_lesson(
    storage: &Arc<dyn Storage>,
    lesson_id: i64,
    student: &User,
) -> Result<Lesson, HttpResponse> {
    let lesson = match storage.get_lesson_by_id(lesson_id).await {
        Ok(Some(lesson)) => lesson,
        Ok(None) => {
            return Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::LessonNotFound,
                "Lesson not found",
            )));
        }
        Err(e) => return Err(error_response(&e, "获取课程失败")),
    };

    if student.class_id != Some(lesson.class_id) {
        return Err(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::AttendanceNotEnrolled,
            "You are not enrolled in this lesson's class",
        )));
    }

    Ok(lesson)
}

pub async fn mark_attendance(
    service: &AttendanceService,
    req: MarkAttendanceRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(student) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let lesson = match load_enrolled_lesson(&storage, req.lesson_id, &student).await {
        Ok(lesson) => lesson,
        Err(response) => return Ok(response),
    };

    let now = school_now().await;
    let eligibility = match student_eligibility(&storage, &lesson, student.id, now).await {
        Ok(eligibility) => eligibility,
        Err(e) => return Ok(error_response(&e, "判定签到窗口失败")),
    };

    let (session_date, status) = match eligibility {
        Eligibility::Open {
            session_date,
            status,
            ..
        } => (session_date, status),
        Eligibility::AlreadyMarked { .. } => {
            return Ok(already_marked());
        }
        Eligibility::NotYetOpen { opens_at } => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::AttendanceNotYetOpen,
                format!("Attendance opens at {}", opens_at.to_rfc3339()),
            )));
        }
        Eligibility::Closed { closed_at } => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::AttendanceClosed,
                format!("Attendance closed at {}", closed_at.to_rfc3339()),
            )));
        }
        Eligibility::NotToday => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::AttendanceNotToday,
                "This lesson does not take place today",
            )));
        }
        Eligibility::Disabled {
            reason: DisabledReason::LessonInactive,
        } => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::LessonInactive,
                "Lesson is not active",
            )));
        }
        Eligibility::Disabled {
            reason: DisabledReason::SelfMarkDisabled,
        } => {
            return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::AttendanceSelfMarkDisabled,
                "Self check-in is disabled",
            )));
        }
    };

    let record = AttendanceUpsert {
        lesson_id: lesson.id,
        student_id: student.id,
        session_date,
        status,
        source: AttendanceSource::SelfMark,
        marked_by: student.id,
        note: None,
    };

    match storage.create_attendance_record(record).await {
        Ok(record) => {
            info!(
                "Student {} marked {} for lesson {} on {}",
                student.id, record.status, lesson.id, session_date
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(record, "签到成功")))
        }
        // 并发签到时唯一索引兜底
        Err(RollcallError::Conflict(_)) => {
            warn!(
                "Concurrent self-mark rejected for student {} lesson {}",
                student.id, lesson.id
            );
            Ok(already_marked())
        }
        Err(e) => Ok(error_response(&e, "签到失败")),
    }
}

fn already_marked() -> HttpResponse {
    HttpResponse::Conflict().json(ApiResponse::error_empty(
        ErrorCode::AttendanceAlreadyMarked,
        "Attendance already marked for this session",
    ))
}

pub async fn get_eligibility(
    service: &AttendanceService,
    lesson_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(student) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let lesson = match load_enrolled_lesson(&storage, lesson_id, &student).await {
        Ok(lesson) => lesson,
        Err(response) => return Ok(response),
    };

    match student_eligibility(&storage, &lesson, student.id, school_now().await).await {
        Ok(eligibility) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            EligibilityResponse {
                lesson_id,
                eligibility,
            },
            "Eligibility retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "判定签到窗口失败")),
    }
}
