use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;
use tracing::info;

use super::LessonService;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    lessons::{
        entities::{LessonKind, NewLesson},
        requests::{CreateInstantLessonRequest, CreateLessonRequest},
    },
    users::entities::{User, UserRole},
};
use crate::services::attendance::unauthorized;
use crate::services::error_response;
use crate::storage::Storage;
use crate::utils::validate::{
    parse_time_of_day, validate_day_of_week, validate_duration, validate_name, validate_window,
};

fn invalid_schedule(msg: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiResponse::error_empty(
        ErrorCode::LessonScheduleInvalid,
        msg,
    ))
}

/// 校验与周期无关的公共字段，返回规范化后的科目名
fn validate_common(
    subject: &str,
    duration_minutes: i32,
    window: Option<i32>,
) -> Result<String, HttpResponse> {
    let subject = validate_name(subject).map_err(invalid_schedule)?;
    validate_duration(duration_minutes).map_err(invalid_schedule)?;
    if let Some(window) = window {
        validate_window(window).map_err(invalid_schedule)?;
    }
    Ok(subject)
}

/// 确定任课教师：教师只能给自己建课，管理员必须指定一名教师
async fn resolve_teacher(
    storage: &Arc<dyn Storage>,
    user: &User,
    requested: Option<i64>,
) -> Result<i64, HttpResponse> {
    if user.role == UserRole::Teacher {
        return match requested {
            None => Ok(user.id),
            Some(id) if id == user.id => Ok(id),
            Some(_) => Err(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                ErrorCode::LessonPermissionDenied,
                "Teachers can only create lessons for themselves",
            ))),
        };
    }

    let Some(teacher_id) = requested else {
        return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "teacher_id is required",
        )));
    };

    match storage.get_user_by_id(teacher_id).await {
        Ok(Some(teacher)) if teacher.role == UserRole::Teacher => Ok(teacher.id),
        Ok(Some(_)) => Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::UserNotTeacher,
            "Assigned user is not a teacher",
        ))),
        Ok(None) => Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::UserNotFound,
            "Teacher not found",
        ))),
        Err(e) => Err(error_response(&e, "获取教师失败")),
    }
}

async fn ensure_class_exists(
    storage: &Arc<dyn Storage>,
    class_id: i64,
) -> Result<(), HttpResponse> {
    match storage.get_class_by_id(class_id).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::ClassNotFound,
            "Class not found",
        ))),
        Err(e) => Err(error_response(&e, "获取班级失败")),
    }
}

async fn insert_lesson(
    storage: &Arc<dyn Storage>,
    lesson: NewLesson,
    user: &User,
) -> ActixResult<HttpResponse> {
    match storage.create_lesson(lesson).await {
        Ok(lesson) => {
            info!(
                "User {} created {} lesson {} ({}) for class {}",
                user.id, lesson.kind, lesson.id, lesson.subject, lesson.class_id
            );
            Ok(HttpResponse::Created().json(ApiResponse::success(lesson, "课程创建成功")))
        }
        Err(e) => Ok(error_response(&e, "创建课程失败")),
    }
}

pub async fn create_lesson(
    service: &LessonService,
    req: CreateLessonRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let subject = match validate_common(
        &req.subject,
        req.duration_minutes,
        req.attendance_window_minutes,
    ) {
        Ok(subject) => subject,
        Err(response) => return Ok(response),
    };

    if let Err(msg) = validate_day_of_week(req.day_of_week) {
        return Ok(invalid_schedule(msg));
    }

    let start_minute = match parse_time_of_day(&req.start_time) {
        Ok(minute) => minute,
        Err(msg) => return Ok(invalid_schedule(msg)),
    };

    let storage = service.get_storage(request)?;

    let teacher_id = match resolve_teacher(&storage, &user, req.teacher_id).await {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    if let Err(response) = ensure_class_exists(&storage, req.class_id).await {
        return Ok(response);
    }

    let lesson = NewLesson {
        class_id: req.class_id,
        teacher_id,
        subject,
        room: req.room,
        kind: LessonKind::Scheduled,
        day_of_week: Some(req.day_of_week),
        start_minute: Some(start_minute),
        starts_at: None,
        duration_minutes: req.duration_minutes,
        attendance_window_minutes: req.attendance_window_minutes,
    };

    insert_lesson(&storage, lesson, &user).await
}

pub async fn create_instant_lesson(
    service: &LessonService,
    req: CreateInstantLessonRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let subject = match validate_common(
        &req.subject,
        req.duration_minutes,
        req.attendance_window_minutes,
    ) {
        Ok(subject) => subject,
        Err(response) => return Ok(response),
    };

    let storage = service.get_storage(request)?;

    let teacher_id = match resolve_teacher(&storage, &user, req.teacher_id).await {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };

    if let Err(response) = ensure_class_exists(&storage, req.class_id).await {
        return Ok(response);
    }

    let lesson = NewLesson {
        class_id: req.class_id,
        teacher_id,
        subject,
        room: req.room,
        kind: LessonKind::Instant,
        day_of_week: None,
        start_minute: None,
        starts_at: Some(chrono::Utc::now().timestamp()),
        duration_minutes: req.duration_minutes,
        attendance_window_minutes: req.attendance_window_minutes,
    };

    insert_lesson(&storage, lesson, &user).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_validate_common_trims_subject() {
        assert_eq!(validate_common("  英语 ", 45, None).ok(), Some("英语".to_string()));
    }

    #[test]
    fn test_validate_common_rejects_ranges() {
        let cases = [("", 45, None), ("数学", 0, None), ("数学", 721, None), ("数学", 45, Some(0))];
        for (subject, duration, window) in cases {
            let response = validate_common(subject, duration, window).unwrap_err();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert!(validate_common("数学", 720, Some(1440)).is_ok());
    }
}
