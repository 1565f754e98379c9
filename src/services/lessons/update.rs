use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::LessonService;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    lessons::{
        entities::{LessonChanges, LessonKind},
        requests::UpdateLessonRequest,
    },
};
use crate::services::attendance::{load_managed_lesson, unauthorized};
use crate::services::error_response;
use crate::utils::validate::{
    parse_time_of_day, validate_day_of_week, validate_duration, validate_name, validate_window,
};

/// 校验更新请求并转换为存储层的变更
fn build_changes(req: UpdateLessonRequest, kind: LessonKind) -> Result<LessonChanges, String> {
    if kind == LessonKind::Instant && (req.day_of_week.is_some() || req.start_time.is_some()) {
        return Err("Instant lessons have no weekly schedule".to_string());
    }

    let subject = req
        .subject
        .as_deref()
        .map(validate_name)
        .transpose()?;

    if let Some(day) = req.day_of_week {
        validate_day_of_week(day)?;
    }

    let start_minute = req
        .start_time
        .as_deref()
        .map(parse_time_of_day)
        .transpose()?;

    if let Some(duration) = req.duration_minutes {
        validate_duration(duration)?;
    }

    if let Some(Some(window)) = req.attendance_window_minutes {
        validate_window(window)?;
    }

    Ok(LessonChanges {
        subject,
        room: req.room,
        day_of_week: req.day_of_week,
        start_minute,
        duration_minutes: req.duration_minutes,
        attendance_window_minutes: req.attendance_window_minutes,
        active: req.active,
    })
}

pub async fn update_lesson(
    service: &LessonService,
    lesson_id: i64,
    req: UpdateLessonRequest,
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

    let changes = match build_changes(req, lesson.kind) {
        Ok(changes) => changes,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::LessonScheduleInvalid,
                msg,
            )));
        }
    };

    match storage.update_lesson(lesson_id, changes).await {
        Ok(Some(lesson)) => {
            info!("User {} updated lesson {}", user.id, lesson_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(lesson, "课程更新成功")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::LessonNotFound,
            "Lesson not found",
        ))),
        Err(e) => Ok(error_response(&e, "更新课程失败")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_lesson_rejects_schedule_change() {
        let req = UpdateLessonRequest {
            day_of_week: Some(2),
            ..Default::default()
        };
        assert!(build_changes(req, LessonKind::Instant).is_err());
    }

    #[test]
    fn test_changes_are_validated_and_converted() {
        let req = UpdateLessonRequest {
            subject: Some(" 化学 ".to_string()),
            start_time: Some("13:30".to_string()),
            attendance_window_minutes: Some(None),
            ..Default::default()
        };
        let changes = build_changes(req, LessonKind::Scheduled).unwrap();
        assert_eq!(changes.subject.as_deref(), Some("化学"));
        assert_eq!(changes.start_minute, Some(13 * 60 + 30));
        assert_eq!(changes.attendance_window_minutes, Some(None));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for req in [
            UpdateLessonRequest {
                day_of_week: Some(0),
                ..Default::default()
            },
            UpdateLessonRequest {
                start_time: Some("25:00".to_string()),
                ..Default::default()
            },
            UpdateLessonRequest {
                attendance_window_minutes: Some(Some(2000)),
                ..Default::default()
            },
        ] {
            assert!(build_changes(req, LessonKind::Scheduled).is_err());
        }
    }
}
