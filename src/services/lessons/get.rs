use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::LessonService;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode, lessons::responses::LessonListItem, users::entities::UserRole,
};
use crate::services::attendance::{can_manage_lesson, school_now, student_eligibility, unauthorized};
use crate::services::error_response;

pub async fn get_lesson(
    service: &LessonService,
    lesson_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let lesson = match storage.get_lesson_by_id(lesson_id).await {
        Ok(Some(lesson)) => lesson,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::LessonNotFound,
                "Lesson not found",
            )));
        }
        Err(e) => return Ok(error_response(&e, "获取课程失败")),
    };

    let visible = match user.role {
        UserRole::Student => user.class_id == Some(lesson.class_id),
        _ => can_manage_lesson(&user, &lesson),
    };
    if !visible {
        return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::LessonPermissionDenied,
            "You do not have access to this lesson",
        )));
    }

    let eligibility = if user.role == UserRole::Student {
        match student_eligibility(&storage, &lesson, user.id, school_now().await).await {
            Ok(eligibility) => Some(eligibility),
            Err(e) => return Ok(error_response(&e, "判定签到窗口失败")),
        }
    } else {
        None
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        LessonListItem {
            lesson,
            eligibility,
        },
        "Lesson retrieved successfully",
    )))
}
