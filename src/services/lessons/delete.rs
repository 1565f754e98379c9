use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::LessonService;
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::attendance::{load_managed_lesson, unauthorized};
use crate::services::error_response;

/// 删除课程，其考勤记录一并删除
pub async fn delete_lesson(
    service: &LessonService,
    lesson_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    if let Err(response) = load_managed_lesson(&storage, lesson_id, &user).await {
        return Ok(response);
    }

    match storage.delete_lesson(lesson_id).await {
        Ok(true) => {
            info!("User {} deleted lesson {}", user.id, lesson_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("Lesson deleted successfully")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::LessonNotFound,
            "Lesson not found",
        ))),
        Err(e) => Ok(error_response(&e, "删除课程失败")),
    }
}
