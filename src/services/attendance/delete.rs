use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{AttendanceService, load_managed_lesson, unauthorized};
use crate::middlewares::RequireJWT;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

pub async fn delete_attendance(
    service: &AttendanceService,
    record_id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let record = match storage.get_attendance_record_by_id(record_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::AttendanceRecordNotFound,
                "Attendance record not found",
            )));
        }
        Err(e) => return Ok(error_response(&e, "获取考勤记录失败")),
    };

    // 权限跟随记录所属的课程
    if let Err(response) = load_managed_lesson(&storage, record.lesson_id, &user).await {
        return Ok(response);
    }

    match storage.delete_attendance_record(record_id).await {
        Ok(true) => {
            info!("User {} deleted attendance record {}", user.id, record_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("考勤记录已删除")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::AttendanceRecordNotFound,
            "Attendance record not found",
        ))),
        Err(e) => Ok(error_response(&e, "删除考勤记录失败")),
    }
}
