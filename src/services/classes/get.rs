use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::ClassService;
use crate::models::classes::responses::{ClassDetailResponse, ClassRosterResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

fn class_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::ClassNotFound,
        "Class not found",
    ))
}

pub async fn get_class(
    service: &ClassService,
    request: &HttpRequest,
    class_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let class = match storage.get_class_by_id(class_id).await {
        Ok(Some(class)) => class,
        Ok(None) => return Ok(class_not_found()),
        Err(e) => return Ok(error_response(&e, "Failed to get class information")),
    };

    let department = storage
        .get_department_by_id(class.department_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load department {}: {}", class.department_id, e);
            None
        });
    let level = storage
        .get_level_by_id(class.level_id)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load level {}: {}", class.level_id, e);
            None
        });

    let student_count = match storage.count_class_students(class_id).await {
        Ok(count) => count as i64,
        Err(e) => return Ok(error_response(&e, "Failed to count students")),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        ClassDetailResponse {
            class,
            department,
            level,
            student_count,
        },
        "Class information retrieved successfully",
    )))
}

pub async fn list_class_students(
    service: &ClassService,
    request: &HttpRequest,
    class_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_class_by_id(class_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Ok(class_not_found()),
        Err(e) => return Ok(error_response(&e, "Failed to get class information")),
    }

    match storage.list_class_students(class_id).await {
        Ok(students) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            ClassRosterResponse { class_id, students },
            "Class students retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "Failed to list class students")),
    }
}
