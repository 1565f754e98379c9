use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{ClassService, handle_class_write_error};
use crate::middlewares::RequireJWT;
use crate::models::classes::requests::CreateClassRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::storage::Storage;
use crate::utils::validate::validate_name;

/// 校验班级引用的院系与年级存在
pub(crate) async fn check_class_references(
    storage: &Arc<dyn Storage>,
    department_id: Option<i64>,
    level_id: Option<i64>,
) -> Result<(), HttpResponse> {
    if let Some(department_id) = department_id {
        match storage.get_department_by_id(department_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                    ErrorCode::DepartmentNotFound,
                    "Department not found",
                )));
            }
            Err(e) => return Err(error_response(&e, "获取院系失败")),
        }
    }

    if let Some(level_id) = level_id {
        match storage.get_level_by_id(level_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                    ErrorCode::LevelNotFound,
                    "Level not found",
                )));
            }
            Err(e) => return Err(error_response(&e, "获取年级失败")),
        }
    }

    Ok(())
}

pub async fn create_class(
    service: &ClassService,
    request: &HttpRequest,
    mut class_data: CreateClassRequest,
) -> ActixResult<HttpResponse> {
    let uid = RequireJWT::extract_user_id(request).unwrap_or_default();

    class_data.name = match validate_name(&class_data.name) {
        Ok(name) => name,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    };

    let storage = service.get_storage(request)?;

    if let Err(resp) = check_class_references(
        &storage,
        Some(class_data.department_id),
        Some(class_data.level_id),
    )
    .await
    {
        return Ok(resp);
    }

    match storage.create_class(class_data).await {
        Ok(class) => {
            info!("Class {} created successfully by {}", class.name, uid);
            Ok(HttpResponse::Created()
                .json(ApiResponse::success(class, "Class created successfully")))
        }
        Err(e) => Ok(handle_class_write_error(&e, "Class creation failed")),
    }
}
