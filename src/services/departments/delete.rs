use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::DepartmentService;
use crate::errors::RollcallError;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

/// 仍有班级引用的院系不能删除
pub async fn delete_department(
    service: &DepartmentService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.delete_department(id).await {
        Ok(true) => {
            info!("Department {} deleted", id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("院系已删除")))
        }
        Ok(false) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::DepartmentNotFound,
            "Department not found",
        ))),
        Err(RollcallError::Conflict(msg)) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::error_empty(ErrorCode::DepartmentInUse, msg))),
        Err(e) => Ok(error_response(&e, "删除院系失败")),
    }
}
