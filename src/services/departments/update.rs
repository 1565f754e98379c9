use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{DepartmentService, normalize_code};
use crate::errors::RollcallError;
use crate::models::departments::requests::UpdateDepartmentRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::utils::validate::validate_name;

fn normalize_update(
    mut req: UpdateDepartmentRequest,
) -> Result<UpdateDepartmentRequest, &'static str> {
    req.name = req.name.as_deref().map(validate_name).transpose()?;
    req.code = req.code.as_deref().map(normalize_code).transpose()?;
    Ok(req)
}

pub async fn update_department(
    service: &DepartmentService,
    id: i64,
    req: UpdateDepartmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let req = match normalize_update(req) {
        Ok(req) => req,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    };

    let storage = service.get_storage(request)?;

    match storage.update_department(id, req).await {
        Ok(Some(department)) => {
            info!("Department {} updated", id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(department, "院系更新成功")))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::DepartmentNotFound,
            "Department not found",
        ))),
        Err(RollcallError::Conflict(_)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(
                ErrorCode::DepartmentAlreadyExists,
                "Department name or code already exists",
            ),
        )),
        Err(e) => Ok(error_response(&e, "更新院系失败")),
    }
}
