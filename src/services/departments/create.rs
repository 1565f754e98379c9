use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{DepartmentService, normalize_code};
use crate::errors::RollcallError;
use crate::models::departments::requests::CreateDepartmentRequest;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::utils::validate::validate_name;

pub async fn create_department(
    service: &DepartmentService,
    mut req: CreateDepartmentRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let normalized =
        validate_name(&req.name).and_then(|name| Ok((name, normalize_code(&req.code)?)));
    match normalized {
        Ok((name, code)) => {
            req.name = name;
            req.code = code;
        }
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    }

    let storage = service.get_storage(request)?;

    match storage.create_department(req).await {
        Ok(department) => {
            info!("Department {} ({}) created", department.name, department.code);
            Ok(HttpResponse::Created().json(ApiResponse::success(department, "院系创建成功")))
        }
        Err(RollcallError::Conflict(_)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(
                ErrorCode::DepartmentAlreadyExists,
                "Department name or code already exists",
            ),
        )),
        Err(e) => Ok(error_response(&e, "创建院系失败")),
    }
}
