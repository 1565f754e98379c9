use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::LevelService;
use crate::errors::RollcallError;
use crate::models::levels::requests::{CreateLevelRequest, UpdateLevelRequest};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::utils::validate::validate_name;

fn level_not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ApiResponse::error_empty(
        ErrorCode::LevelNotFound,
        "Level not found",
    ))
}

fn level_exists() -> HttpResponse {
    HttpResponse::Conflict().json(ApiResponse::error_empty(
        ErrorCode::LevelAlreadyExists,
        "Level name already exists",
    ))
}

pub async fn create_level(
    service: &LevelService,
    mut req: CreateLevelRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    req.name = match validate_name(&req.name) {
        Ok(name) => name,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    };

    let storage = service.get_storage(request)?;

    match storage.create_level(req).await {
        Ok(level) => {
            info!("Level {} created with rank {}", level.name, level.rank);
            Ok(HttpResponse::Created().json(ApiResponse::success(level, "年级创建成功")))
        }
        Err(RollcallError::Conflict(_)) => Ok(level_exists()),
        Err(e) => Ok(error_response(&e, "创建年级失败")),
    }
}

pub async fn list_levels(
    service: &LevelService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.list_levels().await {
        Ok(levels) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            levels,
            "Levels retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "获取年级列表失败")),
    }
}

pub async fn get_level(
    service: &LevelService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_level_by_id(id).await {
        Ok(Some(level)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            level,
            "Level retrieved successfully",
        ))),
        Ok(None) => Ok(level_not_found()),
        Err(e) => Ok(error_response(&e, "获取年级失败")),
    }
}

pub async fn update_level(
    service: &LevelService,
    id: i64,
    mut req: UpdateLevelRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    if let Some(name) = &req.name {
        match validate_name(name) {
            Ok(name) => req.name = Some(name),
            Err(msg) => {
                return Ok(HttpResponse::BadRequest()
                    .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
            }
        }
    }

    let storage = service.get_storage(request)?;

    match storage.update_level(id, req).await {
        Ok(Some(level)) => {
            info!("Level {} updated", id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(level, "年级更新成功")))
        }
        Ok(None) => Ok(level_not_found()),
        Err(RollcallError::Conflict(_)) => Ok(level_exists()),
        Err(e) => Ok(error_response(&e, "更新年级失败")),
    }
}

// 仍有班级引用时拒绝删除
pub async fn delete_level(
    service: &LevelService,
    id: i64,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.delete_level(id).await {
        Ok(true) => {
            info!("Level {} deleted", id);
            Ok(HttpResponse::Ok().json(ApiResponse::success_empty("年级已删除")))
        }
        Ok(false) => Ok(level_not_found()),
        Err(RollcallError::Conflict(msg)) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::error_empty(ErrorCode::LevelInUse, msg))),
        Err(e) => Ok(error_response(&e, "删除年级失败")),
    }
}
