use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{DynamicConfig, SystemService};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    system::{
        entities::{KnownSettingKey, SettingValueType},
        requests::{SettingAuditQuery, UpdateSettingRequest},
        responses::{AdminSettingsListResponse, SettingResponse, SystemSettingsResponse},
    },
};
use crate::services::attendance::unauthorized;
use crate::services::error_response;

/// 获取公开系统设置（只读）
pub async fn get_settings(service: &SystemService) -> ActixResult<HttpResponse> {
    let config = service.get_config();

    let response = SystemSettingsResponse {
        system_name: DynamicConfig::system_name().await,
        attendance_window_minutes: DynamicConfig::attendance_window_minutes().await,
        late_after_minutes: DynamicConfig::late_after_minutes().await,
        allow_self_mark: DynamicConfig::allow_self_mark().await,
        utc_offset_minutes: DynamicConfig::utc_offset_minutes().await,
        environment: config.app.environment.clone(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        response,
        "Settings retrieved successfully",
    )))
}

/// 获取所有管理员配置
pub async fn get_admin_settings(
    service: &SystemService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.list_all_settings().await {
        Ok(settings) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            AdminSettingsListResponse { settings },
            "Admin settings retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "获取配置列表失败")),
    }
}

/// 获取单个配置项
pub async fn get_setting(
    service: &SystemService,
    key: String,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.get_setting_by_key(&key).await {
        Ok(Some(setting)) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            SettingResponse { setting },
            "Setting retrieved successfully",
        ))),
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::SettingNotFound,
            format!("Setting '{key}' not found"),
        ))),
        Err(e) => Ok(error_response(&e, "获取配置失败")),
    }
}

/// 校验并规范化配置值，返回写入数据库的值
fn normalize_value(key: &str, value: &str) -> Result<String, (ErrorCode, String)> {
    let known: KnownSettingKey = key
        .parse()
        .map_err(|msg| (ErrorCode::SettingNotFound, msg))?;
    known
        .validate_value(value)
        .map_err(|msg| (ErrorCode::SettingValueInvalid, msg))?;

    Ok(match known.value_type() {
        SettingValueType::String => value.trim().to_string(),
        SettingValueType::Integer => value.trim().parse::<i64>().map_or_else(
            |_| value.trim().to_string(),
            |n| n.to_string(),
        ),
        SettingValueType::Boolean => value.trim().to_string(),
    })
}

/// 更新单个配置：写库、记审计、刷新内存缓存
pub async fn update_setting(
    service: &SystemService,
    key: String,
    body: UpdateSettingRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user_id) = RequireJWT::extract_user_id(request) else {
        return Ok(unauthorized());
    };

    let value = match normalize_value(&key, &body.value) {
        Ok(value) => value,
        Err((code, msg)) => {
            let response = if code == ErrorCode::SettingNotFound {
                HttpResponse::NotFound()
            } else {
                HttpResponse::BadRequest()
            }
            .json(ApiResponse::error_empty(code, msg));
            return Ok(response);
        }
    };

    // 获取客户端 IP
    let ip_address = request
        .connection_info()
        .realip_remote_addr()
        .map(|s| s.to_string());

    let storage = service.get_storage(request)?;

    let setting = match storage
        .update_setting(&key, &value, user_id, ip_address)
        .await
    {
        Ok(setting) => setting,
        Err(e) => return Ok(error_response(&e, "更新配置失败")),
    };

    DynamicConfig::update(&key, &value).await;
    info!("Setting {} changed to {} by user {}", key, value, user_id);

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        SettingResponse { setting },
        "Setting updated successfully",
    )))
}

/// 获取审计日志
pub async fn get_setting_audits(
    service: &SystemService,
    query: SettingAuditQuery,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match storage.list_setting_audits(query).await {
        Ok(audits) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            audits,
            "Setting audits retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "获取审计日志失败")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_key() {
        let (code, _) = normalize_value("upload.max_size", "10").unwrap_err();
        assert_eq!(code, ErrorCode::SettingNotFound);
    }

    #[test]
    fn test_invalid_value() {
        let (code, _) = normalize_value("attendance.window_minutes", "0").unwrap_err();
        assert_eq!(code, ErrorCode::SettingValueInvalid);
    }

    #[test]
    fn test_values_are_normalized() {
        assert_eq!(
            normalize_value("attendance.window_minutes", " 020 ").unwrap(),
            "20"
        );
        assert_eq!(
            normalize_value("app.system_name", "  点名系统 ").unwrap(),
            "点名系统"
        );
        assert_eq!(
            normalize_value("attendance.allow_self_mark", "false").unwrap(),
            "false"
        );
    }
}
