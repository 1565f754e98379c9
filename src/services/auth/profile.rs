use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use crate::errors::RollcallError;
use crate::middlewares::RequireJWT;
use crate::models::auth::requests::UpdateProfileRequest;
use crate::models::users::requests::UpdateUserRequest;
use crate::models::users::responses::UserResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::attendance::unauthorized;
use crate::services::{error_response, invalidate_user_cache};
use crate::utils::password::{hash_password, verify_password};
use crate::utils::validate::{validate_email, validate_password};

use super::AuthService;

/// 修改密码前的检查：必须提供正确的当前密码，新密码满足密码策略
fn check_password_change(
    current_hash: &str,
    current_password: Option<&str>,
    new_password: &str,
) -> Result<(), (ErrorCode, String)> {
    let Some(current_password) = current_password else {
        return Err((
            ErrorCode::BadRequest,
            "Current password is required to set a new password".to_string(),
        ));
    };
    if !verify_password(current_password, current_hash) {
        return Err((
            ErrorCode::AuthFailed,
            "Current password is incorrect".to_string(),
        ));
    }
    validate_password(new_password).map_err(|msg| (ErrorCode::UserPasswordInvalid, msg))
}

pub async fn handle_update_profile(
    service: &AuthService,
    update_data: UpdateProfileRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(current_user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    if let Some(email) = &update_data.email
        && let Err(msg) = validate_email(email)
    {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::UserEmailInvalid, msg)));
    }

    let storage = service.get_storage(request)?;

    // 处理密码（如果提供了新密码）；缓存中的用户不含密码哈希，需要重新读取
    let hashed_password = match &update_data.password {
        Some(password) => {
            let stored = match storage.get_user_by_id(current_user.id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                        ErrorCode::UserNotFound,
                        "用户不存在",
                    )));
                }
                Err(e) => return Ok(error_response(&e, "获取用户失败")),
            };
            if let Err((code, msg)) = check_password_change(
                &stored.password_hash,
                update_data.current_password.as_deref(),
                password,
            ) {
                return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(code, msg)));
            }
            match hash_password(password) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    return Ok(
                        HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                            ErrorCode::InternalServerError,
                            format!("密码哈希失败: {e}"),
                        )),
                    );
                }
            }
        }
        None => None,
    };

    // 不包含角色、状态与班级，普通用户无权修改
    let storage_update = UpdateUserRequest {
        email: update_data.email,
        password: hashed_password,
        display_name: update_data.display_name,
        ..Default::default()
    };

    match storage.update_user(current_user.id, storage_update).await {
        Ok(Some(user)) => {
            invalidate_user_cache(request, current_user.id).await;
            info!("User {} updated own profile", current_user.id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                UserResponse { user },
                "用户信息更新成功",
            )))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::UserNotFound,
            "用户不存在",
        ))),
        Err(RollcallError::Conflict(_)) => Ok(HttpResponse::Conflict().json(
            ApiResponse::error_empty(ErrorCode::UserEmailAlreadyExists, "该邮箱已被使用"),
        )),
        Err(e) => Ok(error_response(&e, "更新用户信息失败")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2Config;
    use crate::utils::password::hash_password_with;

    fn hash(password: &str) -> String {
        let params = Argon2Config {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        };
        hash_password_with(password, &params).unwrap()
    }

    #[test]
    fn test_password_change_requires_current_password() {
        let hash = hash("OldSecret1");
        let (code, _) = check_password_change(&hash, None, "NewSecret2").unwrap_err();
        assert_eq!(code, ErrorCode::BadRequest);

        let (code, _) = check_password_change(&hash, Some("wrong"), "NewSecret2").unwrap_err();
        assert_eq!(code, ErrorCode::AuthFailed);
    }

    #[test]
    fn test_password_change_enforces_policy() {
        let hash = hash("OldSecret1");
        let (code, _) = check_password_change(&hash, Some("OldSecret1"), "weak").unwrap_err();
        assert_eq!(code, ErrorCode::UserPasswordInvalid);
        assert!(check_password_change(&hash, Some("OldSecret1"), "NewSecret2").is_ok());
    }
}
