use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Duration;
use tracing::{error, warn};

use crate::middlewares::RequireJWT;
use crate::models::auth::responses::{
    RefreshTokenResponse, TokenVerificationResponse, UserInfoResponse,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::attendance::unauthorized;
use crate::services::system::DynamicConfig;
use crate::utils::jwt::{ACCESS_TOKEN, JwtUtils};

use super::AuthService;

fn login_expired() -> HttpResponse {
    // 清除无效的 refresh token cookie
    HttpResponse::Unauthorized()
        .cookie(JwtUtils::create_empty_refresh_token_cookie())
        .json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Login expired or invalid, please login again",
        ))
}

/// 用 refresh token 换取新的 access token，角色或状态变化后旧令牌失效
pub async fn handle_refresh_token(
    service: &AuthService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(refresh_token) = JwtUtils::extract_refresh_token_from_cookie(request) else {
        return Ok(HttpResponse::Unauthorized().json(ApiResponse::error_empty(
            ErrorCode::Unauthorized,
            "Unauthorized access, please login",
        )));
    };

    let claims = match JwtUtils::verify_refresh_token(&refresh_token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("Refresh token rejected: {}", e);
            return Ok(login_expired());
        }
    };

    let Some(user_id) = claims.user_id() else {
        return Ok(login_expired());
    };

    let storage = service.get_storage(request)?;
    let user = match storage.get_user_by_id(user_id).await {
        Ok(Some(user)) if user.is_active() && user.role.to_string() == claims.role => user,
        Ok(_) => return Ok(login_expired()),
        Err(e) => {
            error!("Refresh token failed: {}", e);
            return Ok(login_expired());
        }
    };

    let access_minutes = DynamicConfig::access_token_expiry().await;
    match JwtUtils::generate_token_with_expiry(
        user.id,
        &claims.role,
        ACCESS_TOKEN,
        Duration::minutes(access_minutes),
    ) {
        Ok(access_token) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            RefreshTokenResponse {
                access_token,
                expires_in: access_minutes * 60,
            },
            "Token refreshed successfully",
        ))),
        Err(e) => {
            error!("Failed to generate JWT token: {}", e);
            Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    "Unable to generate token",
                )),
            )
        }
    }
}

/// 能走到这里说明 RequireJWT 已经校验通过
pub async fn handle_verify_token(request: &HttpRequest) -> ActixResult<HttpResponse> {
    let is_valid = RequireJWT::extract_user_id(request).is_some();
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        TokenVerificationResponse { is_valid },
        "Token is valid",
    )))
}

pub async fn handle_get_user(request: &HttpRequest) -> ActixResult<HttpResponse> {
    match RequireJWT::extract_user_claims(request) {
        Some(user) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            UserInfoResponse { user },
            "User information retrieved successfully",
        ))),
        None => Ok(unauthorized()),
    }
}
