pub mod attendance;
pub mod auth;
pub mod classes;
pub mod dashboard;
pub mod departments;
pub mod lessons;
pub mod levels;
pub mod system;
pub mod users;

pub use attendance::AttendanceService;
pub use auth::AuthService;
pub use classes::ClassService;
pub use dashboard::DashboardService;
pub use departments::DepartmentService;
pub use lessons::LessonService;
pub use levels::LevelService;
pub use system::SystemService;
pub use users::UserService;

use actix_web::{HttpRequest, HttpResponse, web};
use std::sync::Arc;
use tracing::error;

use crate::cache::{ObjectCache, user_cache_key};
use crate::errors::RollcallError;
use crate::models::{ApiResponse, ErrorCode};
use crate::storage::Storage;

/// 从 app data 中取出存储实例
pub(crate) fn storage_from_request(request: &HttpRequest) -> actix_web::Result<Arc<dyn Storage>> {
    request
        .app_data::<web::Data<Arc<dyn Storage>>>()
        .map(|data| data.get_ref().clone())
        .ok_or_else(|| {
            error!("Storage not found in app data");
            actix_web::error::ErrorInternalServerError("Storage not configured")
        })
}

/// 用户信息变更后清除认证缓存
pub(crate) async fn invalidate_user_cache(request: &HttpRequest, user_id: i64) {
    if let Some(cache) = request.app_data::<web::Data<Arc<dyn ObjectCache>>>() {
        cache.remove(&user_cache_key(user_id)).await;
        tracing::debug!("Invalidated cached user {}", user_id);
    }
}

/// 存储层错误的通用映射，`context` 用于日志与 500 响应
pub(crate) fn error_response(e: &RollcallError, context: &str) -> HttpResponse {
    match e {
        RollcallError::NotFound(msg) => {
            HttpResponse::NotFound().json(ApiResponse::error_empty(ErrorCode::NotFound, msg))
        }
        RollcallError::Conflict(msg) => {
            HttpResponse::Conflict().json(ApiResponse::error_empty(ErrorCode::Conflict, msg))
        }
        RollcallError::Validation(msg) => {
            HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, msg))
        }
        _ => {
            error!("{}: {}", context, e);
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("{context}: {}", e.message()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_error_response_status_mapping() {
        let cases = [
            (RollcallError::not_found("x"), StatusCode::NOT_FOUND),
            (RollcallError::conflict("x"), StatusCode::CONFLICT),
            (RollcallError::validation("x"), StatusCode::BAD_REQUEST),
            (
                RollcallError::database_operation("x"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err, "test").status(), status);
        }
    }

    #[test]
    fn test_storage_missing_is_an_error() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        assert!(storage_from_request(&req).is_err());
    }
}
