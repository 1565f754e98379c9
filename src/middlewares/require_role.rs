//! 角色访问控制中间件
//!
//! 依赖 `RequireJWT` 写入请求扩展的用户，因此必须包在 `RequireJWT` 内层：
//! 在外层 scope 上 `.wrap(RequireJWT)`，在内层 scope 或单个路由上 `.wrap(RequireRole::..)`。
//!
//! ```rust,ignore
//! web::scope("/api/v1/classes")
//!     .wrap(RequireJWT)
//!     .service(
//!         web::scope("")
//!             .wrap(RequireRole::new_any(UserRole::teacher_roles()))
//!             .route("", web::get().to(list_classes)),
//!     )
//! ```

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::info;

use crate::models::{
    ErrorCode,
    users::entities::{User, UserRole},
};

use super::create_error_response;

/// 允许访问的角色集合，命中任一即可
#[derive(Clone)]
pub struct RequireRole {
    allowed: Rc<[UserRole]>,
}

impl RequireRole {
    /// 仅允许单一角色
    pub fn new(role: &UserRole) -> Self {
        Self {
            allowed: Rc::from([*role]),
        }
    }

    /// 允许列表中的任一角色
    pub fn new_any(roles: &[&UserRole]) -> Self {
        Self {
            allowed: roles.iter().map(|r| **r).collect(),
        }
    }
}

fn role_allowed(allowed: &[UserRole], role: UserRole) -> bool {
    allowed.contains(&role)
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            allowed: self.allowed.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    allowed: Rc<[UserRole]>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let allowed = self.allowed.clone();

        Box::pin(async move {
            let current = req
                .extensions()
                .get::<User>()
                .map(|user| (user.id, user.role));

            let Some((user_id, role)) = current else {
                // RequireJWT 未生效
                info!("Role check without an authenticated user on {}", req.path());
                return Ok(req.into_response(
                    create_error_response(
                        StatusCode::UNAUTHORIZED,
                        ErrorCode::Unauthorized,
                        "Authentication required",
                    )
                    .map_into_right_body(),
                ));
            };

            if role_allowed(&allowed, role) {
                return Ok(srv.call(req).await?.map_into_left_body());
            }

            info!(
                "User {} ({}) denied on {}, allowed roles: {:?}",
                user_id,
                role,
                req.path(),
                allowed
            );
            Ok(req.into_response(
                create_error_response(
                    StatusCode::FORBIDDEN,
                    ErrorCode::Forbidden,
                    "当前角色无权执行该操作",
                )
                .map_into_right_body(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test as actix_test, web};

    #[test]
    fn test_role_allowed() {
        let teachers: Vec<UserRole> = UserRole::teacher_roles().iter().map(|r| **r).collect();
        assert!(role_allowed(&teachers, UserRole::Teacher));
        assert!(role_allowed(&teachers, UserRole::Admin));
        assert!(!role_allowed(&teachers, UserRole::Student));
        assert!(!role_allowed(&[], UserRole::Admin));
    }

    #[actix_web::test]
    async fn test_missing_user_is_unauthorized() {
        let app = actix_test::init_service(
            App::new().service(
                web::scope("/t")
                    .wrap(RequireRole::new(&UserRole::Admin))
                    .route("", web::get().to(HttpResponse::Ok)),
            ),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/t").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
