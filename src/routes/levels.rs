use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::levels::requests::{CreateLevelRequest, UpdateLevelRequest};
use crate::models::users::entities::UserRole;
use crate::services::LevelService;
use crate::utils::SafeIDI64;

static LEVEL_SERVICE: Lazy<LevelService> = Lazy::new(LevelService::new_lazy);

pub async fn list_levels(req: HttpRequest) -> ActixResult<HttpResponse> {
    LEVEL_SERVICE.list_levels(&req).await
}

pub async fn create_level(
    req: HttpRequest,
    body: web::Json<CreateLevelRequest>,
) -> ActixResult<HttpResponse> {
    LEVEL_SERVICE.create_level(body.into_inner(), &req).await
}

pub async fn get_level(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    LEVEL_SERVICE.get_level(id.0, &req).await
}

pub async fn update_level(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<UpdateLevelRequest>,
) -> ActixResult<HttpResponse> {
    LEVEL_SERVICE.update_level(id.0, body.into_inner(), &req).await
}

pub async fn delete_level(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    LEVEL_SERVICE.delete_level(id.0, &req).await
}

// 所有登录用户可读，管理员可写
pub fn configure_level_routes(cfg: &mut web::ServiceConfig) {
    let admin_only = || middlewares::RequireRole::new_any(UserRole::admin_roles());

    cfg.service(
        web::scope("/api/v1/levels")
            .wrap(middlewares::RequireJWT)
            .service(
                web::resource("")
                    .route(web::get().to(list_levels))
                    .route(web::post().to(create_level).wrap(admin_only())),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_level))
                    .route(web::put().to(update_level).wrap(admin_only()))
                    .route(web::delete().to(delete_level).wrap(admin_only())),
            ),
    );
}
