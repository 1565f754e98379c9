use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::system::requests::{SettingAuditQuery, UpdateSettingRequest};
use crate::models::users::entities::UserRole;
use crate::services::SystemService;
use crate::utils::{SafeBackupName, SafeSettingKey};

// 懒加载的全局 SystemService 实例
static SYSTEM_SERVICE: Lazy<SystemService> = Lazy::new(SystemService::new_lazy);

pub async fn get_settings() -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.get_settings().await
}

pub async fn get_admin_settings(request: HttpRequest) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.get_admin_settings(&request).await
}

pub async fn get_setting(request: HttpRequest, key: SafeSettingKey) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.get_setting(key.0, &request).await
}

pub async fn update_setting(
    request: HttpRequest,
    key: SafeSettingKey,
    body: web::Json<UpdateSettingRequest>,
) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE
        .update_setting(key.0, body.into_inner(), &request)
        .await
}

pub async fn get_setting_audits(
    request: HttpRequest,
    query: web::Query<SettingAuditQuery>,
) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE
        .get_setting_audits(query.into_inner(), &request)
        .await
}

pub async fn create_backup(request: HttpRequest) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.create_backup(&request).await
}

pub async fn list_backups() -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.list_backups().await
}

pub async fn download_backup(name: SafeBackupName) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.download_backup(name.0).await
}

pub async fn delete_backup(name: SafeBackupName) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.delete_backup(name.0).await
}

// 配置路由
pub fn configure_system_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/system")
            .wrap(middlewares::RequireJWT)
            .route("/settings", web::get().to(get_settings))
            .service(
                web::scope("")
                    .wrap(middlewares::RequireRole::new_any(UserRole::admin_roles()))
                    .route("/admin/settings", web::get().to(get_admin_settings))
                    .route("/admin/settings/audits", web::get().to(get_setting_audits))
                    .route("/admin/settings/{key}", web::get().to(get_setting))
                    .route("/admin/settings/{key}", web::put().to(update_setting))
                    .route("/backups", web::get().to(list_backups))
                    .route("/backups", web::post().to(create_backup))
                    .route("/backups/{name}", web::get().to(download_backup))
                    .route("/backups/{name}", web::delete().to(delete_backup)),
            ),
    );
}
