use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares::{self, RateLimit};
use crate::models::attendance::requests::{
    AttendanceExportParams, AttendanceListParams, MarkAttendanceRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::AttendanceService;
use crate::utils::SafeIDI64;

static ATTENDANCE_SERVICE: Lazy<AttendanceService> = Lazy::new(AttendanceService::new_lazy);

pub async fn mark_attendance(
    req: HttpRequest,
    body: web::Json<MarkAttendanceRequest>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE.mark(body.into_inner(), &req).await
}

pub async fn list_attendance(
    req: HttpRequest,
    query: web::Query<AttendanceListParams>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE.list(query.into_inner(), &req).await
}

pub async fn export_attendance(
    req: HttpRequest,
    query: web::Query<AttendanceExportParams>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE.export(query.into_inner(), &req).await
}

pub async fn delete_attendance(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE.delete(id.0, &req).await
}

// 配置路由
pub fn configure_attendance_routes(cfg: &mut web::ServiceConfig) {
    let teachers = || middlewares::RequireRole::new_any(UserRole::teacher_roles());

    cfg.service(
        web::scope("/api/v1/attendance")
            .wrap(middlewares::RequireJWT)
            .route(
                "/mark",
                web::post()
                    .to(mark_attendance)
                    .wrap(RateLimit::attendance_mark())
                    .wrap(middlewares::RequireRole::new(&UserRole::Student)),
            )
            .route("", web::get().to(list_attendance))
            .route("/export", web::get().to(export_attendance).wrap(teachers()))
            .route("/{id}", web::delete().to(delete_attendance).wrap(teachers())),
    );
}
