use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::attendance::requests::{
    BulkAttendanceRequest, OverrideAttendanceRequest, SessionQuery,
};
use crate::models::lessons::requests::{
    CreateInstantLessonRequest, CreateLessonRequest, LessonListParams, UpdateLessonRequest,
};
use crate::models::users::entities::UserRole;
use crate::services::{AttendanceService, LessonService};
use crate::utils::{SafeIDI64, SafeStudentIdI64};

static LESSON_SERVICE: Lazy<LessonService> = Lazy::new(LessonService::new_lazy);
static ATTENDANCE_SERVICE: Lazy<AttendanceService> = Lazy::new(AttendanceService::new_lazy);

pub async fn list_lessons(
    req: HttpRequest,
    query: web::Query<LessonListParams>,
) -> ActixResult<HttpResponse> {
    LESSON_SERVICE.list_lessons(query.into_inner(), &req).await
}

pub async fn create_lesson(
    req: HttpRequest,
    body: web::Json<CreateLessonRequest>,
) -> ActixResult<HttpResponse> {
    LESSON_SERVICE.create_lesson(body.into_inner(), &req).await
}

pub async fn create_instant_lesson(
    req: HttpRequest,
    body: web::Json<CreateInstantLessonRequest>,
) -> ActixResult<HttpResponse> {
    LESSON_SERVICE
        .create_instant_lesson(body.into_inner(), &req)
        .await
}

pub async fn get_lesson(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    LESSON_SERVICE.get_lesson(id.0, &req).await
}

pub async fn update_lesson(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<UpdateLessonRequest>,
) -> ActixResult<HttpResponse> {
    LESSON_SERVICE
        .update_lesson(id.0, body.into_inner(), &req)
        .await
}

pub async fn delete_lesson(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    LESSON_SERVICE.delete_lesson(id.0, &req).await
}

pub async fn get_eligibility(req: HttpRequest, id: SafeIDI64) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE.eligibility(id.0, &req).await
}

pub async fn lesson_roster(
    req: HttpRequest,
    id: SafeIDI64,
    query: web::Query<SessionQuery>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE
        .roster(id.0, query.into_inner(), &req)
        .await
}

pub async fn override_attendance(
    req: HttpRequest,
    id: SafeIDI64,
    student_id: SafeStudentIdI64,
    body: web::Json<OverrideAttendanceRequest>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE
        .override_record(id.0, student_id.0, body.into_inner(), &req)
        .await
}

pub async fn bulk_attendance(
    req: HttpRequest,
    id: SafeIDI64,
    body: web::Json<BulkAttendanceRequest>,
) -> ActixResult<HttpResponse> {
    ATTENDANCE_SERVICE
        .bulk(id.0, body.into_inner(), &req)
        .await
}

// 配置路由
pub fn configure_lesson_routes(cfg: &mut web::ServiceConfig) {
    let teachers = || middlewares::RequireRole::new_any(UserRole::teacher_roles());

    cfg.service(
        web::scope("/api/v1/lessons")
            .wrap(middlewares::RequireJWT)
            .service(
                // 列表按角色收窄范围
                web::resource("")
                    .route(web::get().to(list_lessons))
                    .route(web::post().to(create_lesson).wrap(teachers())),
            )
            .service(
                web::resource("/instant")
                    .route(web::post().to(create_instant_lesson).wrap(teachers())),
            )
            .service(
                web::resource("/{id}/eligibility").route(
                    web::get()
                        .to(get_eligibility)
                        .wrap(middlewares::RequireRole::new(&UserRole::Student)),
                ),
            )
            .service(
                web::resource("/{id}/attendance")
                    .route(web::get().to(lesson_roster).wrap(teachers())),
            )
            .service(
                web::resource("/{id}/attendance/bulk")
                    .route(web::post().to(bulk_attendance).wrap(teachers())),
            )
            .service(
                web::resource("/{id}/attendance/{student_id}")
                    .route(web::put().to(override_attendance).wrap(teachers())),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(get_lesson))
                    .route(web::put().to(update_lesson).wrap(teachers()))
                    .route(web::delete().to(delete_lesson).wrap(teachers())),
            ),
    );
}
