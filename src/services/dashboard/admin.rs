use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::DashboardService;
use crate::errors::Result;
use crate::models::{
    ApiResponse, dashboard::responses::AdminDashboardResponse, users::entities::UserRole,
};
use crate::services::attendance::school_now;
use crate::services::error_response;
use crate::storage::Storage;

async fn collect_counts(storage: &dyn Storage) -> Result<AdminDashboardResponse> {
    let today = school_now().await.date_naive();
    Ok(AdminDashboardResponse {
        departments: storage.count_departments().await? as i64,
        levels: storage.count_levels().await? as i64,
        classes: storage.count_classes().await? as i64,
        teachers: storage.count_users_by_role(UserRole::Teacher).await? as i64,
        students: storage.count_users_by_role(UserRole::Student).await? as i64,
        lessons: storage.count_lessons().await? as i64,
        records_today: storage.count_attendance_on_date(today).await? as i64,
    })
}

/// 管理员首页：全校数据统计
pub async fn admin_dashboard(
    service: &DashboardService,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    match collect_counts(storage.as_ref()).await {
        Ok(counts) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            counts,
            "Dashboard retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "统计数据失败")),
    }
}
