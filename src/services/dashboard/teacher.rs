use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::{DashboardService, session_for_today};
use crate::models::{
    ApiResponse,
    dashboard::responses::{TeacherDashboardResponse, TeacherLessonToday},
    users::entities::User,
};
use crate::services::attendance::{evaluate, policy_for, school_now, schedule_of};
use crate::services::error_response;

/// 教师首页：今天自己的课，含窗口状态、班级人数与已登记人数
pub async fn teacher_dashboard(
    service: &DashboardService,
    user: &User,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let now = school_now().await;
    let today = now.date_naive();

    let taught = match storage.list_active_lessons_for_teacher(user.id).await {
        Ok(lessons) => lessons,
        Err(e) => return Ok(error_response(&e, "获取课程失败")),
    };

    let mut lessons = Vec::new();
    for lesson in taught {
        let schedule = match schedule_of(&lesson) {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Skipping lesson {} on dashboard: {}", lesson.id, e);
                continue;
            }
        };
        let eligibility = evaluate(&schedule, &policy_for(&lesson).await, now, &[]);
        let Some(session_date) = session_for_today(&schedule, &eligibility, today, *now.offset())
        else {
            continue;
        };

        let class_size = match storage.count_class_students(lesson.class_id).await {
            Ok(count) => count as i64,
            Err(e) => return Ok(error_response(&e, "统计班级人数失败")),
        };
        let marked_count = match storage.list_session_records(lesson.id, session_date).await {
            Ok(records) => records.len() as i64,
            Err(e) => return Ok(error_response(&e, "获取考勤记录失败")),
        };

        lessons.push(TeacherLessonToday {
            lesson,
            eligibility,
            session_date,
            class_size,
            marked_count,
        });
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        TeacherDashboardResponse {
            date: today,
            lessons,
        },
        "Dashboard retrieved successfully",
    )))
}
