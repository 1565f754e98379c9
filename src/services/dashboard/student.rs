use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::{DashboardService, session_for_today};
use crate::models::{
    ApiResponse,
    dashboard::responses::{StudentDashboardResponse, StudentLessonToday},
    users::entities::User,
};
use crate::services::attendance::{school_now, schedule_of, student_eligibility};
use crate::services::error_response;

/// 学生首页：本班今天的课与自己的签到情况，以及历史考勤汇总
pub async fn student_dashboard(
    service: &DashboardService,
    user: &User,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;
    let now = school_now().await;
    let today = now.date_naive();

    let class_lessons = match user.class_id {
        Some(class_id) => match storage.list_active_lessons_for_class(class_id).await {
            Ok(lessons) => lessons,
            Err(e) => return Ok(error_response(&e, "获取课程失败")),
        },
        None => Vec::new(),
    };

    let mut lessons = Vec::new();
    for lesson in class_lessons {
        let schedule = match schedule_of(&lesson) {
            Ok(schedule) => schedule,
            Err(e) => {
                warn!("Skipping lesson {} on dashboard: {}", lesson.id, e);
                continue;
            }
        };
        let eligibility = match student_eligibility(&storage, &lesson, user.id, now).await {
            Ok(eligibility) => eligibility,
            Err(e) => return Ok(error_response(&e, "判定签到窗口失败")),
        };
        let Some(session_date) = session_for_today(&schedule, &eligibility, today, *now.offset())
        else {
            continue;
        };

        let record = match storage
            .find_attendance_record(lesson.id, user.id, session_date)
            .await
        {
            Ok(record) => record,
            Err(e) => return Ok(error_response(&e, "获取考勤记录失败")),
        };

        lessons.push(StudentLessonToday {
            lesson,
            eligibility,
            record,
        });
    }

    let totals = match storage.attendance_totals_for_student(user.id).await {
        Ok(totals) => totals,
        Err(e) => return Ok(error_response(&e, "统计考勤失败")),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        StudentDashboardResponse {
            date: today,
            lessons,
            totals,
        },
        "Dashboard retrieved successfully",
    )))
}
