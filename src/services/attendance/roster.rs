use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::collections::HashMap;

use super::overrides::resolve_session_date;
use super::{AttendanceService, load_managed_lesson, unauthorized};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse,
    attendance::{
        requests::SessionQuery,
        responses::{LessonRosterResponse, RosterEntry},
    },
};
use crate::services::error_response;

/// 某课次的班级点名表：班级每个学生及其考勤记录（可能没有）
pub async fn lesson_roster(
    service: &AttendanceService,
    lesson_id: i64,
    query: SessionQuery,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;

    let lesson = match load_managed_lesson(&storage, lesson_id, &user).await {
        Ok(lesson) => lesson,
        Err(response) => return Ok(response),
    };

    let session_date = match resolve_session_date(&lesson, query.session_date).await {
        Ok(date) => date,
        Err(response) => return Ok(response),
    };

    let students = match storage.list_class_students(lesson.class_id).await {
        Ok(students) => students,
        Err(e) => return Ok(error_response(&e, "获取班级名单失败")),
    };

    let mut records: HashMap<i64, _> = match storage
        .list_session_records(lesson_id, session_date)
        .await
    {
        Ok(records) => records.into_iter().map(|r| (r.student_id, r)).collect(),
        Err(e) => return Ok(error_response(&e, "获取课次考勤失败")),
    };

    let entries = students
        .into_iter()
        .map(|student| RosterEntry {
            record: records.remove(&student.id),
            student,
        })
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        LessonRosterResponse {
            lesson_id,
            session_date,
            entries,
        },
        "Roster retrieved successfully",
    )))
}
