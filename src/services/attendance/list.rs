use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::{AttendanceService, unauthorized};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse,
    attendance::requests::{AttendanceListParams, AttendanceListQuery},
    users::entities::{User, UserRole},
};
use crate::services::error_response;

/// 按角色收窄查询范围：学生只看自己，教师只看自己任课的课程
fn scope_query(mut query: AttendanceListQuery, user: &User) -> AttendanceListQuery {
    match user.role {
        UserRole::Student => query.student_id = Some(user.id),
        UserRole::Teacher => query.teacher_id = Some(user.id),
        UserRole::Admin => {}
    }
    query
}

pub async fn list_attendance(
    service: &AttendanceService,
    params: AttendanceListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let storage = service.get_storage(request)?;
    let query = scope_query(params.into(), &user);

    match storage.list_attendance_with_pagination(query).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(
            response,
            "Attendance records retrieved successfully",
        ))),
        Err(e) => Ok(error_response(&e, "获取考勤记录失败")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserStatus;
    use chrono::Utc;

    fn user(id: i64, role: UserRole) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@school.test"),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            display_name: None,
            student_number: None,
            class_id: None,
            department_id: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_student_cannot_widen_scope() {
        let query = AttendanceListQuery {
            student_id: Some(99),
            ..Default::default()
        };
        let scoped = scope_query(query, &user(5, UserRole::Student));
        assert_eq!(scoped.student_id, Some(5));
        assert_eq!(scoped.teacher_id, None);
    }

    #[test]
    fn test_teacher_limited_to_own_lessons() {
        let scoped = scope_query(Default::default(), &user(7, UserRole::Teacher));
        assert_eq!(scoped.teacher_id, Some(7));
        assert_eq!(scoped.student_id, None);
    }

    #[test]
    fn test_admin_sees_everything() {
        let query = AttendanceListQuery {
            class_id: Some(3),
            ..Default::default()
        };
        let scoped = scope_query(query, &user(1, UserRole::Admin));
        assert_eq!(scoped.class_id, Some(3));
        assert_eq!(scoped.teacher_id, None);
        assert_eq!(scoped.student_id, None);
    }
}
