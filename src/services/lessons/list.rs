use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::warn;

use super::LessonService;
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, PaginationInfo,
    lessons::{
        requests::{LessonListParams, LessonListQuery},
        responses::{LessonListItem, LessonListResponse},
    },
    users::entities::{User, UserRole},
};
use crate::services::attendance::{school_now, student_eligibility, unauthorized};
use crate::services::error_response;

/// 按角色收窄课程范围；学生没有班级时返回 None
fn scope_query(mut query: LessonListQuery, user: &User) -> Option<LessonListQuery> {
    match user.role {
        UserRole::Student => {
            query.class_id = Some(user.class_id?);
            query.active = Some(true);
        }
        UserRole::Teacher => query.teacher_id = Some(user.id),
        UserRole::Admin => {}
    }
    Some(query)
}

pub async fn list_lessons(
    service: &LessonService,
    params: LessonListParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    let requested: LessonListQuery = params.into();
    let Some(query) = scope_query(requested.clone(), &user) else {
        let (page, size) = crate::models::common::pagination::normalize_page(
            requested.page,
            requested.size,
        );
        return Ok(HttpResponse::Ok().json(ApiResponse::success(
            LessonListResponse {
                items: Vec::new(),
                pagination: PaginationInfo::new(page, size, 0, 0),
            },
            "Lessons retrieved successfully",
        )));
    };

    let storage = service.get_storage(request)?;

    let page = match storage.list_lessons_with_pagination(query).await {
        Ok(page) => page,
        Err(e) => return Ok(error_response(&e, "获取课程列表失败")),
    };

    let now = school_now().await;
    let mut items = Vec::with_capacity(page.items.len());
    for lesson in page.items {
        // 学生列表附带自己的签到状态
        let eligibility = if user.role == UserRole::Student {
            match student_eligibility(&storage, &lesson, user.id, now).await {
                Ok(eligibility) => Some(eligibility),
                Err(e) => {
                    warn!("Skipping eligibility of lesson {}: {}", lesson.id, e);
                    None
                }
            }
        } else {
            None
        };
        items.push(LessonListItem {
            lesson,
            eligibility,
        });
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        LessonListResponse {
            items,
            pagination: page.pagination,
        },
        "Lessons retrieved successfully",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::UserStatus;
    use chrono::Utc;

    fn user(id: i64, role: UserRole, class_id: Option<i64>) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@school.test"),
            password_hash: String::new(),
            role,
            status: UserStatus::Active,
            display_name: None,
            student_number: None,
            class_id,
            department_id: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_student_scoped_to_own_class_and_active() {
        let query = LessonListQuery {
            class_id: Some(42),
            active: Some(false),
            ..Default::default()
        };
        let scoped = scope_query(query, &user(5, UserRole::Student, Some(3))).unwrap();
        assert_eq!(scoped.class_id, Some(3));
        assert_eq!(scoped.active, Some(true));
    }

    #[test]
    fn test_student_without_class_sees_nothing() {
        assert!(scope_query(Default::default(), &user(5, UserRole::Student, None)).is_none());
    }

    #[test]
    fn test_teacher_scoped_to_own_lessons() {
        let scoped = scope_query(Default::default(), &user(7, UserRole::Teacher, None)).unwrap();
        assert_eq!(scoped.teacher_id, Some(7));
    }
}
