pub mod bulk;
pub mod delete;
pub mod eligibility;
pub mod export;
pub mod list;
pub mod mark;
pub mod overrides;
pub mod roster;

pub use eligibility::{
    LessonSchedule, WindowPolicy, disabled_reason, evaluate, latest_session_date, occurs_on,
};

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

use crate::errors::{Result, RollcallError};
use crate::models::{
    ApiResponse, ErrorCode,
    attendance::{
        entities::Eligibility,
        requests::{
            AttendanceExportParams, AttendanceListParams, BulkAttendanceRequest,
            MarkAttendanceRequest, OverrideAttendanceRequest, SessionQuery,
        },
    },
    lessons::entities::Lesson,
    users::entities::{User, UserRole},
};
use crate::services::system::DynamicConfig;
use crate::storage::Storage;

pub struct AttendanceService {
    storage: Option<Arc<dyn Storage>>,
}

impl AttendanceService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => crate::services::storage_from_request(request),
        }
    }

    // 学生自助签到
    pub async fn mark(
        &self,
        req: MarkAttendanceRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        mark::mark_attendance(self, req, request).await
    }

    // 学生查看某课程的签到状态
    pub async fn eligibility(
        &self,
        lesson_id: i64,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        mark::get_eligibility(self, lesson_id, request).await
    }

    // 教师修改单个学生考勤
    pub async fn override_record(
        &self,
        lesson_id: i64,
        student_id: i64,
        req: OverrideAttendanceRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        overrides::override_attendance(self, lesson_id, student_id, req, request).await
    }

    // 批量录入
    pub async fn bulk(
        &self,
        lesson_id: i64,
        req: BulkAttendanceRequest,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        bulk::bulk_attendance(self, lesson_id, req, request).await
    }

    // 课次点名表
    pub async fn roster(
        &self,
        lesson_id: i64,
        query: SessionQuery,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        roster::lesson_roster(self, lesson_id, query, request).await
    }

    pub async fn list(
        &self,
        params: AttendanceListParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        list::list_attendance(self, params, request).await
    }

    pub async fn delete(&self, record_id: i64, request: &HttpRequest) -> ActixResult<HttpResponse> {
        delete::delete_attendance(self, record_id, request).await
    }

    pub async fn export(
        &self,
        params: AttendanceExportParams,
        request: &HttpRequest,
    ) -> ActixResult<HttpResponse> {
        export::export_attendance(self, params, request).await
    }
}

/// 学校时区下的当前时刻
pub(crate) async fn school_now() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&DynamicConfig::school_offset().await)
}

/// 按当前系统设置生成课程的窗口策略
pub(crate) async fn policy_for(lesson: &Lesson) -> WindowPolicy {
    WindowPolicy::for_lesson(
        lesson,
        DynamicConfig::attendance_window_minutes().await,
        DynamicConfig::late_after_minutes().await,
    )
}

/// 课程的上课安排；数据不完整时视为无效课程
pub(crate) fn schedule_of(lesson: &Lesson) -> Result<LessonSchedule> {
    LessonSchedule::from_lesson(lesson)
        .ok_or_else(|| RollcallError::validation(format!("课程 {} 的时间安排不完整", lesson.id)))
}

/// 某学生对某课程的签到状态
///
/// 自助签到、课程详情、学生课程列表和仪表盘共用这一结果。
pub(crate) async fn student_eligibility(
    storage: &Arc<dyn Storage>,
    lesson: &Lesson,
    student_id: i64,
    now: DateTime<FixedOffset>,
) -> Result<Eligibility> {
    let allow_self_mark = DynamicConfig::allow_self_mark().await;
    let policy = policy_for(lesson).await;
    eligibility_with(storage, lesson, student_id, now, allow_self_mark, &policy).await
}

/// 先检查开关，再不带已签记录判定一次，窗口开放时才查询该课次是否已有记录
async fn eligibility_with(
    storage: &Arc<dyn Storage>,
    lesson: &Lesson,
    student_id: i64,
    now: DateTime<FixedOffset>,
    allow_self_mark: bool,
    policy: &WindowPolicy,
) -> Result<Eligibility> {
    if let Some(reason) = disabled_reason(lesson.active, allow_self_mark) {
        return Ok(Eligibility::Disabled { reason });
    }

    let schedule = schedule_of(lesson)?;
    let eligibility = evaluate(&schedule, policy, now, &[]);
    let Some(session_date) = eligibility.open_session() else {
        return Ok(eligibility);
    };

    let marked = storage
        .list_marked_session_dates(lesson.id, student_id, session_date, session_date)
        .await?;
    if marked.is_empty() {
        Ok(eligibility)
    } else {
        Ok(evaluate(&schedule, policy, now, &marked))
    }
}

/// 课程的任课教师或管理员才能管理考勤
pub(crate) fn can_manage_lesson(user: &User, lesson: &Lesson) -> bool {
    user.role == UserRole::Admin || lesson.teacher_id == user.id
}

/// 读取课程并检查管理权限，失败时直接给出响应
pub(crate) async fn load_managed_lesson(
    storage: &Arc<dyn Storage>,
    lesson_id: i64,
    user: &User,
) -> std::result::Result<Lesson, HttpResponse> {
    let lesson = match storage.get_lesson_by_id(lesson_id).await {
        Ok(Some(lesson)) => lesson,
        Ok(None) => {
            return Err(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::LessonNotFound,
                "Lesson not found",
            )));
        }
        Err(e) => return Err(crate::services::error_response(&e, "获取课程失败")),
    };

    if !can_manage_lesson(user, &lesson) {
        return Err(HttpResponse::Forbidden().json(ApiResponse::error_empty(
            ErrorCode::LessonPermissionDenied,
            "Only the lesson's teacher or an admin can manage this lesson",
        )));
    }

    Ok(lesson)
}

/// 未登录时的统一响应
pub(crate) fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::error_empty(
        ErrorCode::Unauthorized,
        "Unauthorized: missing user information",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::entities::{AttendanceStatus, DisabledReason};
    use crate::models::lessons::entities::LessonKind;
    use crate::models::users::entities::UserStatus;
    use crate::storage::sea_orm_storage::test_support::memory_storage;

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

    fn lesson(teacher_id: i64) -> Lesson {
        Lesson {
            id: 1,
            class_id: 1,
            teacher_id,
            subject: "语文".to_string(),
            room: None,
            kind: LessonKind::Instant,
            day_of_week: None,
            start_time: None,
            starts_at: Some(Utc::now()),
            duration_minutes: 45,
            attendance_window_minutes: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_owner_or_admin_manages_lesson() {
        let lesson = lesson(2);
        assert!(can_manage_lesson(&user(2, UserRole::Teacher), &lesson));
        assert!(can_manage_lesson(&user(9, UserRole::Admin), &lesson));
        assert!(!can_manage_lesson(&user(3, UserRole::Teacher), &lesson));
    }

    #[test]
    fn test_schedule_of_incomplete_lesson_is_validation_error() {
        let broken = Lesson {
            starts_at: None,
            ..lesson(2)
        };
        assert!(matches!(
            schedule_of(&broken),
            Err(RollcallError::Validation(_))
        ));
    }

    async fn eligibility_of(lesson: &Lesson, allow_self_mark: bool) -> Eligibility {
        let storage: Arc<dyn Storage> = Arc::new(memory_storage().await);
        let policy = WindowPolicy {
            window_minutes: 15,
            late_after_minutes: 5,
        };
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(8 * 3600).unwrap());
        eligibility_with(&storage, lesson, 7, now, allow_self_mark, &policy)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_lesson_starting_now() {
        let eligibility = eligibility_of(&lesson(2), true).await;
        assert!(matches!(
            eligibility,
            Eligibility::Open {
                status: AttendanceStatus::Present,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_inactive_lesson_is_not_open() {
        let inactive = Lesson {
            active: false,
            ..lesson(2)
        };
        let eligibility = eligibility_of(&inactive, true).await;
        assert!(!eligibility.is_open());
        assert_eq!(
            eligibility,
            Eligibility::Disabled {
                reason: DisabledReason::LessonInactive
            }
        );
    }

    #[tokio::test]
    async fn test_self_mark_switch_off_is_not_open() {
        let eligibility = eligibility_of(&lesson(2), false).await;
        assert!(!eligibility.is_open());
        assert_eq!(eligibility.open_session(), None);
        assert_eq!(
            eligibility,
            Eligibility::Disabled {
                reason: DisabledReason::SelfMarkDisabled
            }
        );
    }
}
