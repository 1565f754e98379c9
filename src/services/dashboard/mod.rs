//! 按角色返回首页数据

pub mod admin;
pub mod student;
pub mod teacher;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::{FixedOffset, NaiveDate};
use std::sync::Arc;

use crate::middlewares::RequireJWT;
use crate::models::{attendance::entities::Eligibility, users::entities::UserRole};
use crate::services::attendance::{LessonSchedule, occurs_on, unauthorized};
use crate::storage::Storage;

pub struct DashboardService {
    storage: Option<Arc<dyn Storage>>,
}

impl DashboardService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => crate::services::storage_from_request(request),
        }
    }

    /// 按当前用户的角色选择首页
    pub async fn get_dashboard(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        match RequireJWT::extract_user_role(request) {
            Some(UserRole::Student) => self.student(request).await,
            Some(UserRole::Teacher) => self.teacher(request).await,
            Some(UserRole::Admin) => self.admin(request).await,
            None => Ok(unauthorized()),
        }
    }

    pub async fn student(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        student::student_dashboard(self, &user, request).await
    }

    pub async fn teacher(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        let Some(user) = RequireJWT::extract_user_claims(request) else {
            return Ok(unauthorized());
        };
        teacher::teacher_dashboard(self, &user, request).await
    }

    pub async fn admin(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        admin::admin_dashboard(self, request).await
    }
}

/// 今天要展示的课次日期
///
/// 窗口开放时取窗口所属课次（可能是跨零点的昨天的课），
/// 否则只有今天有课才展示。
pub(crate) fn session_for_today(
    schedule: &LessonSchedule,
    eligibility: &Eligibility,
    today: NaiveDate,
    offset: FixedOffset,
) -> Option<NaiveDate> {
    eligibility
        .open_session()
        .or_else(|| occurs_on(schedule, today, offset).then_some(today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc, Weekday};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    // 2026-10-19 是周一
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn weekly(weekday: Weekday) -> LessonSchedule {
        LessonSchedule::Weekly {
            weekday,
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_lesson_today_is_shown() {
        assert_eq!(
            session_for_today(&weekly(Weekday::Mon), &Eligibility::NotToday, monday(), offset()),
            Some(monday())
        );
        assert_eq!(
            session_for_today(&weekly(Weekday::Tue), &Eligibility::NotToday, monday(), offset()),
            None
        );
    }

    #[test]
    fn test_open_window_from_yesterday_is_shown() {
        let sunday = monday().pred_opt().unwrap();
        let eligibility = Eligibility::AlreadyMarked {
            session_date: sunday,
            closes_at: Utc.with_ymd_and_hms(2026, 10, 18, 16, 30, 0).unwrap(),
        };
        assert_eq!(
            session_for_today(&weekly(Weekday::Sun), &eligibility, monday(), offset()),
            Some(sunday)
        );
    }
}
