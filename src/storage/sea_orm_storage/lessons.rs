//! 课程存储实现

use super::{SeaOrmStorage, write_error};
use crate::entity::attendance_records::{
    Column as RecordColumn, Entity as AttendanceRecords,
};
use crate::entity::lessons::{ActiveModel, Column, Entity as Lessons};
use crate::errors::{Result, RollcallError};
use crate::models::{
    PaginationInfo,
    common::{PaginatedResponse, pagination::normalize_page},
    lessons::{
        entities::{Lesson, LessonChanges, NewLesson},
        requests::LessonListQuery,
    },
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

impl SeaOrmStorage {
    pub async fn create_lesson_impl(&self, lesson: NewLesson) -> Result<Lesson> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            class_id: Set(lesson.class_id),
            teacher_id: Set(lesson.teacher_id),
            subject: Set(lesson.subject),
            room: Set(lesson.room),
            kind: Set(lesson.kind.to_string()),
            day_of_week: Set(lesson.day_of_week),
            start_minute: Set(lesson.start_minute),
            starts_at: Set(lesson.starts_at),
            duration_minutes: Set(lesson.duration_minutes),
            attendance_window_minutes: Set(lesson.attendance_window_minutes),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建课程", "课程已存在"))?;

        Ok(result.into_lesson())
    }

    pub async fn get_lesson_by_id_impl(&self, id: i64) -> Result<Option<Lesson>> {
        let result = Lessons::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程失败: {e}")))?;

        Ok(result.map(|m| m.into_lesson()))
    }

    /// 分页列出课程，按星期与开始时间排序
    pub async fn list_lessons_with_pagination_impl(
        &self,
        query: LessonListQuery,
    ) -> Result<PaginatedResponse<Lesson>> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Lessons::find();

        if let Some(class_id) = query.class_id {
            select = select.filter(Column::ClassId.eq(class_id));
        }

        if let Some(teacher_id) = query.teacher_id {
            select = select.filter(Column::TeacherId.eq(teacher_id));
        }

        if let Some(day_of_week) = query.day_of_week {
            select = select.filter(Column::DayOfWeek.eq(day_of_week));
        }

        if let Some(kind) = query.kind {
            select = select.filter(Column::Kind.eq(kind.to_string()));
        }

        if let Some(active) = query.active {
            select = select.filter(Column::Active.eq(active));
        }

        let paginator = select
            .order_by_asc(Column::DayOfWeek)
            .order_by_asc(Column::StartMinute)
            .order_by_desc(Column::StartsAt)
            .order_by_asc(Column::Id)
            .paginate(&self.db, size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程页数失败: {e}")))?;

        let lessons = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(PaginatedResponse {
            items: lessons.into_iter().map(|m| m.into_lesson()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn list_active_lessons_for_class_impl(&self, class_id: i64) -> Result<Vec<Lesson>> {
        self.list_active_lessons(Column::ClassId.eq(class_id)).await
    }

    pub async fn list_active_lessons_for_teacher_impl(
        &self,
        teacher_id: i64,
    ) -> Result<Vec<Lesson>> {
        self.list_active_lessons(Column::TeacherId.eq(teacher_id))
            .await
    }

    async fn list_active_lessons(
        &self,
        condition: impl sea_orm::sea_query::IntoCondition + Send,
    ) -> Result<Vec<Lesson>> {
        let lessons = Lessons::find()
            .filter(condition)
            .filter(Column::Active.eq(true))
            .order_by_asc(Column::StartMinute)
            .order_by_asc(Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程列表失败: {e}")))?;

        Ok(lessons.into_iter().map(|m| m.into_lesson()).collect())
    }

    pub async fn update_lesson_impl(
        &self,
        id: i64,
        changes: LessonChanges,
    ) -> Result<Option<Lesson>> {
        let Some(existing) = Lessons::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();

        if let Some(subject) = changes.subject {
            model.subject = Set(subject);
        }

        if let Some(room) = changes.room {
            model.room = Set(Some(room));
        }

        if let Some(day_of_week) = changes.day_of_week {
            model.day_of_week = Set(Some(day_of_week));
        }

        if let Some(start_minute) = changes.start_minute {
            model.start_minute = Set(Some(start_minute));
        }

        if let Some(duration) = changes.duration_minutes {
            model.duration_minutes = Set(duration);
        }

        // Some(None) 表示恢复使用全局默认窗口
        if let Some(window) = changes.attendance_window_minutes {
            model.attendance_window_minutes = Set(window);
        }

        if let Some(active) = changes.active {
            model.active = Set(active);
        }

        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "更新课程", "课程已存在"))?;

        Ok(Some(updated.into_lesson()))
    }

    /// 删除课程及其全部考勤记录
    pub async fn delete_lesson_impl(&self, id: i64) -> Result<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| RollcallError::database_operation(format!("开启事务失败: {e}")))?;

        AttendanceRecords::delete_many()
            .filter(RecordColumn::LessonId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除课程考勤记录失败: {e}")))?;

        let result = Lessons::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除课程失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| RollcallError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_lessons_impl(&self) -> Result<u64> {
        Lessons::find()
            .filter(Column::Active.eq(true))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计课程数量失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_user, seed_weekly_lesson};
    use crate::models::{
        lessons::{
            entities::{LessonChanges, LessonKind},
            requests::LessonListQuery,
        },
        users::entities::UserRole,
    };
    use crate::storage::Storage;
    use chrono::NaiveTime;

    #[tokio::test]
    async fn test_create_weekly_lesson_roundtrips_start_time() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "八班").await;
        let teacher = seed_user(&storage, "lee", UserRole::Teacher, None).await;

        let lesson = seed_weekly_lesson(&storage, class.id, teacher.id, 1, 8 * 60 + 30).await;
        assert_eq!(lesson.kind, LessonKind::Scheduled);
        assert_eq!(lesson.start_time, NaiveTime::from_hms_opt(8, 30, 0));
        assert!(lesson.active);
    }

    #[tokio::test]
    async fn test_list_and_filter_lessons() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "九班").await;
        let teacher = seed_user(&storage, "wang", UserRole::Teacher, None).await;
        let other = seed_user(&storage, "zhao", UserRole::Teacher, None).await;

        seed_weekly_lesson(&storage, class.id, teacher.id, 3, 600).await;
        seed_weekly_lesson(&storage, class.id, teacher.id, 1, 480).await;
        let inactive = seed_weekly_lesson(&storage, class.id, other.id, 1, 540).await;
        storage
            .update_lesson(
                inactive.id,
                LessonChanges {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let all = storage
            .list_lessons_with_pagination(LessonListQuery::default())
            .await
            .unwrap();
        assert_eq!(all.pagination.total, 3);
        assert_eq!(all.items[0].day_of_week, Some(1));

        let mine = storage
            .list_lessons_with_pagination(LessonListQuery {
                teacher_id: Some(teacher.id),
                day_of_week: Some(3),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.items.len(), 1);

        let active = storage
            .list_active_lessons_for_class(class.id)
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert!(
            storage
                .list_active_lessons_for_teacher(other.id)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_update_window_set_and_clear() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "十班").await;
        let teacher = seed_user(&storage, "liu", UserRole::Teacher, None).await;
        let lesson = seed_weekly_lesson(&storage, class.id, teacher.id, 2, 600).await;

        let updated = storage
            .update_lesson(
                lesson.id,
                LessonChanges {
                    attendance_window_minutes: Some(Some(20)),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.attendance_window_minutes, Some(20));

        let cleared = storage
            .update_lesson(
                lesson.id,
                LessonChanges {
                    attendance_window_minutes: Some(None),
                    subject: Some("物理".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cleared.attendance_window_minutes, None);
        assert_eq!(cleared.subject, "物理");

        assert!(storage.delete_lesson(lesson.id).await.unwrap());
        assert!(storage.get_lesson_by_id(lesson.id).await.unwrap().is_none());
    }
}
