//! 考勤记录存储实现
//!
//! 每个 (课程, 学生, 课次日期) 至多一条记录，由唯一索引保证。

use std::collections::HashMap;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use super::{SeaOrmStorage, write_error};
use crate::entity::attendance_records::{
    ActiveModel, Column, Entity as AttendanceRecords, Model, Relation,
};
use crate::entity::lessons::{Column as LessonColumn, Entity as Lessons};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{Result, RollcallError};
use crate::models::{
    PaginationInfo,
    attendance::{
        entities::{
            AttendanceExportRow, AttendanceRecord, AttendanceStatus, AttendanceUpsert,
            UpsertSummary,
        },
        requests::AttendanceListQuery,
        responses::AttendanceListResponse,
    },
    common::pagination::normalize_page,
    dashboard::responses::AttendanceTotals,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 查找 (课程, 学生, 日期) 对应的记录
async fn find_one<C: ConnectionTrait>(
    conn: &C,
    lesson_id: i64,
    student_id: i64,
    session_date: NaiveDate,
) -> Result<Option<Model>> {
    AttendanceRecords::find()
        .filter(Column::LessonId.eq(lesson_id))
        .filter(Column::StudentId.eq(student_id))
        .filter(Column::SessionDate.eq(date_key(session_date)))
        .one(conn)
        .await
        .map_err(|e| RollcallError::database_operation(format!("查询考勤记录失败: {e}")))
}

/// 插入或覆盖一条记录，返回 (记录, 是否新建)
async fn upsert_one<C: ConnectionTrait>(
    conn: &C,
    record: AttendanceUpsert,
    now: i64,
) -> Result<(Model, bool)> {
    let existing = find_one(
        conn,
        record.lesson_id,
        record.student_id,
        record.session_date,
    )
    .await?;

    match existing {
        Some(existing) => {
            let mut model: ActiveModel = existing.into();
            model.status = Set(record.status.to_string());
            model.source = Set(record.source.to_string());
            model.marked_by = Set(record.marked_by);
            model.note = Set(record.note);
            model.updated_at = Set(now);

            let updated = model
                .update(conn)
                .await
                .map_err(|e| write_error(e, "更新考勤记录", "考勤记录已存在"))?;
            Ok((updated, false))
        }
        None => {
            let created = new_active_model(record, now)
                .insert(conn)
                .await
                .map_err(|e| write_error(e, "创建考勤记录", "该课次已有考勤记录"))?;
            Ok((created, true))
        }
    }
}

fn new_active_model(record: AttendanceUpsert, now: i64) -> ActiveModel {
    ActiveModel {
        lesson_id: Set(record.lesson_id),
        student_id: Set(record.student_id),
        session_date: Set(date_key(record.session_date)),
        status: Set(record.status.to_string()),
        source: Set(record.source.to_string()),
        marked_by: Set(record.marked_by),
        note: Set(record.note),
        marked_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

impl SeaOrmStorage {
    /// 仅插入，已存在时返回 Conflict（学生自助签到使用）
    pub async fn create_attendance_record_impl(
        &self,
        record: AttendanceUpsert,
    ) -> Result<AttendanceRecord> {
        let now = chrono::Utc::now().timestamp();

        let created = new_active_model(record, now)
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建考勤记录", "该课次已签到"))?;

        Ok(created.into_record())
    }

    pub async fn upsert_attendance_record_impl(
        &self,
        record: AttendanceUpsert,
    ) -> Result<(AttendanceRecord, bool)> {
        let now = chrono::Utc::now().timestamp();
        let (model, created) = upsert_one(&self.db, record, now).await?;
        Ok((model.into_record(), created))
    }

    /// 批量写入，任一条失败则整体回滚
    pub async fn bulk_upsert_attendance_impl(
        &self,
        records: Vec<AttendanceUpsert>,
    ) -> Result<UpsertSummary> {
        let now = chrono::Utc::now().timestamp();
        let mut summary = UpsertSummary::default();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| RollcallError::database_operation(format!("开启事务失败: {e}")))?;

        for record in records {
            let (_, created) = upsert_one(&txn, record, now).await?;
            if created {
                summary.created += 1;
            } else {
                summary.updated += 1;
            }
        }

        txn.commit()
            .await
            .map_err(|e| RollcallError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(summary)
    }

    pub async fn get_attendance_record_by_id_impl(
        &self,
        id: i64,
    ) -> Result<Option<AttendanceRecord>> {
        let result = AttendanceRecords::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询考勤记录失败: {e}")))?;

        Ok(result.map(|m| m.into_record()))
    }

    pub async fn find_attendance_record_impl(
        &self,
        lesson_id: i64,
        student_id: i64,
        session_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        let result = find_one(&self.db, lesson_id, student_id, session_date).await?;
        Ok(result.map(|m| m.into_record()))
    }

    /// 某课次的全部记录
    pub async fn list_session_records_impl(
        &self,
        lesson_id: i64,
        session_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        let records = AttendanceRecords::find()
            .filter(Column::LessonId.eq(lesson_id))
            .filter(Column::SessionDate.eq(date_key(session_date)))
            .order_by_asc(Column::StudentId)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课次考勤失败: {e}")))?;

        Ok(records.into_iter().map(|m| m.into_record()).collect())
    }

    pub async fn list_marked_session_dates_impl(
        &self,
        lesson_id: i64,
        student_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        // YYYY-MM-DD 字符串的字典序与日期顺序一致
        let dates: Vec<String> = AttendanceRecords::find()
            .select_only()
            .column(Column::SessionDate)
            .filter(Column::LessonId.eq(lesson_id))
            .filter(Column::StudentId.eq(student_id))
            .filter(Column::SessionDate.between(date_key(from), date_key(to)))
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询签到日期失败: {e}")))?;

        Ok(dates
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
            .collect())
    }

    /// 分页列出考勤记录
    pub async fn list_attendance_with_pagination_impl(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = AttendanceRecords::find();

        // 班级与教师条件需要关联课程表
        if query.class_id.is_some() || query.teacher_id.is_some() {
            select = select.join(sea_orm::JoinType::InnerJoin, Relation::Lesson.def());

            if let Some(class_id) = query.class_id {
                select = select.filter(LessonColumn::ClassId.eq(class_id));
            }

            if let Some(teacher_id) = query.teacher_id {
                select = select.filter(LessonColumn::TeacherId.eq(teacher_id));
            }
        }

        if let Some(lesson_id) = query.lesson_id {
            select = select.filter(Column::LessonId.eq(lesson_id));
        }

        if let Some(student_id) = query.student_id {
            select = select.filter(Column::StudentId.eq(student_id));
        }

        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        if let Some(from) = query.from {
            select = select.filter(Column::SessionDate.gte(date_key(from)));
        }

        if let Some(to) = query.to {
            select = select.filter(Column::SessionDate.lte(date_key(to)));
        }

        let paginator = select
            .order_by_desc(Column::SessionDate)
            .order_by_desc(Column::Id)
            .paginate(&self.db, size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询考勤总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询考勤页数失败: {e}")))?;

        let records = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询考勤列表失败: {e}")))?;

        Ok(AttendanceListResponse {
            items: records.into_iter().map(|m| m.into_record()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 导出班级在日期范围内的考勤，附带课程与学生信息
    pub async fn list_attendance_for_export_impl(
        &self,
        class_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceExportRow>> {
        let records = AttendanceRecords::find()
            .join(sea_orm::JoinType::InnerJoin, Relation::Lesson.def())
            .filter(LessonColumn::ClassId.eq(class_id))
            .filter(Column::SessionDate.between(date_key(from), date_key(to)))
            .order_by_asc(Column::SessionDate)
            .order_by_asc(Column::LessonId)
            .order_by_asc(Column::StudentId)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询导出考勤失败: {e}")))?;

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let lesson_ids: Vec<i64> = records.iter().map(|r| r.lesson_id).collect();
        let student_ids: Vec<i64> = records.iter().map(|r| r.student_id).collect();

        let subjects: HashMap<i64, String> = Lessons::find()
            .filter(LessonColumn::Id.is_in(lesson_ids))
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询课程失败: {e}")))?
            .into_iter()
            .map(|l| (l.id, l.subject))
            .collect();

        let students: HashMap<i64, (Option<String>, String)> = Users::find()
            .filter(UserColumn::Id.is_in(student_ids))
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询学生失败: {e}")))?
            .into_iter()
            .map(|u| {
                let name = u.display_name.clone().unwrap_or_else(|| u.username.clone());
                (u.id, (u.student_number, name))
            })
            .collect();

        Ok(records
            .into_iter()
            .map(|model| {
                let subject = subjects.get(&model.lesson_id).cloned().unwrap_or_default();
                let (student_number, student_name) = students
                    .get(&model.student_id)
                    .cloned()
                    .unwrap_or_default();
                let record = model.into_record();
                AttendanceExportRow {
                    session_date: record.session_date,
                    lesson_id: record.lesson_id,
                    subject,
                    student_id: record.student_id,
                    student_number,
                    student_name,
                    status: record.status,
                    source: record.source,
                    note: record.note,
                    marked_at: record.marked_at,
                }
            })
            .collect())
    }

    pub async fn delete_attendance_record_impl(&self, id: i64) -> Result<bool> {
        let result = AttendanceRecords::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除考勤记录失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 学生各状态的记录数
    pub async fn attendance_totals_for_student_impl(
        &self,
        student_id: i64,
    ) -> Result<AttendanceTotals> {
        let rows: Vec<(String, i64)> = AttendanceRecords::find()
            .select_only()
            .column(Column::Status)
            .column_as(Column::Id.count(), "total")
            .filter(Column::StudentId.eq(student_id))
            .group_by(Column::Status)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计考勤失败: {e}")))?;

        let mut totals = AttendanceTotals::default();
        for (status, count) in rows {
            match status.parse::<AttendanceStatus>() {
                Ok(AttendanceStatus::Present) => totals.present = count,
                Ok(AttendanceStatus::Late) => totals.late = count,
                Ok(AttendanceStatus::Absent) => totals.absent = count,
                Ok(AttendanceStatus::Excused) => totals.excused = count,
                Err(_) => {}
            }
        }

        Ok(totals)
    }

    pub async fn count_attendance_on_date_impl(&self, session_date: NaiveDate) -> Result<u64> {
        AttendanceRecords::find()
            .filter(Column::SessionDate.eq(date_key(session_date)))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计考勤失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_user, seed_weekly_lesson};
    use super::super::SeaOrmStorage;
    use crate::errors::RollcallError;
    use crate::models::{
        attendance::{
            entities::{AttendanceSource, AttendanceStatus, AttendanceUpsert},
            requests::AttendanceListQuery,
        },
        lessons::entities::Lesson,
        users::entities::{User, UserRole},
    };
    use crate::storage::Storage;
    use chrono::NaiveDate;

    struct Fixture {
        storage: SeaOrmStorage,
        lesson: Lesson,
        teacher: User,
        students: Vec<User>,
    }

    async fn fixture() -> Fixture {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "高一1班").await;
        let teacher = seed_user(&storage, "teacher", UserRole::Teacher, None).await;
        let mut students = Vec::new();
        for name in ["s1", "s2", "s3"] {
            students.push(seed_user(&storage, name, UserRole::Student, Some(class.id)).await);
        }
        let lesson = seed_weekly_lesson(&storage, class.id, teacher.id, 1, 480).await;
        Fixture {
            storage,
            lesson,
            teacher,
            students,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    fn entry(
        lesson: &Lesson,
        student: &User,
        marked_by: i64,
        day: u32,
        status: AttendanceStatus,
        source: AttendanceSource,
    ) -> AttendanceUpsert {
        AttendanceUpsert {
            lesson_id: lesson.id,
            student_id: student.id,
            session_date: date(day),
            status,
            source,
            marked_by,
            note: None,
        }
    }

    #[tokio::test]
    async fn test_self_mark_only_once_per_session() {
        let f = fixture().await;
        let student = &f.students[0];
        let mark = entry(
            &f.lesson,
            student,
            student.id,
            1,
            AttendanceStatus::Present,
            AttendanceSource::SelfMark,
        );

        let record = f.storage.create_attendance_record(mark.clone()).await.unwrap();
        assert_eq!(record.session_date, date(1));
        assert_eq!(record.source, AttendanceSource::SelfMark);

        let err = f.storage.create_attendance_record(mark).await.unwrap_err();
        assert!(matches!(err, RollcallError::Conflict(_)));

        // 下一周的同一课程是新的课次
        f.storage
            .create_attendance_record(entry(
                &f.lesson,
                student,
                student.id,
                8,
                AttendanceStatus::Late,
                AttendanceSource::SelfMark,
            ))
            .await
            .unwrap();

        let dates = f
            .storage
            .list_marked_session_dates(f.lesson.id, student.id, date(1), date(30))
            .await
            .unwrap();
        assert_eq!(dates, vec![date(1), date(8)]);
    }

    #[tokio::test]
    async fn test_override_replaces_existing_record() {
        let f = fixture().await;
        let student = &f.students[1];

        let (first, created) = f
            .storage
            .upsert_attendance_record(entry(
                &f.lesson,
                student,
                student.id,
                1,
                AttendanceStatus::Late,
                AttendanceSource::SelfMark,
            ))
            .await
            .unwrap();
        assert!(created);

        let (second, created) = f
            .storage
            .upsert_attendance_record(AttendanceUpsert {
                note: Some("病假条已提交".to_string()),
                ..entry(
                    &f.lesson,
                    student,
                    f.teacher.id,
                    1,
                    AttendanceStatus::Excused,
                    AttendanceSource::Teacher,
                )
            })
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.status, AttendanceStatus::Excused);
        assert_eq!(second.marked_by, f.teacher.id);
        assert_eq!(second.note.as_deref(), Some("病假条已提交"));
    }

    #[tokio::test]
    async fn test_bulk_upsert_counts_and_session_listing() {
        let f = fixture().await;
        f.storage
            .create_attendance_record(entry(
                &f.lesson,
                &f.students[0],
                f.students[0].id,
                1,
                AttendanceStatus::Present,
                AttendanceSource::SelfMark,
            ))
            .await
            .unwrap();

        let batch = f
            .students
            .iter()
            .map(|s| {
                entry(
                    &f.lesson,
                    s,
                    f.teacher.id,
                    1,
                    AttendanceStatus::Absent,
                    AttendanceSource::Bulk,
                )
            })
            .collect();
        let summary = f.storage.bulk_upsert_attendance(batch).await.unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.updated, 1);

        let session = f
            .storage
            .list_session_records(f.lesson.id, date(1))
            .await
            .unwrap();
        assert_eq!(session.len(), 3);
        assert!(
            session
                .iter()
                .all(|r| r.status == AttendanceStatus::Absent && r.source == AttendanceSource::Bulk)
        );
        assert_eq!(f.storage.count_attendance_on_date(date(1)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bulk_upsert_rolls_back_on_failed_row() {
        let f = fixture().await;
        let valid = entry(
            &f.lesson,
            &f.students[0],
            f.teacher.id,
            1,
            AttendanceStatus::Present,
            AttendanceSource::Bulk,
        );
        // 不存在的学生，外键约束失败
        let dangling = AttendanceUpsert {
            student_id: 999_999,
            ..valid.clone()
        };

        let result = f.storage.bulk_upsert_attendance(vec![valid, dangling]).await;
        assert!(result.is_err());

        let session = f
            .storage
            .list_session_records(f.lesson.id, date(1))
            .await
            .unwrap();
        assert!(session.is_empty());
    }

    #[tokio::test]
    async fn test_list_filters_and_totals() {
        let f = fixture().await;
        let student = &f.students[2];
        for (day, status) in [
            (1, AttendanceStatus::Present),
            (8, AttendanceStatus::Late),
            (15, AttendanceStatus::Present),
        ] {
            f.storage
                .upsert_attendance_record(entry(
                    &f.lesson,
                    student,
                    f.teacher.id,
                    day,
                    status,
                    AttendanceSource::Teacher,
                ))
                .await
                .unwrap();
        }

        let by_class = f
            .storage
            .list_attendance_with_pagination(AttendanceListQuery {
                class_id: Some(f.lesson.class_id),
                from: Some(date(2)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_class.pagination.total, 2);
        assert_eq!(by_class.items[0].session_date, date(15));

        let other_teacher = f
            .storage
            .list_attendance_with_pagination(AttendanceListQuery {
                teacher_id: Some(f.teacher.id + 100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(other_teacher.pagination.total, 0);

        let totals = f
            .storage
            .attendance_totals_for_student(student.id)
            .await
            .unwrap();
        assert_eq!(totals.present, 2);
        assert_eq!(totals.late, 1);
        assert_eq!(totals.absent, 0);

        let rows = f
            .storage
            .list_attendance_for_export(f.lesson.class_id, date(1), date(8))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, "数学");
        assert_eq!(rows[0].student_number.as_deref(), Some("SS3"));
    }

    #[tokio::test]
    async fn test_deleting_lesson_removes_records() {
        let f = fixture().await;
        let record = f
            .storage
            .create_attendance_record(entry(
                &f.lesson,
                &f.students[0],
                f.students[0].id,
                1,
                AttendanceStatus::Present,
                AttendanceSource::SelfMark,
            ))
            .await
            .unwrap();

        assert!(f.storage.delete_lesson(f.lesson.id).await.unwrap());
        assert!(
            f.storage
                .get_attendance_record_by_id(record.id)
                .await
                .unwrap()
                .is_none()
        );
    }
}
