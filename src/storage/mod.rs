pub mod sea_orm_storage;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use crate::errors::Result;
use crate::models::{
    attendance::{
        entities::{AttendanceExportRow, AttendanceRecord, AttendanceUpsert, UpsertSummary},
        requests::AttendanceListQuery,
        responses::AttendanceListResponse,
    },
    classes::{
        entities::Class,
        requests::{ClassListQuery, CreateClassRequest, UpdateClassRequest},
        responses::ClassListResponse,
    },
    common::PaginatedResponse,
    dashboard::responses::AttendanceTotals,
    departments::{
        entities::Department,
        requests::{CreateDepartmentRequest, DepartmentListQuery, UpdateDepartmentRequest},
        responses::DepartmentListResponse,
    },
    lessons::{
        entities::{Lesson, LessonChanges, NewLesson},
        requests::LessonListQuery,
    },
    levels::{
        entities::Level,
        requests::{CreateLevelRequest, UpdateLevelRequest},
    },
    system::{
        entities::SystemSetting, requests::SettingAuditQuery, responses::SettingAuditListResponse,
    },
    users::{
        entities::{User, UserRole},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};

#[async_trait]
pub trait Storage: Send + Sync {
    // 用户管理方法
    // 创建用户时 password 字段为已哈希的密码
    async fn create_user(&self, user: CreateUserRequest) -> Result<User>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>>;
    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse>;
    // 不分页，用于导出
    async fn list_users_for_export(
        &self,
        role: Option<UserRole>,
        class_id: Option<i64>,
    ) -> Result<Vec<User>>;
    async fn update_last_login(&self, id: i64) -> Result<bool>;
    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>>;
    async fn delete_user(&self, id: i64) -> Result<bool>;
    async fn count_users_by_role(&self, role: UserRole) -> Result<u64>;

    // 院系
    async fn create_department(&self, req: CreateDepartmentRequest) -> Result<Department>;
    async fn get_department_by_id(&self, id: i64) -> Result<Option<Department>>;
    async fn list_departments_with_pagination(
        &self,
        query: DepartmentListQuery,
    ) -> Result<DepartmentListResponse>;
    async fn update_department(
        &self,
        id: i64,
        update: UpdateDepartmentRequest,
    ) -> Result<Option<Department>>;
    async fn delete_department(&self, id: i64) -> Result<bool>;
    async fn count_departments(&self) -> Result<u64>;

    // 年级
    async fn create_level(&self, req: CreateLevelRequest) -> Result<Level>;
    async fn get_level_by_id(&self, id: i64) -> Result<Option<Level>>;
    async fn list_levels(&self) -> Result<Vec<Level>>;
    async fn update_level(&self, id: i64, update: UpdateLevelRequest) -> Result<Option<Level>>;
    async fn delete_level(&self, id: i64) -> Result<bool>;
    async fn count_levels(&self) -> Result<u64>;

    // 班级
    async fn create_class(&self, class: CreateClassRequest) -> Result<Class>;
    async fn get_class_by_id(&self, class_id: i64) -> Result<Option<Class>>;
    async fn list_classes_with_pagination(&self, query: ClassListQuery)
    -> Result<ClassListResponse>;
    async fn update_class(&self, class_id: i64, update: UpdateClassRequest)
    -> Result<Option<Class>>;
    async fn delete_class(&self, class_id: i64) -> Result<bool>;
    async fn list_class_students(&self, class_id: i64) -> Result<Vec<User>>;
    async fn count_class_students(&self, class_id: i64) -> Result<u64>;
    async fn count_classes(&self) -> Result<u64>;

    // 课程
    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson>;
    async fn get_lesson_by_id(&self, id: i64) -> Result<Option<Lesson>>;
    async fn list_lessons_with_pagination(
        &self,
        query: LessonListQuery,
    ) -> Result<PaginatedResponse<Lesson>>;
    async fn list_active_lessons_for_class(&self, class_id: i64) -> Result<Vec<Lesson>>;
    async fn list_active_lessons_for_teacher(&self, teacher_id: i64) -> Result<Vec<Lesson>>;
    async fn update_lesson(&self, id: i64, changes: LessonChanges) -> Result<Option<Lesson>>;
    async fn delete_lesson(&self, id: i64) -> Result<bool>;
    async fn count_lessons(&self) -> Result<u64>;

    // 考勤记录
    // 仅插入，同一课次已有记录时返回 Conflict
    async fn create_attendance_record(&self, record: AttendanceUpsert) -> Result<AttendanceRecord>;
    // 插入或覆盖，返回记录及是否为新建
    async fn upsert_attendance_record(
        &self,
        record: AttendanceUpsert,
    ) -> Result<(AttendanceRecord, bool)>;
    // 在同一事务中写入多条记录
    async fn bulk_upsert_attendance(&self, records: Vec<AttendanceUpsert>)
    -> Result<UpsertSummary>;
    async fn get_attendance_record_by_id(&self, id: i64) -> Result<Option<AttendanceRecord>>;
    async fn find_attendance_record(
        &self,
        lesson_id: i64,
        student_id: i64,
        session_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>>;
    async fn list_session_records(
        &self,
        lesson_id: i64,
        session_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>>;
    // 学生在某课程 [from, to] 内已有记录的日期
    async fn list_marked_session_dates(
        &self,
        lesson_id: i64,
        student_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>>;
    async fn list_attendance_with_pagination(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse>;
    async fn list_attendance_for_export(
        &self,
        class_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceExportRow>>;
    async fn delete_attendance_record(&self, id: i64) -> Result<bool>;
    async fn attendance_totals_for_student(&self, student_id: i64) -> Result<AttendanceTotals>;
    async fn count_attendance_on_date(&self, session_date: NaiveDate) -> Result<u64>;

    // 系统设置
    async fn list_all_settings(&self) -> Result<Vec<SystemSetting>>;
    async fn get_setting_by_key(&self, key: &str) -> Result<Option<SystemSetting>>;
    async fn update_setting(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting>;
    async fn list_setting_audits(&self, query: SettingAuditQuery)
    -> Result<SettingAuditListResponse>;

    // 备份：按表导出全部数据（表名, JSON 数组）
    async fn dump_tables(&self) -> Result<Vec<(String, serde_json::Value)>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
