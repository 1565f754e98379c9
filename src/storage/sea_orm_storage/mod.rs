//! SeaORM 存储实现
//!
//! 统一的数据库存储层，支持 SQLite、PostgreSQL 和 MySQL。

mod attendance;
mod backups;
mod classes;
mod departments;
mod lessons;
mod levels;
mod system_settings;
mod users;

use crate::config::AppConfig;
use crate::errors::{Result, RollcallError};
use crate::utils::sql::{is_foreign_key_violation, is_unique_violation};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::info;

/// SeaORM 存储实现
#[derive(Clone)]
pub struct SeaOrmStorage {
    pub(crate) db: DatabaseConnection,
}

impl SeaOrmStorage {
    /// 创建新的 SeaORM 存储实例
    pub async fn new_async() -> Result<Self> {
        let config = AppConfig::get();
        let db_url = Self::build_database_url(&config.database.url)?;

        // 根据数据库类型选择连接方式
        let db = if db_url.starts_with("sqlite:") {
            Self::connect_sqlite(&db_url, config).await?
        } else {
            Self::connect_generic(&db_url, config).await?
        };

        // 运行迁移
        Migrator::up(&db, None)
            .await
            .map_err(|e| RollcallError::database_operation(format!("数据库迁移失败: {e}")))?;

        info!("SeaORM 存储初始化完成，数据库: {}", db_url);

        Ok(Self { db })
    }

    /// 使用已有连接（迁移需由调用方完成）
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// SQLite 专用连接（WAL + pragma 优化）
    async fn connect_sqlite(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        use sea_orm::SqlxSqliteConnector;
        use sea_orm::sqlx::sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
        };
        use std::str::FromStr;

        // 外键约束默认开启，删除院系/年级依赖它拒绝仍被引用的记录
        let opt = SqliteConnectOptions::from_str(url)
            .map_err(|e| RollcallError::database_config(format!("SQLite URL 解析失败: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .pragma("cache_size", "-64000")
            .pragma("temp_store", "memory");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.database.pool_size)
            .min_connections(1)
            .test_before_acquire(true)
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(300))
            .connect_with(opt)
            .await
            .map_err(|e| RollcallError::database_connection(format!("SQLite 连接失败: {e}")))?;

        Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
    }

    /// 通用连接（PostgreSQL、MySQL 等）
    async fn connect_generic(url: &str, config: &AppConfig) -> Result<DatabaseConnection> {
        let mut opt = ConnectOptions::new(url);
        opt.max_connections(config.database.pool_size)
            .min_connections(2)
            .connect_timeout(Duration::from_secs(config.database.timeout))
            .acquire_timeout(Duration::from_secs(config.database.timeout))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false)
            .sqlx_logging_level(tracing::log::LevelFilter::Debug);

        Database::connect(opt)
            .await
            .map_err(|e| RollcallError::database_connection(format!("无法连接到数据库: {e}")))
    }

    /// 从 URL 自动推断数据库类型并构建连接 URL
    fn build_database_url(url: &str) -> Result<String> {
        if url.starts_with("sqlite:") {
            Ok(url.to_string())
        } else if url.ends_with(".db") || url.ends_with(".sqlite") {
            Ok(format!("sqlite://{url}?mode=rwc"))
        } else if url == ":memory:" {
            Ok("sqlite::memory:".to_string())
        } else if url.starts_with("postgres://")
            || url.starts_with("postgresql://")
            || url.starts_with("mysql://")
            || url.starts_with("mariadb://")
        {
            Ok(url.to_string())
        } else {
            Err(RollcallError::database_config(format!(
                "无法从 URL 推断数据库类型: {url}. 支持: sqlite://, postgres://, mysql://, 或 .db/.sqlite 文件路径"
            )))
        }
    }
}

/// 写操作错误映射：唯一约束冲突转为 Conflict，外键失败转为 Validation
pub(super) fn write_error(e: DbErr, action: &str, conflict: &str) -> RollcallError {
    let message = e.to_string();
    if is_unique_violation(&message) {
        RollcallError::conflict(conflict)
    } else if is_foreign_key_violation(&message) {
        RollcallError::validation(format!("{action}失败: 关联的数据不存在或仍被引用"))
    } else {
        RollcallError::database_operation(format!("{action}失败: {message}"))
    }
}

// Storage trait 实现
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
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::NaiveDate;

#[async_trait]
impl Storage for SeaOrmStorage {
    // 用户模块
    async fn create_user(&self, user: CreateUserRequest) -> Result<User> {
        self.create_user_impl(user).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.get_user_by_id_impl(id).await
    }

    async fn get_user_by_username_or_email(&self, identifier: &str) -> Result<Option<User>> {
        self.get_user_by_username_or_email_impl(identifier).await
    }

    async fn list_users_with_pagination(&self, query: UserListQuery) -> Result<UserListResponse> {
        self.list_users_with_pagination_impl(query).await
    }

    async fn list_users_for_export(
        &self,
        role: Option<UserRole>,
        class_id: Option<i64>,
    ) -> Result<Vec<User>> {
        self.list_users_for_export_impl(role, class_id).await
    }

    async fn update_last_login(&self, id: i64) -> Result<bool> {
        self.update_last_login_impl(id).await
    }

    async fn update_user(&self, id: i64, update: UpdateUserRequest) -> Result<Option<User>> {
        self.update_user_impl(id, update).await
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        self.delete_user_impl(id).await
    }

    async fn count_users_by_role(&self, role: UserRole) -> Result<u64> {
        self.count_users_by_role_impl(role).await
    }

    // 院系模块
    async fn create_department(&self, req: CreateDepartmentRequest) -> Result<Department> {
        self.create_department_impl(req).await
    }

    async fn get_department_by_id(&self, id: i64) -> Result<Option<Department>> {
        self.get_department_by_id_impl(id).await
    }

    async fn list_departments_with_pagination(
        &self,
        query: DepartmentListQuery,
    ) -> Result<DepartmentListResponse> {
        self.list_departments_with_pagination_impl(query).await
    }

    async fn update_department(
        &self,
        id: i64,
        update: UpdateDepartmentRequest,
    ) -> Result<Option<Department>> {
        self.update_department_impl(id, update).await
    }

    async fn delete_department(&self, id: i64) -> Result<bool> {
        self.delete_department_impl(id).await
    }

    async fn count_departments(&self) -> Result<u64> {
        self.count_departments_impl().await
    }

    // 年级模块
    async fn create_level(&self, req: CreateLevelRequest) -> Result<Level> {
        self.create_level_impl(req).await
    }

    async fn get_level_by_id(&self, id: i64) -> Result<Option<Level>> {
        self.get_level_by_id_impl(id).await
    }

    async fn list_levels(&self) -> Result<Vec<Level>> {
        self.list_levels_impl().await
    }

    async fn update_level(&self, id: i64, update: UpdateLevelRequest) -> Result<Option<Level>> {
        self.update_level_impl(id, update).await
    }

    async fn delete_level(&self, id: i64) -> Result<bool> {
        self.delete_level_impl(id).await
    }

    async fn count_levels(&self) -> Result<u64> {
        self.count_levels_impl().await
    }

    // 班级模块
    async fn create_class(&self, class: CreateClassRequest) -> Result<Class> {
        self.create_class_impl(class).await
    }

    async fn get_class_by_id(&self, class_id: i64) -> Result<Option<Class>> {
        self.get_class_by_id_impl(class_id).await
    }

    async fn list_classes_with_pagination(
        &self,
        query: ClassListQuery,
    ) -> Result<ClassListResponse> {
        self.list_classes_with_pagination_impl(query).await
    }

    async fn update_class(
        &self,
        class_id: i64,
        update: UpdateClassRequest,
    ) -> Result<Option<Class>> {
        self.update_class_impl(class_id, update).await
    }

    async fn delete_class(&self, class_id: i64) -> Result<bool> {
        self.delete_class_impl(class_id).await
    }

    async fn list_class_students(&self, class_id: i64) -> Result<Vec<User>> {
        self.list_class_students_impl(class_id).await
    }

    async fn count_class_students(&self, class_id: i64) -> Result<u64> {
        self.count_class_students_impl(class_id).await
    }

    async fn count_classes(&self) -> Result<u64> {
        self.count_classes_impl().await
    }

    // 课程模块
    async fn create_lesson(&self, lesson: NewLesson) -> Result<Lesson> {
        self.create_lesson_impl(lesson).await
    }

    async fn get_lesson_by_id(&self, id: i64) -> Result<Option<Lesson>> {
        self.get_lesson_by_id_impl(id).await
    }

    async fn list_lessons_with_pagination(
        &self,
        query: LessonListQuery,
    ) -> Result<PaginatedResponse<Lesson>> {
        self.list_lessons_with_pagination_impl(query).await
    }

    async fn list_active_lessons_for_class(&self, class_id: i64) -> Result<Vec<Lesson>> {
        self.list_active_lessons_for_class_impl(class_id).await
    }

    async fn list_active_lessons_for_teacher(&self, teacher_id: i64) -> Result<Vec<Lesson>> {
        self.list_active_lessons_for_teacher_impl(teacher_id).await
    }

    async fn update_lesson(&self, id: i64, changes: LessonChanges) -> Result<Option<Lesson>> {
        self.update_lesson_impl(id, changes).await
    }

    async fn delete_lesson(&self, id: i64) -> Result<bool> {
        self.delete_lesson_impl(id).await
    }

    async fn count_lessons(&self) -> Result<u64> {
        self.count_lessons_impl().await
    }

    // 考勤模块
    async fn create_attendance_record(&self, record: AttendanceUpsert) -> Result<AttendanceRecord> {
        self.create_attendance_record_impl(record).await
    }

    async fn upsert_attendance_record(
        &self,
        record: AttendanceUpsert,
    ) -> Result<(AttendanceRecord, bool)> {
        self.upsert_attendance_record_impl(record).await
    }

    async fn bulk_upsert_attendance(
        &self,
        records: Vec<AttendanceUpsert>,
    ) -> Result<UpsertSummary> {
        self.bulk_upsert_attendance_impl(records).await
    }

    async fn get_attendance_record_by_id(&self, id: i64) -> Result<Option<AttendanceRecord>> {
        self.get_attendance_record_by_id_impl(id).await
    }

    async fn find_attendance_record(
        &self,
        lesson_id: i64,
        student_id: i64,
        session_date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>> {
        self.find_attendance_record_impl(lesson_id, student_id, session_date)
            .await
    }

    async fn list_session_records(
        &self,
        lesson_id: i64,
        session_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>> {
        self.list_session_records_impl(lesson_id, session_date).await
    }

    async fn list_marked_session_dates(
        &self,
        lesson_id: i64,
        student_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        self.list_marked_session_dates_impl(lesson_id, student_id, from, to)
            .await
    }

    async fn list_attendance_with_pagination(
        &self,
        query: AttendanceListQuery,
    ) -> Result<AttendanceListResponse> {
        self.list_attendance_with_pagination_impl(query).await
    }

    async fn list_attendance_for_export(
        &self,
        class_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceExportRow>> {
        self.list_attendance_for_export_impl(class_id, from, to).await
    }

    async fn delete_attendance_record(&self, id: i64) -> Result<bool> {
        self.delete_attendance_record_impl(id).await
    }

    async fn attendance_totals_for_student(&self, student_id: i64) -> Result<AttendanceTotals> {
        self.attendance_totals_for_student_impl(student_id).await
    }

    async fn count_attendance_on_date(&self, session_date: NaiveDate) -> Result<u64> {
        self.count_attendance_on_date_impl(session_date).await
    }

    // 系统设置模块
    async fn list_all_settings(&self) -> Result<Vec<SystemSetting>> {
        self.list_all_settings_impl().await
    }

    async fn get_setting_by_key(&self, key: &str) -> Result<Option<SystemSetting>> {
        self.get_setting_by_key_impl(key).await
    }

    async fn update_setting(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting> {
        self.update_setting_impl(key, value, user_id, ip_address)
            .await
    }

    async fn list_setting_audits(
        &self,
        query: SettingAuditQuery,
    ) -> Result<SettingAuditListResponse> {
        self.list_setting_audits_impl(query).await
    }

    // 备份模块
    async fn dump_tables(&self) -> Result<Vec<(String, serde_json::Value)>> {
        self.dump_tables_impl().await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! 存储层测试用的内存数据库与种子数据

    use super::SeaOrmStorage;
    use crate::models::{
        classes::{entities::Class, requests::CreateClassRequest},
        lessons::entities::{Lesson, LessonKind, NewLesson},
        departments::{entities::Department, requests::CreateDepartmentRequest},
        levels::{entities::Level, requests::CreateLevelRequest},
        users::{
            entities::{User, UserRole},
            requests::CreateUserRequest,
        },
    };
    use crate::storage::Storage;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ConnectOptions, Database};

    /// 单连接的内存 SQLite，保证所有查询看到同一个数据库
    pub async fn memory_storage() -> SeaOrmStorage {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        SeaOrmStorage::from_connection(db)
    }

    pub async fn seed_department(storage: &SeaOrmStorage, code: &str) -> Department {
        storage
            .create_department(CreateDepartmentRequest {
                name: format!("{code} 学院"),
                code: code.to_string(),
                description: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_level(storage: &SeaOrmStorage, name: &str, rank: i32) -> Level {
        storage
            .create_level(CreateLevelRequest {
                name: name.to_string(),
                rank,
                description: None,
            })
            .await
            .unwrap()
    }

    /// 新建院系 + 年级 + 班级
    pub async fn seed_class(storage: &SeaOrmStorage, name: &str) -> Class {
        let department = seed_department(storage, &format!("D-{name}")).await;
        let level = seed_level(storage, &format!("L-{name}"), 1).await;
        storage
            .create_class(CreateClassRequest {
                name: name.to_string(),
                department_id: department.id,
                level_id: level.id,
                description: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_weekly_lesson(
        storage: &SeaOrmStorage,
        class_id: i64,
        teacher_id: i64,
        day_of_week: i32,
        start_minute: i32,
    ) -> Lesson {
        storage
            .create_lesson(NewLesson {
                class_id,
                teacher_id,
                subject: "数学".to_string(),
                room: Some("A101".to_string()),
                kind: LessonKind::Scheduled,
                day_of_week: Some(day_of_week),
                start_minute: Some(start_minute),
                starts_at: None,
                duration_minutes: 45,
                attendance_window_minutes: None,
            })
            .await
            .unwrap()
    }

    pub async fn seed_user(
        storage: &SeaOrmStorage,
        username: &str,
        role: UserRole,
        class_id: Option<i64>,
    ) -> User {
        let student_number =
            (role == UserRole::Student).then(|| format!("S{}", username.to_uppercase()));
        storage
            .create_user(CreateUserRequest {
                username: username.to_string(),
                email: format!("{username}@school.test"),
                password: "hashed".to_string(),
                role,
                display_name: Some(username.to_string()),
                student_number,
                class_id,
                department_id: None,
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_database_url() {
        assert_eq!(
            SeaOrmStorage::build_database_url("rollcall.db").unwrap(),
            "sqlite://rollcall.db?mode=rwc"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url(":memory:").unwrap(),
            "sqlite::memory:"
        );
        assert_eq!(
            SeaOrmStorage::build_database_url("postgres://u:p@localhost/rc").unwrap(),
            "postgres://u:p@localhost/rc"
        );
        assert!(SeaOrmStorage::build_database_url("ftp://nowhere").is_err());
    }

    #[test]
    fn test_write_error_mapping() {
        let err = write_error(
            DbErr::Custom("UNIQUE constraint failed: levels.name".to_string()),
            "创建年级",
            "年级名称已存在",
        );
        assert!(matches!(err, RollcallError::Conflict(_)));

        let err = write_error(
            DbErr::Custom("FOREIGN KEY constraint failed".to_string()),
            "创建班级",
            "班级名称已存在",
        );
        assert!(matches!(err, RollcallError::Validation(_)));

        let err = write_error(DbErr::Custom("disk I/O error".to_string()), "创建班级", "");
        assert!(matches!(err, RollcallError::DatabaseOperation(_)));
    }
}
