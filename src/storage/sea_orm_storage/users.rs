use super::{SeaOrmStorage, write_error};
use crate::entity::attendance_records::{
    Column as RecordColumn, Entity as AttendanceRecords,
};
use crate::entity::lessons::{Column as LessonColumn, Entity as Lessons};
use crate::entity::users::{ActiveModel, Column, Entity as Users};
use crate::errors::{Result, RollcallError};
use crate::models::{
    PaginationInfo,
    common::pagination::normalize_page,
    users::{
        entities::{User, UserRole, UserStatus},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        responses::UserListResponse,
    },
};
use crate::utils::contains_like;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建用户
    pub async fn create_user_impl(&self, req: CreateUserRequest) -> Result<User> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            username: Set(req.username),
            email: Set(req.email),
            password_hash: Set(req.password),
            role: Set(req.role.to_string()),
            status: Set(UserStatus::Active.to_string()),
            display_name: Set(req.display_name),
            student_number: Set(req.student_number),
            class_id: Set(req.class_id),
            department_id: Set(req.department_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建用户", "用户名、邮箱或学号已存在"))?;

        Ok(result.into_user())
    }

    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 通过用户名或邮箱获取用户
    pub async fn get_user_by_username_or_email_impl(
        &self,
        identifier: &str,
    ) -> Result<Option<User>> {
        let result = Users::find()
            .filter(
                Condition::any()
                    .add(Column::Username.eq(identifier))
                    .add(Column::Email.eq(identifier)),
            )
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 分页列出用户
    pub async fn list_users_with_pagination_impl(
        &self,
        query: UserListQuery,
    ) -> Result<UserListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Users::find();

        // 搜索条件
        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let pattern = contains_like(search.trim());
            select = select.filter(
                Condition::any()
                    .add(Column::Username.like(pattern.clone()))
                    .add(Column::Email.like(pattern.clone()))
                    .add(Column::DisplayName.like(pattern.clone()))
                    .add(Column::StudentNumber.like(pattern)),
            );
        }

        if let Some(role) = query.role {
            select = select.filter(Column::Role.eq(role.to_string()));
        }

        if let Some(status) = query.status {
            select = select.filter(Column::Status.eq(status.to_string()));
        }

        if let Some(class_id) = query.class_id {
            select = select.filter(Column::ClassId.eq(class_id));
        }

        if let Some(department_id) = query.department_id {
            select = select.filter(Column::DepartmentId.eq(department_id));
        }

        select = select.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id);

        // 分页查询
        let paginator = select.paginate(&self.db, size);
        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户页数失败: {e}")))?;

        let users = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户列表失败: {e}")))?;

        Ok(UserListResponse {
            items: users.into_iter().map(|m| m.into_user()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    /// 列出用户（导出用，不分页）
    pub async fn list_users_for_export_impl(
        &self,
        role: Option<UserRole>,
        class_id: Option<i64>,
    ) -> Result<Vec<User>> {
        let mut select = Users::find();

        if let Some(role) = role {
            select = select.filter(Column::Role.eq(role.to_string()));
        }

        if let Some(class_id) = class_id {
            select = select.filter(Column::ClassId.eq(class_id));
        }

        let users = select
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询用户列表失败: {e}")))?;

        Ok(users.into_iter().map(|m| m.into_user()).collect())
    }

    /// 更新用户最后登录时间
    pub async fn update_last_login_impl(&self, id: i64) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();

        let result = Users::update_many()
            .col_expr(Column::LastLogin, sea_orm::sea_query::Expr::value(now))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(|e| {
                RollcallError::database_operation(format!("更新最后登录时间失败: {e}"))
            })?;

        Ok(result.rows_affected > 0)
    }

    /// 更新用户信息，password 字段为已哈希的密码
    pub async fn update_user_impl(
        &self,
        id: i64,
        update: UpdateUserRequest,
    ) -> Result<Option<User>> {
        // 先检查用户是否存在
        let existing = self.get_user_by_id_impl(id).await?;
        if existing.is_none() {
            return Ok(None);
        }

        let now = chrono::Utc::now().timestamp();

        let mut model = ActiveModel {
            id: Set(id),
            updated_at: Set(now),
            ..Default::default()
        };

        if let Some(email) = update.email {
            model.email = Set(email);
        }

        if let Some(password) = update.password {
            model.password_hash = Set(password);
        }

        if let Some(role) = update.role {
            model.role = Set(role.to_string());
        }

        if let Some(status) = update.status {
            model.status = Set(status.to_string());
        }

        if let Some(display_name) = update.display_name {
            model.display_name = Set(Some(display_name));
        }

        if let Some(student_number) = update.student_number {
            model.student_number = Set(Some(student_number));
        }

        if let Some(class_id) = update.class_id {
            model.class_id = Set(Some(class_id));
        }

        if let Some(department_id) = update.department_id {
            model.department_id = Set(Some(department_id));
        }

        model
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "更新用户", "邮箱或学号已被其他用户使用"))?;

        self.get_user_by_id_impl(id).await
    }

    /// 删除用户及其考勤记录，仍在任课的教师不能删除
    pub async fn delete_user_impl(&self, id: i64) -> Result<bool> {
        let lesson_count = Lessons::find()
            .filter(LessonColumn::TeacherId.eq(id))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计教师课程失败: {e}")))?;

        if lesson_count > 0 {
            return Err(RollcallError::conflict(format!(
                "该用户仍负责 {lesson_count} 门课程，请先转交或删除课程"
            )));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| RollcallError::database_operation(format!("开启事务失败: {e}")))?;

        AttendanceRecords::delete_many()
            .filter(RecordColumn::StudentId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除用户考勤记录失败: {e}")))?;

        let result = Users::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除用户失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| RollcallError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 按角色统计用户数量
    pub async fn count_users_by_role_impl(&self, role: UserRole) -> Result<u64> {
        let count = Users::find()
            .filter(Column::Role.eq(role.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计用户数量失败: {e}")))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_user};
    use crate::errors::RollcallError;
    use crate::models::users::{
        entities::{UserRole, UserStatus},
        requests::{CreateUserRequest, UpdateUserRequest, UserListQuery},
    };
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_create_and_lookup_user() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "一班").await;
        let user = seed_user(&storage, "alice", UserRole::Student, Some(class.id)).await;

        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.class_id, Some(class.id));

        let by_name = storage.get_user_by_username_or_email("alice").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(user.id));

        let by_email = storage
            .get_user_by_username_or_email("alice@school.test")
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(user.id));
        assert_eq!(user.student_number.as_deref(), Some("SALICE"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_conflict() {
        let storage = memory_storage().await;
        seed_user(&storage, "bob", UserRole::Teacher, None).await;

        let err = storage
            .create_user(CreateUserRequest {
                username: "bob".to_string(),
                email: "other@school.test".to_string(),
                password: "hashed".to_string(),
                role: UserRole::Teacher,
                display_name: None,
                student_number: None,
                class_id: None,
                department_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, RollcallError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_users_filters_and_search() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "二班").await;
        seed_user(&storage, "carol", UserRole::Student, Some(class.id)).await;
        seed_user(&storage, "dave", UserRole::Student, None).await;
        seed_user(&storage, "erin", UserRole::Teacher, None).await;

        let students = storage
            .list_users_with_pagination(UserListQuery {
                role: Some(UserRole::Student),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(students.pagination.total, 2);

        let in_class = storage
            .list_users_with_pagination(UserListQuery {
                class_id: Some(class.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_class.items.len(), 1);
        assert_eq!(in_class.items[0].username, "carol");

        // 通配符按字面匹配
        let wildcard = storage
            .list_users_with_pagination(UserListQuery {
                search: Some("%".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(wildcard.pagination.total, 0);

        let search = storage
            .list_users_with_pagination(UserListQuery {
                search: Some("ERIN".to_lowercase()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_user() {
        let storage = memory_storage().await;
        let user = seed_user(&storage, "frank", UserRole::Teacher, None).await;

        let updated = storage
            .update_user(
                user.id,
                UpdateUserRequest {
                    status: Some(UserStatus::Suspended),
                    display_name: Some("Frank".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, UserStatus::Suspended);
        assert_eq!(updated.display_name.as_deref(), Some("Frank"));

        assert!(
            storage
                .update_user(9999, UpdateUserRequest::default())
                .await
                .unwrap()
                .is_none()
        );

        assert!(storage.delete_user(user.id).await.unwrap());
        assert!(!storage.delete_user(user.id).await.unwrap());
        assert_eq!(
            storage.count_users_by_role(UserRole::Teacher).await.unwrap(),
            0
        );
    }
}
