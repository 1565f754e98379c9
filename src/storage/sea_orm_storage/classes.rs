//! 班级存储操作

use super::{SeaOrmStorage, write_error};
use crate::entity::attendance_records::{
    Column as RecordColumn, Entity as AttendanceRecords,
};
use crate::entity::classes::{ActiveModel, Column, Entity as Classes};
use crate::entity::lessons::{Column as LessonColumn, Entity as Lessons};
use crate::entity::users::{Column as UserColumn, Entity as Users};
use crate::errors::{Result, RollcallError};
use crate::models::{
    PaginationInfo,
    classes::{
        entities::Class,
        requests::{ClassListQuery, CreateClassRequest, UpdateClassRequest},
        responses::ClassListResponse,
    },
    common::pagination::normalize_page,
    users::entities::{User, UserRole},
};
use crate::utils::contains_like;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set, TransactionTrait,
};

impl SeaOrmStorage {
    /// 创建班级
    pub async fn create_class_impl(&self, req: CreateClassRequest) -> Result<Class> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            name: Set(req.name),
            department_id: Set(req.department_id),
            level_id: Set(req.level_id),
            description: Set(req.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建班级", "班级名称已存在"))?;

        Ok(result.into_class())
    }

    /// 通过 ID 获取班级
    pub async fn get_class_by_id_impl(&self, class_id: i64) -> Result<Option<Class>> {
        let result = Classes::find_by_id(class_id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级失败: {e}")))?;

        Ok(result.map(|m| m.into_class()))
    }

    /// 分页列出班级
    pub async fn list_classes_with_pagination_impl(
        &self,
        query: ClassListQuery,
    ) -> Result<ClassListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Classes::find();

        if let Some(department_id) = query.department_id {
            select = select.filter(Column::DepartmentId.eq(department_id));
        }

        if let Some(level_id) = query.level_id {
            select = select.filter(Column::LevelId.eq(level_id));
        }

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            select = select.filter(Column::Name.like(contains_like(search.trim())));
        }

        let paginator = select
            .order_by_asc(Column::Name)
            .paginate(&self.db, size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级页数失败: {e}")))?;

        let classes = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级列表失败: {e}")))?;

        Ok(ClassListResponse {
            pagination: PaginationInfo::new(page, size, total, pages),
            items: classes.into_iter().map(|m| m.into_class()).collect(),
        })
    }

    /// 更新班级信息
    pub async fn update_class_impl(
        &self,
        class_id: i64,
        update: UpdateClassRequest,
    ) -> Result<Option<Class>> {
        let Some(existing) = Classes::find_by_id(class_id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();

        if let Some(name) = update.name {
            model.name = Set(name);
        }

        if let Some(department_id) = update.department_id {
            model.department_id = Set(department_id);
        }

        if let Some(level_id) = update.level_id {
            model.level_id = Set(level_id);
        }

        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }

        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "更新班级", "班级名称已存在"))?;

        Ok(Some(updated.into_class()))
    }

    /// 删除班级
    ///
    /// 同一事务内删除该班级的课程及其考勤记录，并把学生移出班级。
    pub async fn delete_class_impl(&self, class_id: i64) -> Result<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| RollcallError::database_operation(format!("开启事务失败: {e}")))?;

        let lesson_ids = Lessons::find()
            .select_only()
            .column(LessonColumn::Id)
            .filter(LessonColumn::ClassId.eq(class_id))
            .into_query();

        AttendanceRecords::delete_many()
            .filter(RecordColumn::LessonId.in_subquery(lesson_ids))
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除班级考勤记录失败: {e}")))?;

        Lessons::delete_many()
            .filter(LessonColumn::ClassId.eq(class_id))
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除班级课程失败: {e}")))?;

        Users::update_many()
            .col_expr(UserColumn::ClassId, Expr::value(Option::<i64>::None))
            .filter(UserColumn::ClassId.eq(class_id))
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("移出班级学生失败: {e}")))?;

        let result = Classes::delete_by_id(class_id)
            .exec(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("删除班级失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| RollcallError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(result.rows_affected > 0)
    }

    /// 班级学生名单，按学号排序
    pub async fn list_class_students_impl(&self, class_id: i64) -> Result<Vec<User>> {
        let students = Users::find()
            .filter(UserColumn::ClassId.eq(class_id))
            .filter(UserColumn::Role.eq(UserRole::Student.to_string()))
            .order_by_asc(UserColumn::StudentNumber)
            .order_by_asc(UserColumn::Id)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询班级学生失败: {e}")))?;

        Ok(students.into_iter().map(|m| m.into_user()).collect())
    }

    pub async fn count_class_students_impl(&self, class_id: i64) -> Result<u64> {
        Users::find()
            .filter(UserColumn::ClassId.eq(class_id))
            .filter(UserColumn::Role.eq(UserRole::Student.to_string()))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计班级人数失败: {e}")))
    }

    pub async fn count_classes_impl(&self) -> Result<u64> {
        Classes::find()
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计班级数量失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_user};
    use crate::errors::RollcallError;
    use crate::models::{
        classes::requests::{ClassListQuery, CreateClassRequest, UpdateClassRequest},
        users::entities::UserRole,
    };
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_class_roster_only_lists_students() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "五班").await;
        seed_user(&storage, "zoe", UserRole::Student, Some(class.id)).await;
        seed_user(&storage, "amy", UserRole::Student, Some(class.id)).await;
        seed_user(&storage, "tom", UserRole::Teacher, Some(class.id)).await;

        let roster = storage.list_class_students(class.id).await.unwrap();
        let names: Vec<_> = roster.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["amy", "zoe"]);
        assert_eq!(storage.count_class_students(class.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_class_name_unique_and_bad_reference() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "六班").await;

        let err = storage
            .create_class(CreateClassRequest {
                name: "六班".to_string(),
                department_id: class.department_id,
                level_id: class.level_id,
                description: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Conflict(_)));

        let err = storage
            .update_class(
                class.id,
                UpdateClassRequest {
                    name: None,
                    department_id: Some(9999),
                    level_id: None,
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_class_detaches_students() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "七班").await;
        let student = seed_user(&storage, "kim", UserRole::Student, Some(class.id)).await;

        assert!(storage.delete_class(class.id).await.unwrap());
        let student = storage.get_user_by_id(student.id).await.unwrap().unwrap();
        assert_eq!(student.class_id, None);

        let list = storage
            .list_classes_with_pagination(ClassListQuery::default())
            .await
            .unwrap();
        assert_eq!(list.pagination.total, 0);
    }
}
