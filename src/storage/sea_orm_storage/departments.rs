//! 院系存储实现

use super::{SeaOrmStorage, write_error};
use crate::entity::classes::{Column as ClassColumn, Entity as Classes};
use crate::entity::departments::{ActiveModel, Column, Entity as Departments};
use crate::errors::{Result, RollcallError};
use crate::models::{
    PaginationInfo,
    common::pagination::normalize_page,
    departments::{
        entities::Department,
        requests::{CreateDepartmentRequest, DepartmentListQuery, UpdateDepartmentRequest},
        responses::DepartmentListResponse,
    },
};
use crate::utils::contains_like;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};

impl SeaOrmStorage {
    pub async fn create_department_impl(&self, req: CreateDepartmentRequest) -> Result<Department> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            name: Set(req.name),
            code: Set(req.code),
            description: Set(req.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建院系", "院系名称或代码已存在"))?;

        Ok(result.into_department())
    }

    pub async fn get_department_by_id_impl(&self, id: i64) -> Result<Option<Department>> {
        let result = Departments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询院系失败: {e}")))?;

        Ok(result.map(|m| m.into_department()))
    }

    pub async fn list_departments_with_pagination_impl(
        &self,
        query: DepartmentListQuery,
    ) -> Result<DepartmentListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut select = Departments::find();

        if let Some(ref search) = query.search
            && !search.trim().is_empty()
        {
            let pattern = contains_like(search.trim());
            select = select.filter(
                Condition::any()
                    .add(Column::Name.like(pattern.clone()))
                    .add(Column::Code.like(pattern)),
            );
        }

        let paginator = select.order_by_asc(Column::Code).paginate(&self.db, size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询院系总数失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询院系页数失败: {e}")))?;

        let departments = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询院系列表失败: {e}")))?;

        Ok(DepartmentListResponse {
            items: departments
                .into_iter()
                .map(|m| m.into_department())
                .collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }

    pub async fn update_department_impl(
        &self,
        id: i64,
        update: UpdateDepartmentRequest,
    ) -> Result<Option<Department>> {
        let Some(existing) = Departments::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询院系失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();

        if let Some(name) = update.name {
            model.name = Set(name);
        }

        if let Some(code) = update.code {
            model.code = Set(code);
        }

        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }

        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "更新院系", "院系名称或代码已存在"))?;

        Ok(Some(updated.into_department()))
    }

    /// 删除院系，院系下仍有班级时返回 Conflict
    pub async fn delete_department_impl(&self, id: i64) -> Result<bool> {
        let class_count = Classes::find()
            .filter(ClassColumn::DepartmentId.eq(id))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计院系班级失败: {e}")))?;

        if class_count > 0 {
            return Err(RollcallError::conflict(format!(
                "院系下仍有 {class_count} 个班级，无法删除"
            )));
        }

        let result = Departments::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| write_error(e, "删除院系", "院系仍被引用"))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_departments_impl(&self) -> Result<u64> {
        Departments::find()
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计院系数量失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_department};
    use crate::errors::RollcallError;
    use crate::models::departments::requests::{DepartmentListQuery, UpdateDepartmentRequest};
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_department_crud() {
        let storage = memory_storage().await;
        let cs = seed_department(&storage, "CS").await;
        seed_department(&storage, "EE").await;

        let list = storage
            .list_departments_with_pagination(DepartmentListQuery::default())
            .await
            .unwrap();
        assert_eq!(list.pagination.total, 2);
        assert_eq!(list.items[0].code, "CS");

        let updated = storage
            .update_department(
                cs.id,
                UpdateDepartmentRequest {
                    name: Some("计算机学院".to_string()),
                    code: None,
                    description: Some("信息楼".to_string()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "计算机学院");
        assert_eq!(updated.code, "CS");

        assert!(storage.delete_department(cs.id).await.unwrap());
        assert!(storage.get_department_by_id(cs.id).await.unwrap().is_none());
        assert_eq!(storage.count_departments().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() {
        let storage = memory_storage().await;
        let cs = seed_department(&storage, "CS").await;
        let ee = seed_department(&storage, "EE").await;

        let err = storage
            .update_department(
                ee.id,
                UpdateDepartmentRequest {
                    name: None,
                    code: Some(cs.code.clone()),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_department_with_classes_cannot_be_deleted() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "三班").await;

        let err = storage
            .delete_department(class.department_id)
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::Conflict(_)));
    }
}
