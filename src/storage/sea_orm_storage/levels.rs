//! 年级存储实现

use super::{SeaOrmStorage, write_error};
use crate::entity::classes::{Column as ClassColumn, Entity as Classes};
use crate::entity::levels::{ActiveModel, Column, Entity as Levels};
use crate::errors::{Result, RollcallError};
use crate::models::levels::{
    entities::Level,
    requests::{CreateLevelRequest, UpdateLevelRequest},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    pub async fn create_level_impl(&self, req: CreateLevelRequest) -> Result<Level> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            name: Set(req.name),
            rank: Set(req.rank),
            description: Set(req.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| write_error(e, "创建年级", "年级名称已存在"))?;

        Ok(result.into_level())
    }

    pub async fn get_level_by_id_impl(&self, id: i64) -> Result<Option<Level>> {
        let result = Levels::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询年级失败: {e}")))?;

        Ok(result.map(|m| m.into_level()))
    }

    /// 年级数量有限，直接按 rank 全量返回
    pub async fn list_levels_impl(&self) -> Result<Vec<Level>> {
        let levels = Levels::find()
            .order_by_asc(Column::Rank)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询年级列表失败: {e}")))?;

        Ok(levels.into_iter().map(|m| m.into_level()).collect())
    }

    pub async fn update_level_impl(
        &self,
        id: i64,
        update: UpdateLevelRequest,
    ) -> Result<Option<Level>> {
        let Some(existing) = Levels::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("查询年级失败: {e}")))?
        else {
            return Ok(None);
        };

        let mut model: ActiveModel = existing.into();

        if let Some(name) = update.name {
            model.name = Set(name);
        }

        if let Some(rank) = update.rank {
            model.rank = Set(rank);
        }

        if let Some(description) = update.description {
            model.description = Set(Some(description));
        }

        model.updated_at = Set(chrono::Utc::now().timestamp());

        let updated = model
            .update(&self.db)
            .await
            .map_err(|e| write_error(e, "更新年级", "年级名称已存在"))?;

        Ok(Some(updated.into_level()))
    }

    /// 删除年级，仍有班级引用时返回 Conflict
    pub async fn delete_level_impl(&self, id: i64) -> Result<bool> {
        let class_count = Classes::find()
            .filter(ClassColumn::LevelId.eq(id))
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计年级班级失败: {e}")))?;

        if class_count > 0 {
            return Err(RollcallError::conflict(format!(
                "该年级仍有 {class_count} 个班级，无法删除"
            )));
        }

        let result = Levels::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| write_error(e, "删除年级", "年级仍被引用"))?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count_levels_impl(&self) -> Result<u64> {
        Levels::find()
            .count(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计年级数量失败: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_level};
    use crate::errors::RollcallError;
    use crate::models::levels::requests::UpdateLevelRequest;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_levels_sorted_by_rank() {
        let storage = memory_storage().await;
        seed_level(&storage, "三年级", 3).await;
        seed_level(&storage, "一年级", 1).await;
        let second = seed_level(&storage, "二年级", 2).await;

        let names: Vec<_> = storage
            .list_levels()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["一年级", "二年级", "三年级"]);

        let moved = storage
            .update_level(
                second.id,
                UpdateLevelRequest {
                    name: None,
                    rank: Some(10),
                    description: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.rank, 10);
        assert_eq!(storage.list_levels().await.unwrap()[2].id, second.id);
    }

    #[tokio::test]
    async fn test_level_in_use_cannot_be_deleted() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "四班").await;

        let err = storage.delete_level(class.level_id).await.unwrap_err();
        assert!(matches!(err, RollcallError::Conflict(_)));

        assert!(storage.delete_class(class.id).await.unwrap());
        assert!(storage.delete_level(class.level_id).await.unwrap());
        assert_eq!(storage.count_levels().await.unwrap(), 0);
    }
}
