//! 系统设置存储实现

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

use crate::entity::prelude::{SystemSettings, SystemSettingsAudit};
use crate::errors::{Result, RollcallError};
use crate::models::{
    common::{PaginationInfo, pagination::normalize_page},
    system::{
        entities::SystemSetting, requests::SettingAuditQuery, responses::SettingAuditListResponse,
    },
};

use super::SeaOrmStorage;

impl SeaOrmStorage {
    /// 获取所有设置
    pub(crate) async fn list_all_settings_impl(&self) -> Result<Vec<SystemSetting>> {
        let settings = SystemSettings::find()
            .order_by(crate::entity::system_settings::Column::Key, Order::Asc)
            .all(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("获取设置列表失败: {e}")))?;

        Ok(settings.into_iter().map(|s| s.into_setting()).collect())
    }

    /// 通过 key 获取设置
    pub(crate) async fn get_setting_by_key_impl(&self, key: &str) -> Result<Option<SystemSetting>> {
        let setting = SystemSettings::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .map_err(|e| RollcallError::database_operation(format!("获取设置失败: {e}")))?;

        Ok(setting.map(|s| s.into_setting()))
    }

    /// 更新设置，同一事务内写入审计日志
    pub(crate) async fn update_setting_impl(
        &self,
        key: &str,
        value: &str,
        user_id: i64,
        ip_address: Option<String>,
    ) -> Result<SystemSetting> {
        let now = chrono::Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| RollcallError::database_operation(format!("开启事务失败: {e}")))?;

        let existing = SystemSettings::find_by_id(key.to_string())
            .one(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("获取设置失败: {e}")))?
            .ok_or_else(|| RollcallError::not_found(format!("配置项不存在: {key}")))?;

        let old_value = existing.value.clone();

        let mut active_model: crate::entity::system_settings::ActiveModel = existing.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.updated_by = Set(Some(user_id));

        let updated = active_model
            .update(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("更新设置失败: {e}")))?;

        let audit = crate::entity::system_settings_audit::ActiveModel {
            setting_key: Set(key.to_string()),
            old_value: Set(Some(old_value)),
            new_value: Set(value.to_string()),
            changed_by: Set(user_id),
            changed_at: Set(now),
            ip_address: Set(ip_address),
            ..Default::default()
        };

        audit
            .insert(&txn)
            .await
            .map_err(|e| RollcallError::database_operation(format!("创建审计日志失败: {e}")))?;

        txn.commit()
            .await
            .map_err(|e| RollcallError::database_operation(format!("提交事务失败: {e}")))?;

        Ok(updated.into_setting())
    }

    /// 获取审计日志
    pub(crate) async fn list_setting_audits_impl(
        &self,
        query: SettingAuditQuery,
    ) -> Result<SettingAuditListResponse> {
        let (page, size) = normalize_page(query.page, query.size);

        let mut find = SystemSettingsAudit::find();

        if let Some(key) = &query.key {
            find = find.filter(crate::entity::system_settings_audit::Column::SettingKey.eq(key));
        }

        let paginator = find
            .order_by(
                crate::entity::system_settings_audit::Column::ChangedAt,
                Order::Desc,
            )
            .order_by(crate::entity::system_settings_audit::Column::Id, Order::Desc)
            .paginate(&self.db, size);

        let total = paginator
            .num_items()
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计审计日志失败: {e}")))?;

        let pages = paginator
            .num_pages()
            .await
            .map_err(|e| RollcallError::database_operation(format!("统计审计日志页数失败: {e}")))?;

        let audits = paginator
            .fetch_page(page - 1)
            .await
            .map_err(|e| RollcallError::database_operation(format!("获取审计日志失败: {e}")))?;

        Ok(SettingAuditListResponse {
            audits: audits.into_iter().map(|a| a.into_audit()).collect(),
            pagination: PaginationInfo::new(page, size, total, pages),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::memory_storage;
    use crate::errors::RollcallError;
    use crate::models::system::{entities::KnownSettingKey, requests::SettingAuditQuery};
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_default_settings_are_seeded() {
        let storage = memory_storage().await;
        let settings = storage.list_all_settings().await.unwrap();
        assert_eq!(settings.len(), KnownSettingKey::all().len());

        let window = storage
            .get_setting_by_key("attendance.window_minutes")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(window.value, "15");
    }

    #[tokio::test]
    async fn test_update_setting_writes_audit() {
        let storage = memory_storage().await;
        let updated = storage
            .update_setting(
                "attendance.late_after_minutes",
                "10",
                1,
                Some("127.0.0.1".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.value, "10");
        assert_eq!(updated.updated_by, Some(1));

        let audits = storage
            .list_setting_audits(SettingAuditQuery {
                key: Some("attendance.late_after_minutes".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(audits.pagination.total, 1);
        assert_eq!(audits.audits[0].old_value.as_deref(), Some("5"));
        assert_eq!(audits.audits[0].new_value, "10");

        let err = storage
            .update_setting("nope", "1", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RollcallError::NotFound(_)));
    }
}
