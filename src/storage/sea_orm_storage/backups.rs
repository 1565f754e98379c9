//! 备份用的全表导出

use sea_orm::{EntityTrait, QueryOrder};
use serde_json::Value;

use super::SeaOrmStorage;
use crate::entity::prelude::*;
use crate::errors::{Result, RollcallError};

macro_rules! dump_table {
    ($db:expr, $entity:ty, $pk:expr, $name:literal) => {{
        let rows = <$entity>::find()
            .order_by_asc($pk)
            .into_json()
            .all($db)
            .await
            .map_err(|e| {
                RollcallError::database_operation(format!("导出数据表 {} 失败: {e}", $name))
            })?;
        ($name.to_string(), Value::Array(rows))
    }};
}

impl SeaOrmStorage {
    /// 按外键依赖顺序导出全部数据表
    pub async fn dump_tables_impl(&self) -> Result<Vec<(String, Value)>> {
        use crate::entity::{
            attendance_records, classes, departments, lessons, levels, system_settings,
            system_settings_audit, users,
        };

        let db = &self.db;

        Ok(vec![
            dump_table!(db, Departments, departments::Column::Id, "departments"),
            dump_table!(db, Levels, levels::Column::Id, "levels"),
            dump_table!(db, Classes, classes::Column::Id, "classes"),
            dump_table!(db, Users, users::Column::Id, "users"),
            dump_table!(db, Lessons, lessons::Column::Id, "lessons"),
            dump_table!(
                db,
                AttendanceRecords,
                attendance_records::Column::Id,
                "attendance_records"
            ),
            dump_table!(
                db,
                SystemSettings,
                system_settings::Column::Key,
                "system_settings"
            ),
            dump_table!(
                db,
                SystemSettingsAudit,
                system_settings_audit::Column::Id,
                "system_settings_audit"
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{memory_storage, seed_class, seed_user};
    use crate::models::users::entities::UserRole;
    use crate::storage::Storage;

    #[tokio::test]
    async fn test_dump_contains_every_table() {
        let storage = memory_storage().await;
        let class = seed_class(&storage, "备份班").await;
        seed_user(&storage, "dumped", UserRole::Student, Some(class.id)).await;

        let tables = storage.dump_tables().await.unwrap();
        let names: Vec<_> = tables.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "departments",
                "levels",
                "classes",
                "users",
                "lessons",
                "attendance_records",
                "system_settings",
                "system_settings_audit",
            ]
        );

        let users = &tables[3].1;
        assert_eq!(users.as_array().map(|a| a.len()), Some(1));
        assert_eq!(users[0]["username"], "dumped");
        assert_eq!(tables[2].1[0]["name"], "备份班");
    }
}
