use serde::{Deserialize, Serialize};
use ts_rs::TS;

// 年级（例如 一年级、大二），按 rank 排序
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/level.ts")]
pub struct Level {
    pub id: i64,
    pub name: String,
    pub rank: i32,
    pub description: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
