use serde::Deserialize;
use ts_rs::TS;

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/level.ts")]
pub struct CreateLevelRequest {
    pub name: String,
    #[serde(default)]
    pub rank: i32,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/level.ts")]
pub struct UpdateLevelRequest {
    pub name: Option<String>,
    pub rank: Option<i32>,
    pub description: Option<String>,
}
