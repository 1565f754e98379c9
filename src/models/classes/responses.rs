use super::entities::Class;
use crate::models::common::PaginationInfo;
use crate::models::departments::entities::Department;
use crate::models::levels::entities::Level;
use crate::models::users::entities::User;
use serde::Serialize;
use ts_rs::TS;

// 班级列表响应
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct ClassListResponse {
    pub pagination: PaginationInfo,
    pub items: Vec<Class>,
}

// 班级详情（附带院系、年级与学生人数）
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct ClassDetailResponse {
    pub class: Class,
    pub department: Option<Department>,
    pub level: Option<Level>,
    pub student_count: i64,
}

// 班级学生名单
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../frontend/src/types/generated/class.ts")]
pub struct ClassRosterResponse {
    pub class_id: i64,
    pub students: Vec<User>,
}
