//! 考勤记录实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lesson_id: i64,
    pub student_id: i64,
    /// 课程发生日期（学校本地日期，YYYY-MM-DD）
    pub session_date: String,
    pub status: String,
    pub source: String,
    pub marked_by: i64,
    #[sea_orm(column_type = "Text", nullable)]
    pub note: Option<String>,
    pub marked_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lessons::Entity",
        from = "Column::LessonId",
        to = "super::lessons::Column::Id"
    )]
    Lesson,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::StudentId",
        to = "super::users::Column::Id"
    )]
    Student,
}

impl Related<super::lessons::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lesson.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_record(self) -> crate::models::attendance::entities::AttendanceRecord {
        use crate::models::attendance::entities::{
            AttendanceRecord, AttendanceSource, AttendanceStatus,
        };
        use chrono::NaiveDate;

        AttendanceRecord {
            id: self.id,
            lesson_id: self.lesson_id,
            student_id: self.student_id,
            session_date: NaiveDate::parse_from_str(&self.session_date, "%Y-%m-%d")
                .unwrap_or_default(),
            status: self
                .status
                .parse::<AttendanceStatus>()
                .unwrap_or(AttendanceStatus::Absent),
            source: self
                .source
                .parse::<AttendanceSource>()
                .unwrap_or(AttendanceSource::Teacher),
            marked_by: self.marked_by,
            note: self.note,
            marked_at: super::to_utc(self.marked_at),
            updated_at: super::to_utc(self.updated_at),
        }
    }
}
