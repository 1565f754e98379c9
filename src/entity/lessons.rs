//! 课程实体
//!
//! `kind = scheduled` 时使用 `day_of_week` + `start_minute` 描述每周固定上课时间，
//! `kind = instant` 时使用 `starts_at` 记录临时课程的开始时刻。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub teacher_id: i64,
    pub subject: String,
    pub room: Option<String>,
    pub kind: String,
    pub day_of_week: Option<i32>,
    pub start_minute: Option<i32>,
    pub starts_at: Option<i64>,
    pub duration_minutes: i32,
    pub attendance_window_minutes: Option<i32>,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::classes::Entity",
        from = "Column::ClassId",
        to = "super::classes::Column::Id"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::TeacherId",
        to = "super::users::Column::Id"
    )]
    Teacher,
    #[sea_orm(has_many = "super::attendance_records::Entity")]
    AttendanceRecords,
}

impl Related<super::classes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_records::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_lesson(self) -> crate::models::lessons::entities::Lesson {
        use crate::models::lessons::entities::{Lesson, LessonKind};
        use chrono::NaiveTime;

        let start_time = self.start_minute.and_then(|m| {
            NaiveTime::from_hms_opt((m / 60) as u32, (m % 60) as u32, 0)
        });

        Lesson {
            id: self.id,
            class_id: self.class_id,
            teacher_id: self.teacher_id,
            subject: self.subject,
            room: self.room,
            kind: self.kind.parse::<LessonKind>().unwrap_or(LessonKind::Scheduled),
            day_of_week: self.day_of_week,
            start_time,
            starts_at: self.starts_at.map(super::to_utc),
            duration_minutes: self.duration_minutes,
            attendance_window_minutes: self.attendance_window_minutes,
            active: self.active,
            created_at: super::to_utc(self.created_at),
            updated_at: super::to_utc(self.updated_at),
        }
    }
}
