//! 签到窗口判定
//!
//! 所有需要判断“现在能否签到”的地方（学生签到、学生课程列表、仪表盘、
//! 批量录入的默认课次）都调用这里的纯函数，不做任何 I/O。
//!
//! 时间一律按学校所在的固定 UTC 偏移解释：每周课程的“星期几 + 上课时刻”
//! 是学校本地时间，课次日期 `session_date` 也是学校本地日期。

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};

use crate::models::attendance::entities::{AttendanceStatus, DisabledReason, Eligibility};
use crate::models::lessons::entities::{Lesson, LessonKind};

/// 课程的上课安排
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonSchedule {
    /// 每周固定：学校本地的星期几与上课时刻
    Weekly { weekday: Weekday, start: NaiveTime },
    /// 临时课程：唯一一次，从 `starts_at` 开始
    Instant { starts_at: DateTime<Utc> },
}

impl LessonSchedule {
    /// 从课程记录构造；字段不完整的课程返回 None
    pub fn from_lesson(lesson: &Lesson) -> Option<Self> {
        match lesson.kind {
            LessonKind::Scheduled => Some(LessonSchedule::Weekly {
                weekday: iso_weekday(lesson.day_of_week?)?,
                start: lesson.start_time?,
            }),
            LessonKind::Instant => Some(LessonSchedule::Instant {
                starts_at: lesson.starts_at?,
            }),
        }
    }
}

/// 签到窗口与迟到阈值（分钟）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub window_minutes: i64,
    /// 0 表示不区分迟到
    pub late_after_minutes: i64,
}

impl WindowPolicy {
    /// 课程单独设置的窗口优先，否则使用系统默认值
    pub fn for_lesson(lesson: &Lesson, default_window: i64, late_after: i64) -> Self {
        Self {
            window_minutes: lesson
                .attendance_window_minutes
                .map(i64::from)
                .unwrap_or(default_window),
            late_after_minutes: late_after,
        }
    }
}

/// ISO 星期（1 = 周一 ... 7 = 周日）
pub fn iso_weekday(day: i32) -> Option<Weekday> {
    match day {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

/// 某个本地日期的上课时刻对应的 UTC 时间
fn occurrence_start(date: NaiveDate, start: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(start);
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(offset.local_minus_utc()))))
}

fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

/// 与时间无关的开关：课程停用优先于系统关闭自助签到
pub fn disabled_reason(lesson_active: bool, allow_self_mark: bool) -> Option<DisabledReason> {
    if !lesson_active {
        Some(DisabledReason::LessonInactive)
    } else if !allow_self_mark {
        Some(DisabledReason::SelfMarkDisabled)
    } else {
        None
    }
}

/// 判定当前时刻的签到状态
///
/// 窗口为闭区间 `[start, start + window]`。每周课程同时考虑今天和昨天的课次，
/// 以覆盖跨越午夜的窗口。`marked_sessions` 是该学生已有记录的课次日期。
pub fn evaluate(
    schedule: &LessonSchedule,
    policy: &WindowPolicy,
    now: DateTime<FixedOffset>,
    marked_sessions: &[NaiveDate],
) -> Eligibility {
    let offset = *now.offset();
    let now_utc = now.with_timezone(&Utc);
    let window = Duration::minutes(policy.window_minutes);

    let open_session = |session_date: NaiveDate, opens_at: DateTime<Utc>| {
        let closes_at = opens_at + window;
        if marked_sessions.contains(&session_date) {
            return Eligibility::AlreadyMarked {
                session_date,
                closes_at,
            };
        }
        let status = if policy.late_after_minutes > 0
            && now_utc > opens_at + Duration::minutes(policy.late_after_minutes)
        {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        Eligibility::Open {
            session_date,
            opens_at,
            closes_at,
            status,
        }
    };

    match *schedule {
        LessonSchedule::Instant { starts_at } => {
            let closes_at = starts_at + window;
            if now_utc < starts_at {
                Eligibility::NotYetOpen { opens_at: starts_at }
            } else if now_utc > closes_at {
                Eligibility::Closed {
                    closed_at: closes_at,
                }
            } else {
                open_session(local_date(starts_at, offset), starts_at)
            }
        }
        LessonSchedule::Weekly { weekday, start } => {
            let today = now.date_naive();
            let candidates = [Some(today), today.pred_opt()];

            for date in candidates.into_iter().flatten() {
                if date.weekday() != weekday {
                    continue;
                }
                let opens_at = occurrence_start(date, start, offset);
                if opens_at <= now_utc && now_utc <= opens_at + window {
                    return open_session(date, opens_at);
                }
            }

            if today.weekday() != weekday {
                return Eligibility::NotToday;
            }

            let opens_at = occurrence_start(today, start, offset);
            if now_utc < opens_at {
                Eligibility::NotYetOpen { opens_at }
            } else {
                Eligibility::Closed {
                    closed_at: opens_at + window,
                }
            }
        }
    }
}

/// 最近一次已经开始的课次日期，用作教师操作的默认日期
///
/// 临时课程总是返回其开始时刻的本地日期（即使尚未开始）。
pub fn latest_session_date(schedule: &LessonSchedule, now: DateTime<FixedOffset>) -> NaiveDate {
    let offset = *now.offset();
    match *schedule {
        LessonSchedule::Instant { starts_at } => local_date(starts_at, offset),
        LessonSchedule::Weekly { weekday, start } => {
            let today = now.date_naive();
            let mut days_back = (7 + today.weekday().num_days_from_monday()
                - weekday.num_days_from_monday())
                % 7;
            if days_back == 0 && now.with_timezone(&Utc) < occurrence_start(today, start, offset) {
                days_back = 7;
            }
            today - Duration::days(i64::from(days_back))
        }
    }
}

/// 课程在某个本地日期是否有课次
pub fn occurs_on(schedule: &LessonSchedule, date: NaiveDate, offset: FixedOffset) -> bool {
    match *schedule {
        LessonSchedule::Weekly { weekday, .. } => date.weekday() == weekday,
        LessonSchedule::Instant { starts_at } => local_date(starts_at, offset) == date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2026-10-19 是周一
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn offset(minutes: i32) -> FixedOffset {
        FixedOffset::east_opt(minutes * 60).unwrap()
    }

    fn at(date: NaiveDate, h: u32, m: u32, s: u32, tz: FixedOffset) -> DateTime<FixedOffset> {
        tz.from_local_datetime(&date.and_hms_opt(h, m, s).unwrap())
            .unwrap()
    }

    fn weekly(weekday: Weekday, h: u32, m: u32) -> LessonSchedule {
        LessonSchedule::Weekly {
            weekday,
            start: NaiveTime::from_hms_opt(h, m, 0).unwrap(),
        }
    }

    fn policy(window: i64, late: i64) -> WindowPolicy {
        WindowPolicy {
            window_minutes: window,
            late_after_minutes: late,
        }
    }

    fn utc(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_hms_opt(h, m, 0).unwrap())
    }

    #[test]
    fn test_open_at_start() {
        let result = evaluate(
            &weekly(Weekday::Mon, 9, 0),
            &policy(15, 5),
            at(monday(), 9, 0, 0, offset(0)),
            &[],
        );
        assert_eq!(
            result,
            Eligibility::Open {
                session_date: monday(),
                opens_at: utc(monday(), 9, 0),
                closes_at: utc(monday(), 9, 15),
                status: AttendanceStatus::Present,
            }
        );
    }

    #[test]
    fn test_open_at_exact_window_end() {
        let result = evaluate(
            &weekly(Weekday::Mon, 9, 0),
            &policy(15, 0),
            at(monday(), 9, 15, 0, offset(0)),
            &[],
        );
        assert!(result.is_open());
    }

    #[test]
    fn test_closed_one_second_after_window() {
        let result = evaluate(
            &weekly(Weekday::Mon, 9, 0),
            &policy(15, 0),
            at(monday(), 9, 15, 1, offset(0)),
            &[],
        );
        assert_eq!(
            result,
            Eligibility::Closed {
                closed_at: utc(monday(), 9, 15)
            }
        );
    }

    #[test]
    fn test_not_yet_open_before_start() {
        let result = evaluate(
            &weekly(Weekday::Mon, 9, 0),
            &policy(15, 0),
            at(monday(), 8, 59, 59, offset(0)),
            &[],
        );
        assert_eq!(
            result,
            Eligibility::NotYetOpen {
                opens_at: utc(monday(), 9, 0)
            }
        );
    }

    #[test]
    fn test_wrong_weekday_is_not_today() {
        let result = evaluate(
            &weekly(Weekday::Wed, 9, 0),
            &policy(15, 0),
            at(monday(), 9, 5, 0, offset(0)),
            &[],
        );
        assert_eq!(result, Eligibility::NotToday);
    }

    #[test]
    fn test_window_crossing_midnight_is_open_next_day() {
        // 周日 23:50 上课，窗口 20 分钟，周一 00:05 仍可签到
        let sunday = monday().pred_opt().unwrap();
        let schedule = weekly(Weekday::Sun, 23, 50);
        let result = evaluate(
            &schedule,
            &policy(20, 0),
            at(monday(), 0, 5, 0, offset(0)),
            &[],
        );
        assert_eq!(result.open_session(), Some(sunday));

        let after = evaluate(
            &schedule,
            &policy(20, 0),
            at(monday(), 0, 10, 1, offset(0)),
            &[],
        );
        assert_eq!(after, Eligibility::NotToday);
    }

    #[test]
    fn test_instant_lesson_states() {
        let starts_at = utc(monday(), 14, 0);
        let schedule = LessonSchedule::Instant { starts_at };

        let before = evaluate(&schedule, &policy(10, 0), at(monday(), 13, 0, 0, offset(0)), &[]);
        assert_eq!(before, Eligibility::NotYetOpen { opens_at: starts_at });

        let during = evaluate(&schedule, &policy(10, 0), at(monday(), 14, 10, 0, offset(0)), &[]);
        assert_eq!(during.open_session(), Some(monday()));

        let after = evaluate(&schedule, &policy(10, 0), at(monday(), 14, 10, 1, offset(0)), &[]);
        assert_eq!(
            after,
            Eligibility::Closed {
                closed_at: utc(monday(), 14, 10)
            }
        );

        // 很久以后依然是 Closed，而不是 NotToday
        let next_week = evaluate(
            &schedule,
            &policy(10, 0),
            at(monday() + Duration::days(7), 14, 5, 0, offset(0)),
            &[],
        );
        assert!(matches!(next_week, Eligibility::Closed { .. }));
    }

    #[test]
    fn test_late_threshold_boundaries() {
        let schedule = weekly(Weekday::Mon, 9, 0);
        let status_at = |m: u32, s: u32| match evaluate(
            &schedule,
            &policy(15, 5),
            at(monday(), 9, m, s, offset(0)),
            &[],
        ) {
            Eligibility::Open { status, .. } => status,
            other => panic!("expected open, got {other:?}"),
        };

        assert_eq!(status_at(5, 0), AttendanceStatus::Present);
        assert_eq!(status_at(5, 1), AttendanceStatus::Late);
        assert_eq!(status_at(15, 0), AttendanceStatus::Late);
    }

    #[test]
    fn test_zero_threshold_disables_late() {
        let result = evaluate(
            &weekly(Weekday::Mon, 9, 0),
            &policy(15, 0),
            at(monday(), 9, 14, 0, offset(0)),
            &[],
        );
        assert!(matches!(
            result,
            Eligibility::Open {
                status: AttendanceStatus::Present,
                ..
            }
        ));
    }

    #[test]
    fn test_already_marked_only_for_open_session() {
        let schedule = weekly(Weekday::Mon, 9, 0);
        let last_week = monday() - Duration::days(7);

        // 上周的记录不影响本周签到
        let open = evaluate(
            &schedule,
            &policy(15, 0),
            at(monday(), 9, 1, 0, offset(0)),
            &[last_week],
        );
        assert!(open.is_open());

        let marked = evaluate(
            &schedule,
            &policy(15, 0),
            at(monday(), 9, 1, 0, offset(0)),
            &[last_week, monday()],
        );
        assert_eq!(
            marked,
            Eligibility::AlreadyMarked {
                session_date: monday(),
                closes_at: utc(monday(), 9, 15),
            }
        );

        // 窗口关闭后即使已有记录也报告 Closed
        let closed = evaluate(
            &schedule,
            &policy(15, 0),
            at(monday(), 10, 0, 0, offset(0)),
            &[monday()],
        );
        assert!(matches!(closed, Eligibility::Closed { .. }));
    }

    #[test]
    fn test_lesson_window_override() {
        let lesson = Lesson {
            id: 1,
            class_id: 1,
            teacher_id: 2,
            subject: "数学".to_string(),
            room: None,
            kind: LessonKind::Scheduled,
            day_of_week: Some(1),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            starts_at: None,
            duration_minutes: 45,
            attendance_window_minutes: Some(30),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let policy = WindowPolicy::for_lesson(&lesson, 15, 5);
        assert_eq!(policy.window_minutes, 30);

        let schedule = LessonSchedule::from_lesson(&lesson).unwrap();
        let result = evaluate(&schedule, &policy, at(monday(), 9, 25, 0, offset(0)), &[]);
        assert!(result.is_open());

        let default_policy = WindowPolicy::for_lesson(
            &Lesson {
                attendance_window_minutes: None,
                ..lesson
            },
            15,
            5,
        );
        assert_eq!(default_policy.window_minutes, 15);
    }

    #[test]
    fn test_utc_offset_shifts_local_day() {
        // UTC+8 的周一 09:00 是 UTC 周一 01:00
        let schedule = weekly(Weekday::Mon, 9, 0);
        let now = at(monday(), 9, 3, 0, offset(480));
        match evaluate(&schedule, &policy(15, 0), now, &[]) {
            Eligibility::Open {
                session_date,
                opens_at,
                ..
            } => {
                assert_eq!(session_date, monday());
                assert_eq!(opens_at, utc(monday(), 1, 0));
            }
            other => panic!("expected open, got {other:?}"),
        }

        // UTC 周日 20:00 在 UTC-5 仍是周日 15:00，而在 UTC+8 已是周一 04:00
        let sunday_utc = Utc.from_utc_datetime(
            &monday().pred_opt().unwrap().and_hms_opt(20, 0, 0).unwrap(),
        );
        let early = weekly(Weekday::Mon, 4, 0);
        assert!(
            evaluate(&early, &policy(15, 0), sunday_utc.with_timezone(&offset(480)), &[])
                .is_open()
        );
        assert_eq!(
            evaluate(&early, &policy(15, 0), sunday_utc.with_timezone(&offset(-300)), &[]),
            Eligibility::NotToday
        );
    }

    #[test]
    fn test_latest_session_date_weekly() {
        let schedule = weekly(Weekday::Mon, 9, 0);
        // 开课前取上周一，开课后取今天
        assert_eq!(
            latest_session_date(&schedule, at(monday(), 8, 0, 0, offset(0))),
            monday() - Duration::days(7)
        );
        assert_eq!(
            latest_session_date(&schedule, at(monday(), 9, 0, 0, offset(0))),
            monday()
        );

        // 周三的课在周一查询，取上周三
        let wednesday = weekly(Weekday::Wed, 9, 0);
        assert_eq!(
            latest_session_date(&wednesday, at(monday(), 12, 0, 0, offset(0))),
            NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
        );
    }

    #[test]
    fn test_latest_session_date_instant() {
        let starts_at = utc(monday(), 23, 30);
        let schedule = LessonSchedule::Instant { starts_at };
        // 尚未开始也返回其日期
        assert_eq!(
            latest_session_date(&schedule, at(monday(), 8, 0, 0, offset(0))),
            monday()
        );
        // UTC+8 下这是周二
        assert_eq!(
            latest_session_date(&schedule, at(monday(), 8, 0, 0, offset(480))),
            monday().succ_opt().unwrap()
        );
    }

    #[test]
    fn test_occurs_on() {
        let schedule = weekly(Weekday::Mon, 9, 0);
        assert!(occurs_on(&schedule, monday(), offset(0)));
        assert!(!occurs_on(&schedule, monday().succ_opt().unwrap(), offset(0)));

        let instant = LessonSchedule::Instant {
            starts_at: utc(monday(), 10, 0),
        };
        assert!(occurs_on(&instant, monday(), offset(0)));
        assert!(!occurs_on(&instant, monday() + Duration::days(7), offset(0)));
    }

    #[test]
    fn test_from_lesson_rejects_incomplete_schedule() {
        let lesson = Lesson {
            id: 1,
            class_id: 1,
            teacher_id: 2,
            subject: "物理".to_string(),
            room: None,
            kind: LessonKind::Scheduled,
            day_of_week: Some(8),
            start_time: NaiveTime::from_hms_opt(9, 0, 0),
            starts_at: None,
            duration_minutes: 45,
            attendance_window_minutes: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(LessonSchedule::from_lesson(&lesson).is_none());
        assert!(
            LessonSchedule::from_lesson(&Lesson {
                kind: LessonKind::Instant,
                ..lesson
            })
            .is_none()
        );
    }

    #[test]
    fn test_inactive_lesson_outranks_disabled_switch() {
        assert_eq!(disabled_reason(true, true), None);
        assert_eq!(
            disabled_reason(false, false),
            Some(DisabledReason::LessonInactive)
        );
        assert_eq!(
            disabled_reason(true, false),
            Some(DisabledReason::SelfMarkDisabled)
        );
    }
}
