/// 业务错误码
///
/// 按模块分段：
/// - 0: 成功
/// - 1000-1999: 通用错误
/// - 2000-2999: 认证与用户
/// - 3000-3999: 院系、年级、班级
/// - 4000-4099: 课程
/// - 4100-4199: 考勤
/// - 5000-5999: 导入导出
/// - 6000-6999: 系统设置与备份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,

    // 通用
    BadRequest = 1000,
    Unauthorized = 1001,
    Forbidden = 1003,
    NotFound = 1004,
    Conflict = 1009,
    RateLimitExceeded = 1029,
    InternalServerError = 1500,

    // 认证与用户
    AuthFailed = 2000,
    UserNotFound = 2001,
    UserAlreadyExists = 2002,
    UserNameInvalid = 2003,
    UserEmailInvalid = 2004,
    UserPasswordInvalid = 2005,
    UserEmailAlreadyExists = 2007,
    UserCreationFailed = 2010,
    UserDeleteFailed = 2012,
    CanNotDeleteCurrentUser = 2013,
    UserNotStudent = 2014,
    UserNotTeacher = 2015,

    // 院系、年级、班级
    DepartmentNotFound = 3000,
    DepartmentAlreadyExists = 3001,
    DepartmentInUse = 3002,
    LevelNotFound = 3100,
    LevelAlreadyExists = 3101,
    LevelInUse = 3102,
    ClassNotFound = 3200,
    ClassAlreadyExists = 3201,
    ClassDeleteFailed = 3203,
    ClassPermissionDenied = 3204,

    // 课程
    LessonNotFound = 4000,
    LessonScheduleInvalid = 4001,
    LessonInactive = 4002,
    LessonPermissionDenied = 4003,

    // 考勤
    AttendanceNotYetOpen = 4100,
    AttendanceClosed = 4101,
    AttendanceNotToday = 4102,
    AttendanceAlreadyMarked = 4103,
    AttendanceSelfMarkDisabled = 4104,
    AttendanceNotEnrolled = 4105,
    AttendanceRecordNotFound = 4106,
    AttendanceDateInvalid = 4107,

    // 导入导出
    ImportFileParseFailed = 5100,
    ImportFileMissingColumn = 5101,
    ImportFileDataInvalid = 5102,
    ImportTooManyRows = 5103,
    ExportFailed = 5200,

    // 系统设置与备份
    SettingNotFound = 6000,
    SettingValueInvalid = 6001,
    BackupNotFound = 6100,
    BackupFailed = 6102,
}

impl ErrorCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_zero() {
        assert_eq!(ErrorCode::Success.as_i32(), 0);
    }

    #[test]
    fn test_attendance_codes_are_distinct() {
        let codes = [
            ErrorCode::AttendanceNotYetOpen,
            ErrorCode::AttendanceClosed,
            ErrorCode::AttendanceNotToday,
            ErrorCode::AttendanceAlreadyMarked,
            ErrorCode::AttendanceSelfMarkDisabled,
            ErrorCode::AttendanceNotEnrolled,
        ];
        let mut values: Vec<i32> = codes.iter().map(|c| c.as_i32()).collect();
        values.sort();
        values.dedup();
        assert_eq!(values.len(), codes.len());
        assert!(values.iter().all(|v| (4100..4200).contains(v)));
    }
}
