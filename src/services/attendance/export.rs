//! 班级考勤导出（CSV / XLSX）

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use rust_xlsxwriter::{Format, Workbook};
use tracing::{error, info};

use super::{AttendanceService, unauthorized};
use crate::errors::{Result, RollcallError};
use crate::middlewares::RequireJWT;
use crate::models::{
    ApiResponse, ErrorCode,
    attendance::{entities::AttendanceExportRow, requests::AttendanceExportParams},
    lessons::requests::LessonListQuery,
    users::entities::UserRole,
};
use crate::services::error_response;
use crate::utils::validate::{is_xlsx_format, validate_date_range};

const HEADERS: [&str; 9] = [
    "date",
    "lesson_id",
    "subject",
    "student_number",
    "student",
    "status",
    "source",
    "note",
    "marked_at",
];

fn row_values(row: &AttendanceExportRow) -> [String; 9] {
    [
        row.session_date.to_string(),
        row.lesson_id.to_string(),
        row.subject.clone(),
        row.student_number.clone().unwrap_or_default(),
        row.student_name.clone(),
        row.status.to_string(),
        row.source.to_string(),
        row.note.clone().unwrap_or_default(),
        row.marked_at.to_rfc3339(),
    ]
}

pub(crate) fn render_csv(rows: &[AttendanceExportRow]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record(row_values(row))?;
    }
    wtr.into_inner()
        .map_err(|e| RollcallError::export(format!("CSV 生成失败: {e}")))
}

pub(crate) fn render_xlsx(rows: &[AttendanceExportRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("attendance")?;

    let header_format = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let line = (idx + 1) as u32;
        for (col, value) in row_values(row).iter().enumerate() {
            worksheet.write_string(line, col as u16, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub async fn export_attendance(
    service: &AttendanceService,
    params: AttendanceExportParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let Some(user) = RequireJWT::extract_user_claims(request) else {
        return Ok(unauthorized());
    };

    if let Err(msg) = validate_date_range(params.from, params.to) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::AttendanceDateInvalid, msg)));
    }

    let xlsx = match is_xlsx_format(params.format.as_deref()) {
        Ok(xlsx) => xlsx,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    };

    let storage = service.get_storage(request)?;

    match storage.get_class_by_id(params.class_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::ClassNotFound,
                "Class not found",
            )));
        }
        Err(e) => return Ok(error_response(&e, "获取班级失败")),
    }

    // 教师只能导出自己任课的班级
    if user.role == UserRole::Teacher {
        let teaching = storage
            .list_lessons_with_pagination(LessonListQuery {
                page: Some(1),
                size: Some(1),
                class_id: Some(params.class_id),
                teacher_id: Some(user.id),
                ..Default::default()
            })
            .await;
        match teaching {
            Ok(page) if page.pagination.total > 0 => {}
            Ok(_) => {
                return Ok(HttpResponse::Forbidden().json(ApiResponse::error_empty(
                    ErrorCode::ClassPermissionDenied,
                    "You do not teach this class",
                )));
            }
            Err(e) => return Ok(error_response(&e, "检查任课班级失败")),
        }
    }

    let rows = match storage
        .list_attendance_for_export(params.class_id, params.from, params.to)
        .await
    {
        Ok(rows) => rows,
        Err(e) => return Ok(error_response(&e, "导出考勤失败")),
    };

    let rendered = if xlsx {
        render_xlsx(&rows)
    } else {
        render_csv(&rows)
    };

    let body = match rendered {
        Ok(body) => body,
        Err(e) => {
            error!("考勤导出失败: {}", e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::ExportFailed,
                    format!("Export failed: {}", e.message()),
                )),
            );
        }
    };

    info!(
        "User {} exported {} attendance rows of class {}",
        user.id,
        rows.len(),
        params.class_id
    );

    let (content_type, ext) = if xlsx {
        (
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xlsx",
        )
    } else {
        ("text/csv; charset=utf-8", "csv")
    };
    let filename = format!(
        "attendance-class{}-{}-{}.{ext}",
        params.class_id, params.from, params.to
    );

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance::entities::{AttendanceSource, AttendanceStatus};
    use crate::models::users::entities::{User, UserStatus};
    use actix_web::{HttpMessage, http::StatusCode, test::TestRequest};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_row() -> AttendanceExportRow {
        AttendanceExportRow {
            session_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            lesson_id: 3,
            subject: "数学, 提高班".to_string(),
            student_id: 8,
            student_number: Some("S2026001".to_string()),
            student_name: "张三".to_string(),
            status: AttendanceStatus::Late,
            source: AttendanceSource::SelfMark,
            note: None,
            marked_at: Utc.with_ymd_and_hms(2026, 10, 19, 9, 7, 0).unwrap(),
        }
    }

    #[test]
    fn test_csv_has_header_and_quoted_fields() {
        let bytes = render_csv(&[sample_row()]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("date,lesson_id,subject,student_number,student,status,source,note,marked_at")
        );
        assert_eq!(
            lines.next(),
            Some("2026-10-19,3,\"数学, 提高班\",S2026001,张三,late,self,,2026-10-19T09:07:00+00:00")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_xlsx_is_a_zip_container() {
        let bytes = render_xlsx(&[sample_row()]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[actix_web::test]
    async fn test_unknown_format_is_bad_request() {
        let request = TestRequest::default().to_http_request();
        request.extensions_mut().insert(User {
            id: 2,
            username: "teacher".to_string(),
            email: "teacher@school.test".to_string(),
            password_hash: String::new(),
            role: UserRole::Teacher,
            status: UserStatus::Active,
            display_name: None,
            student_number: None,
            class_id: None,
            department_id: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        let params = AttendanceExportParams {
            class_id: 1,
            from: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            format: Some("pdf".to_string()),
        };

        let response = export_attendance(&AttendanceService::new_lazy(), params, &request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
