//! 用户导出服务

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use rust_xlsxwriter::{Format, Workbook};
use tracing::error;

use super::UserService;
use crate::errors::{Result, RollcallError};
use crate::models::users::{entities::User, requests::UserExportParams};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;
use crate::utils::validate::is_xlsx_format;

const HEADERS: [&str; 9] = [
    "id",
    "username",
    "email",
    "role",
    "status",
    "display_name",
    "student_number",
    "class_id",
    "created_at",
];

fn row_values(user: &User) -> [String; 9] {
    [
        user.id.to_string(),
        user.username.clone(),
        user.email.clone(),
        user.role.to_string(),
        user.status.to_string(),
        user.display_name.clone().unwrap_or_default(),
        user.student_number.clone().unwrap_or_default(),
        user.class_id.map(|id| id.to_string()).unwrap_or_default(),
        user.created_at.to_rfc3339(),
    ]
}

fn render_csv(users: &[User]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HEADERS)?;
    for user in users {
        wtr.write_record(row_values(user))?;
    }
    wtr.into_inner()
        .map_err(|e| RollcallError::export(format!("CSV 生成失败: {e}")))
}

fn render_xlsx(users: &[User]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("users")?;

    let header_format = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (idx, user) in users.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_number(row, 0, user.id as f64)?;
        for (col, value) in row_values(user).iter().enumerate().skip(1) {
            worksheet.write_string(row, col as u16, value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// 导出用户列表
pub async fn export_users(
    service: &UserService,
    params: UserExportParams,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let xlsx = match is_xlsx_format(params.format.as_deref()) {
        Ok(xlsx) => xlsx,
        Err(msg) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
        }
    };

    let storage = service.get_storage(request)?;

    let users = match storage
        .list_users_for_export(params.role, params.class_id)
        .await
    {
        Ok(users) => users,
        Err(e) => return Ok(error_response(&e, "导出用户失败")),
    };

    let rendered = if xlsx {
        render_xlsx(&users)
    } else {
        render_csv(&users)
    };

    match rendered {
        Ok(body) => {
            let (content_type, filename) = if xlsx {
                (
                    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    "users.xlsx",
                )
            } else {
                ("text/csv; charset=utf-8", "users.csv")
            };
            Ok(HttpResponse::Ok()
                .content_type(content_type)
                .insert_header((
                    "Content-Disposition",
                    format!("attachment; filename=\"{filename}\""),
                ))
                .body(body))
        }
        Err(e) => {
            error!("导出用户失败: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::ExportFailed,
                e.message(),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::entities::{UserRole, UserStatus};
    use chrono::{TimeZone, Utc};

    fn student() -> User {
        let at = Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap();
        User {
            id: 12,
            username: "stu012".to_string(),
            email: "stu012@school.test".to_string(),
            password_hash: "secret-hash".to_string(),
            role: UserRole::Student,
            status: UserStatus::Active,
            display_name: Some("李四".to_string()),
            student_number: Some("S012".to_string()),
            class_id: Some(3),
            department_id: None,
            last_login: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_csv_has_no_password_hash() {
        let body = String::from_utf8(render_csv(&[student()]).unwrap()).unwrap();
        let mut lines = body.lines();
        assert_eq!(lines.next(), Some(HEADERS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("12,stu012,stu012@school.test,student,active,李四,S012,3,2026-09-01T08:00:00+00:00")
        );
        assert!(!body.contains("secret-hash"));
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let body = render_xlsx(&[student()]).unwrap();
        assert!(body.starts_with(b"PK"));
    }
}
