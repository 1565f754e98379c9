//! 学生批量导入（CSV）
//!
//! 表头必须包含 username, email, password, student_number, class_id，
//! display_name 可选。每行独立校验和创建，失败的行记录在响应的 errors 中。

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use futures_util::StreamExt;
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{error, info};

use super::UserService;
use super::create::normalize_role_fields;
use crate::config::AppConfig;
use crate::errors::RollcallError;
use crate::models::users::entities::UserRole;
use crate::models::users::requests::CreateUserRequest;
use crate::models::users::responses::{ImportRowError, UserImportResponse};
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::password::hash_password;
use crate::utils::validate::{validate_email, validate_password, validate_username};

const REQUIRED_COLUMNS: [&str; 5] = ["username", "email", "password", "student_number", "class_id"];

/// 导入解析错误
#[derive(Debug)]
enum ImportParseError {
    MissingColumn(&'static str),
    ParseFailed(String),
}

impl ImportParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingColumn(_) => ErrorCode::ImportFileMissingColumn,
            Self::ParseFailed(_) => ErrorCode::ImportFileParseFailed,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingColumn(col) => format!("缺少必需列: {col}"),
            Self::ParseFailed(msg) => msg.clone(),
        }
    }
}

/// 导入行数据
#[derive(Debug, Clone)]
struct ImportRow {
    row_num: usize,
    username: String,
    email: String,
    password: String,
    student_number: String,
    class_id: String,
    display_name: Option<String>,
}

impl ImportRow {
    /// 校验并转换为创建请求（密码尚未哈希）
    fn into_request(self) -> Result<CreateUserRequest, String> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        let class_id = self
            .class_id
            .parse::<i64>()
            .map_err(|_| format!("Invalid class_id: {}", self.class_id))?;

        let mut req = CreateUserRequest {
            username: self.username,
            email: self.email,
            password: self.password,
            role: UserRole::Student,
            display_name: self.display_name,
            student_number: Some(self.student_number),
            class_id: Some(class_id),
            department_id: None,
        };
        normalize_role_fields(&mut req)?;
        Ok(req)
    }
}

pub async fn import_students(
    service: &UserService,
    mut payload: Multipart,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    let file_bytes = match read_file_from_multipart(&mut payload).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
                ErrorCode::ImportFileParseFailed,
                format!("文件读取失败: {e}"),
            )));
        }
    };

    let rows = match parse_csv(&file_bytes) {
        Ok(rows) => rows,
        Err(e) => {
            return Ok(HttpResponse::BadRequest()
                .json(ApiResponse::error_empty(e.error_code(), e.message())));
        }
    };

    if rows.is_empty() {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ImportFileDataInvalid,
            "文件中没有数据行",
        )));
    }

    let max_rows = AppConfig::get().server.limits.max_import_rows;
    if rows.len() > max_rows {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::ImportTooManyRows,
            format!("单次导入最多支持 {max_rows} 行"),
        )));
    }

    let storage = service.get_storage(request)?;

    let total = rows.len();
    let mut created = 0;
    let mut errors: Vec<ImportRowError> = Vec::new();
    // 同一文件中班级通常重复出现
    let mut known_classes: HashMap<i64, bool> = HashMap::new();

    for row in rows {
        let row_num = row.row_num;
        let mut fail = |message: String| {
            errors.push(ImportRowError {
                row: row_num,
                message,
            })
        };

        let mut req = match row.into_request() {
            Ok(req) => req,
            Err(msg) => {
                fail(msg);
                continue;
            }
        };

        let class_id = req.class_id.unwrap_or_default();
        let class_exists = match known_classes.get(&class_id) {
            Some(exists) => *exists,
            None => match storage.get_class_by_id(class_id).await {
                Ok(class) => *known_classes.entry(class_id).or_insert(class.is_some()),
                Err(e) => {
                    fail(format!("查询班级失败: {}", e.message()));
                    continue;
                }
            },
        };
        if !class_exists {
            fail(format!("班级 {class_id} 不存在"));
            continue;
        }

        // 哈希密码（使用 spawn_blocking 避免阻塞）
        let password = std::mem::take(&mut req.password);
        req.password = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
            Ok(Ok(hash)) => hash,
            Ok(Err(e)) => {
                fail(format!("密码哈希失败: {e}"));
                continue;
            }
            Err(e) => {
                fail(format!("密码处理失败: {e}"));
                continue;
            }
        };

        match storage.create_user(req).await {
            Ok(_) => created += 1,
            Err(RollcallError::Conflict(msg)) => fail(msg),
            Err(e) => {
                error!("创建用户失败: {}", e);
                fail(format!("创建失败: {}", e.message()));
            }
        }
    }

    let failed = errors.len();
    info!("Student import finished: {} created, {} failed", created, failed);

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        UserImportResponse {
            total,
            created,
            failed,
            errors,
        },
        "导入完成",
    )))
}

async fn read_file_from_multipart(payload: &mut Multipart) -> Result<Vec<u8>, String> {
    let mut file_bytes = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| format!("读取字段失败: {e}"))?;

        if field.name() == Some("file") {
            while let Some(chunk) = field.next().await {
                let data = chunk.map_err(|e| format!("读取数据失败: {e}"))?;
                file_bytes.extend_from_slice(&data);
            }
        }
    }

    if file_bytes.is_empty() {
        return Err("未找到文件字段".to_string());
    }

    Ok(file_bytes)
}

fn parse_csv(data: &[u8]) -> Result<Vec<ImportRow>, ImportParseError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(Cursor::new(data));

    let headers = rdr
        .headers()
        .map_err(|e| ImportParseError::ParseFailed(format!("读取表头失败: {e}")))?;
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim_start_matches('\u{feff}').to_lowercase(), i))
        .collect();

    let mut indexes = [0usize; REQUIRED_COLUMNS.len()];
    for (slot, column) in indexes.iter_mut().zip(REQUIRED_COLUMNS) {
        *slot = *header_map
            .get(column)
            .ok_or(ImportParseError::MissingColumn(column))?;
    }
    let display_name_idx = header_map.get("display_name").copied();

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        // 行号含表头，从 1 开始
        let row_num = idx + 2;
        let record = result.map_err(|e| {
            ImportParseError::ParseFailed(format!("第 {row_num} 行解析失败: {e}"))
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(ImportRow {
            row_num,
            username: cell(indexes[0]),
            email: cell(indexes[1]),
            password: cell(indexes[2]),
            student_number: cell(indexes[3]),
            class_id: cell(indexes[4]),
            display_name: display_name_idx.map(cell).filter(|s| !s.is_empty()),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_with_optional_column() {
        let data = "username,email,password,student_number,class_id,display_name\n\
                    stu001,stu001@school.test,Secret123,S001,1,张三\n\
                    stu002,stu002@school.test,Secret123,S002,1,\n";
        let rows = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_num, 2);
        assert_eq!(rows[0].display_name.as_deref(), Some("张三"));
        assert_eq!(rows[1].display_name, None);
    }

    #[test]
    fn test_parse_csv_reports_missing_column() {
        let data = "username,email,password,class_id\nstu001,a@b.cn,Secret123,1\n";
        let err = parse_csv(data.as_bytes()).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::ImportFileMissingColumn);
        assert!(err.message().contains("student_number"));
    }

    #[test]
    fn test_parse_csv_skips_blank_lines_and_keeps_row_numbers() {
        let data = "username,email,password,student_number,class_id\n\
                    ,,,,\n\
                    stu003,stu003@school.test,Secret123,S003,2\n";
        let rows = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_num, 3);
    }

    #[test]
    fn test_row_validation() {
        let row = ImportRow {
            row_num: 2,
            username: "stu001".to_string(),
            email: "stu001@school.test".to_string(),
            password: "Secret123".to_string(),
            student_number: "S001".to_string(),
            class_id: "4".to_string(),
            display_name: None,
        };
        let req = row.clone().into_request().unwrap();
        assert_eq!(req.role, UserRole::Student);
        assert_eq!(req.class_id, Some(4));

        let bad_class = ImportRow {
            class_id: "abc".to_string(),
            ..row.clone()
        };
        assert!(bad_class.into_request().is_err());

        let bad_password = ImportRow {
            password: "weak".to_string(),
            ..row
        };
        assert!(bad_password.into_request().is_err());
    }
}
