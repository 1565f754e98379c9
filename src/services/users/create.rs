use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::{error, info};

use super::{UserService, check_user_references};
use crate::errors::RollcallError;
use crate::models::{
    ApiResponse, ErrorCode,
    users::{entities::UserRole, requests::CreateUserRequest, responses::UserResponse},
};
use crate::utils::password::hash_password;
use crate::utils::validate::{
    validate_email, validate_password, validate_student_number, validate_username,
};

/// 按角色整理附属字段：学生必须有学号和班级，教师可选院系，管理员都不保留
pub(crate) fn normalize_role_fields(req: &mut CreateUserRequest) -> Result<(), String> {
    match req.role {
        UserRole::Student => {
            let number = req
                .student_number
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or("Students must have a student number")?;
            validate_student_number(number)?;
            req.student_number = Some(number.to_string());
            if req.class_id.is_none() {
                return Err("Students must belong to a class".to_string());
            }
            req.department_id = None;
        }
        UserRole::Teacher => {
            req.student_number = None;
            req.class_id = None;
        }
        UserRole::Admin => {
            req.student_number = None;
            req.class_id = None;
            req.department_id = None;
        }
    }
    Ok(())
}

pub async fn create_user(
    service: &UserService,
    mut user_data: CreateUserRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    // 验证用户名
    if let Err(msg) = validate_username(&user_data.username) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::UserNameInvalid, msg)));
    }

    // 验证邮箱
    if let Err(msg) = validate_email(&user_data.email) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::UserEmailInvalid, msg)));
    }

    if let Err(msg) = validate_password(&user_data.password) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::UserPasswordInvalid, msg)));
    }

    if let Err(msg) = normalize_role_fields(&mut user_data) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::BadRequest, msg)));
    }

    let storage = service.get_storage(request)?;

    if let Err(response) =
        check_user_references(&storage, user_data.class_id, user_data.department_id).await
    {
        return Ok(response);
    }

    user_data.password = match hash_password(&user_data.password) {
        Ok(hash) => hash,
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("Password hashing failed: {e}"),
                )),
            );
        }
    };

    match storage.create_user(user_data).await {
        Ok(user) => {
            info!("User {} ({}) created", user.username, user.role);
            Ok(HttpResponse::Created()
                .json(ApiResponse::success(UserResponse { user }, "用户创建成功")))
        }
        Err(RollcallError::Conflict(msg)) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::error_empty(ErrorCode::UserAlreadyExists, msg))),
        Err(e) => {
            error!("User creation failed: {}", e);
            Ok(HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::UserCreationFailed,
                format!("User creation failed: {}", e.message()),
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: UserRole) -> CreateUserRequest {
        CreateUserRequest {
            username: "alice01".to_string(),
            email: "alice@school.test".to_string(),
            password: "Secret123".to_string(),
            role,
            display_name: None,
            student_number: Some(" S-001 ".to_string()),
            class_id: Some(3),
            department_id: Some(2),
        }
    }

    #[test]
    fn test_student_keeps_class_and_trimmed_number() {
        let mut req = request(UserRole::Student);
        normalize_role_fields(&mut req).unwrap();
        assert_eq!(req.student_number.as_deref(), Some("S-001"));
        assert_eq!(req.class_id, Some(3));
        assert_eq!(req.department_id, None);
    }

    #[test]
    fn test_student_requires_number_and_class() {
        let mut req = request(UserRole::Student);
        req.student_number = None;
        assert!(normalize_role_fields(&mut req).is_err());

        let mut req = request(UserRole::Student);
        req.class_id = None;
        assert!(normalize_role_fields(&mut req).is_err());
    }

    #[test]
    fn test_teacher_drops_student_fields() {
        let mut req = request(UserRole::Teacher);
        normalize_role_fields(&mut req).unwrap();
        assert_eq!(req.student_number, None);
        assert_eq!(req.class_id, None);
        assert_eq!(req.department_id, Some(2));
    }
}
