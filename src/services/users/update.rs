use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::{UserService, check_user_references};
use crate::errors::RollcallError;
use crate::models::{
    ApiResponse, ErrorCode,
    users::{requests::UpdateUserRequest, responses::UserResponse},
};
use crate::services::{error_response, invalidate_user_cache};
use crate::utils::password::hash_password;
use crate::utils::validate::{validate_email, validate_password, validate_student_number};

fn validate_update(update: &UpdateUserRequest) -> Result<(), (ErrorCode, String)> {
    if let Some(email) = &update.email {
        validate_email(email).map_err(|msg| (ErrorCode::UserEmailInvalid, msg.to_string()))?;
    }
    if let Some(password) = &update.password {
        validate_password(password).map_err(|msg| (ErrorCode::UserPasswordInvalid, msg))?;
    }
    if let Some(number) = &update.student_number {
        validate_student_number(number).map_err(|msg| (ErrorCode::BadRequest, msg.to_string()))?;
    }
    Ok(())
}

pub async fn update_user(
    service: &UserService,
    user_id: i64,
    mut update_data: UpdateUserRequest,
    request: &HttpRequest,
) -> ActixResult<HttpResponse> {
    if let Err((code, msg)) = validate_update(&update_data) {
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(code, msg)));
    }

    let storage = service.get_storage(request)?;

    if let Err(response) =
        check_user_references(&storage, update_data.class_id, update_data.department_id).await
    {
        return Ok(response);
    }

    if let Some(password) = update_data.password {
        match hash_password(&password) {
            Ok(hash) => update_data.password = Some(hash),
            Err(e) => {
                return Ok(
                    HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                        ErrorCode::InternalServerError,
                        format!("Password hashing failed: {e}"),
                    )),
                );
            }
        }
    }

    match storage.update_user(user_id, update_data).await {
        Ok(Some(user)) => {
            invalidate_user_cache(request, user_id).await;
            info!("User {} updated", user_id);
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                UserResponse { user },
                "User information updated successfully",
            )))
        }
        Ok(None) => Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
            ErrorCode::UserNotFound,
            "User not found",
        ))),
        Err(RollcallError::Conflict(msg)) => Ok(HttpResponse::Conflict()
            .json(ApiResponse::error_empty(ErrorCode::UserAlreadyExists, msg))),
        Err(e) => Ok(error_response(&e, "Failed to update user information")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_is_valid() {
        assert!(validate_update(&UpdateUserRequest::default()).is_ok());
    }

    #[test]
    fn test_weak_password_rejected_with_code() {
        let update = UpdateUserRequest {
            password: Some("short".to_string()),
            ..Default::default()
        };
        let (code, _) = validate_update(&update).unwrap_err();
        assert_eq!(code, ErrorCode::UserPasswordInvalid);
    }

    #[test]
    fn test_bad_email_rejected_with_code() {
        let update = UpdateUserRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        let (code, _) = validate_update(&update).unwrap_err();
        assert_eq!(code, ErrorCode::UserEmailInvalid);
    }
}
