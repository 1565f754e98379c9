use crate::config::AppConfig;
use actix_web::cookie::{Cookie, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";
const REFRESH_COOKIE_NAME: &str = "refresh_token";

// JWT Claims 结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub role: String,       // 用户角色
    pub token_type: String, // token类型: "access" 或 "refresh"
    pub exp: usize,         // Expiration time (时间戳)
    pub iat: usize,         // Issued at (签发时间)
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

// Token 对
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct JwtUtils;

impl JwtUtils {
    // 获取 JWT 密钥
    fn get_secret() -> &'static str {
        &AppConfig::get().jwt.secret
    }

    fn sign(
        claims: &Claims,
        secret: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    fn verify_with_secret(
        token: &str,
        secret: &str,
        expected_type: &str,
    ) -> Result<Claims, jsonwebtoken::errors::Error> {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let claims = decode::<Claims>(token, &decoding_key, &Validation::default())?.claims;
        if claims.token_type != expected_type {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(claims)
    }

    fn build_claims(
        user_id: i64,
        role: &str,
        token_type: &str,
        expiry_duration: chrono::Duration,
    ) -> Claims {
        let now = chrono::Utc::now();
        let expiration = now + expiry_duration;
        Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            token_type: token_type.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    // 生成带自定义过期时间的 Token
    pub fn generate_token_with_expiry(
        user_id: i64,
        role: &str,
        token_type: &str,
        expiry_duration: chrono::Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Self::build_claims(user_id, role, token_type, expiry_duration);
        Self::sign(&claims, Self::get_secret())
    }

    // 生成 access + refresh token
    pub fn generate_token_pair(
        user_id: i64,
        role: &str,
        access_expiry: chrono::Duration,
        refresh_expiry: chrono::Duration,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: Self::generate_token_with_expiry(
                user_id,
                role,
                ACCESS_TOKEN,
                access_expiry,
            )?,
            refresh_token: Self::generate_token_with_expiry(
                user_id,
                role,
                REFRESH_TOKEN,
                refresh_expiry,
            )?,
        })
    }

    // 验证 Access Token
    pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::verify_with_secret(token, Self::get_secret(), ACCESS_TOKEN)
    }

    // 验证 Refresh Token
    pub fn verify_refresh_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        Self::verify_with_secret(token, Self::get_secret(), REFRESH_TOKEN)
    }

    /// 创建 Refresh Token Cookie
    pub fn create_refresh_token_cookie(
        refresh_token: &str,
        max_age: chrono::Duration,
    ) -> Cookie<'static> {
        let config = AppConfig::get();
        Cookie::build(REFRESH_COOKIE_NAME, refresh_token.to_string())
            .path("/")
            .max_age(actix_web::cookie::time::Duration::seconds(
                max_age.num_seconds(),
            ))
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(config.is_production()) // 生产环境下使用 HTTPS
            .finish()
    }

    /// 创建空的 Refresh Token Cookie（用于注销）
    pub fn create_empty_refresh_token_cookie() -> Cookie<'static> {
        let config = AppConfig::get();
        Cookie::build(REFRESH_COOKIE_NAME, "")
            .path("/")
            .max_age(actix_web::cookie::time::Duration::seconds(0))
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(config.is_production())
            .finish()
    }

    /// 从请求中提取 Refresh Token
    pub fn extract_refresh_token_from_cookie(req: &actix_web::HttpRequest) -> Option<String> {
        req.cookie(REFRESH_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_sign_and_verify() {
        let claims =
            JwtUtils::build_claims(7, "teacher", ACCESS_TOKEN, chrono::Duration::minutes(5));
        let token = JwtUtils::sign(&claims, SECRET).unwrap();
        let decoded = JwtUtils::verify_with_secret(&token, SECRET, ACCESS_TOKEN).unwrap();
        assert_eq!(decoded.user_id(), Some(7));
        assert_eq!(decoded.role, "teacher");
    }

    #[test]
    fn test_refresh_token_is_not_access_token() {
        let claims = JwtUtils::build_claims(7, "student", REFRESH_TOKEN, chrono::Duration::days(1));
        let token = JwtUtils::sign(&claims, SECRET).unwrap();
        assert!(JwtUtils::verify_with_secret(&token, SECRET, ACCESS_TOKEN).is_err());
        assert!(JwtUtils::verify_with_secret(&token, SECRET, REFRESH_TOKEN).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = JwtUtils::build_claims(1, "admin", ACCESS_TOKEN, chrono::Duration::minutes(5));
        let token = JwtUtils::sign(&claims, SECRET).unwrap();
        assert!(JwtUtils::verify_with_secret(&token, "other", ACCESS_TOKEN).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        // 超过默认 60 秒的时钟容差
        let claims =
            JwtUtils::build_claims(1, "admin", ACCESS_TOKEN, chrono::Duration::minutes(-5));
        let token = JwtUtils::sign(&claims, SECRET).unwrap();
        assert!(JwtUtils::verify_with_secret(&token, SECRET, ACCESS_TOKEN).is_err());
    }
}
