//! 固定窗口限流中间件
//!
//! 已登录请求按用户计数，未登录请求按客户端 IP 计数（经由
//! `ConnectionInfo::realip_remote_addr`，反向代理需正确设置 `Forwarded`/`X-Forwarded-For`）。
//! 计数键带窗口编号，窗口切换后自然归零；超限返回 429 与 `Retry-After`。
//!
//! ```rust,ignore
//! web::resource("/login")
//!     .wrap(RateLimit::login())
//!     .route(web::post().to(login))
//! ```

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::fmt;
use std::net::IpAddr;
use std::rc::Rc;
use std::time::Duration;
use tracing::warn;

use crate::models::{ErrorCode, users::entities::User};

use super::create_error_response;

const MAX_WINDOW_SECS: u64 = 3600;

/// 键: 前缀:主体:窗口编号，值: 已放行次数
static COUNTERS: Lazy<Cache<String, u32>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(MAX_WINDOW_SECS))
        .max_capacity(100_000)
        .build()
});

/// 限流策略
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    max_requests: u32,
    window_secs: u64,
    scope: &'static str,
}

impl RateLimit {
    pub fn new(scope: &'static str, max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs: window_secs.clamp(1, MAX_WINDOW_SECS),
            scope,
        }
    }

    /// 登录：每 IP 每分钟 5 次
    pub fn login() -> Self {
        Self::new("login", 5, 60)
    }

    pub fn refresh_token() -> Self {
        Self::new("refresh", 10, 60)
    }

    /// 自助签到：每人每分钟 10 次
    pub fn attendance_mark() -> Self {
        Self::new("mark", 10, 60)
    }

    /// 学生导入：每人 10 分钟 5 次
    pub fn import() -> Self {
        Self::new("import", 5, 600)
    }

    fn counter_key(&self, subject: &Subject, now_secs: u64) -> String {
        format!("{}:{}:{}", self.scope, subject, now_secs / self.window_secs)
    }

    fn retry_after(&self, now_secs: u64) -> u64 {
        self.window_secs - now_secs % self.window_secs
    }
}

/// 计数主体
#[derive(Debug, PartialEq, Eq)]
enum Subject {
    User(i64),
    Ip(IpAddr),
    Unknown,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::User(id) => write!(f, "user:{id}"),
            Subject::Ip(ip) => write!(f, "ip:{ip}"),
            Subject::Unknown => f.write_str("unknown"),
        }
    }
}

fn parse_peer(addr: Option<&str>) -> Subject {
    let Some(addr) = addr.map(str::trim) else {
        return Subject::Unknown;
    };
    // 可能带端口，如 "1.2.3.4:5678" 或 "[::1]:8080"
    addr.parse::<IpAddr>()
        .ok()
        .or_else(|| addr.parse::<std::net::SocketAddr>().ok().map(|s| s.ip()))
        .map_or(Subject::Unknown, Subject::Ip)
}

fn subject_of(req: &ServiceRequest) -> Subject {
    if let Some(id) = req.extensions().get::<User>().map(|user| user.id) {
        return Subject::User(id);
    }
    parse_peer(req.connection_info().realip_remote_addr())
}

/// 计数并返回剩余次数；超限返回 None
async fn take(cache: &Cache<String, u32>, key: String, max_requests: u32) -> Option<u32> {
    let used = cache.get(&key).await.unwrap_or(0);
    if used >= max_requests {
        return None;
    }
    cache.insert(key, used + 1).await;
    Some(max_requests - used - 1)
}

fn too_many_requests(retry_after: u64) -> HttpResponse {
    let mut response = create_error_response(
        StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::RateLimitExceeded,
        "请求过于频繁，请稍后再试",
    );
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            policy: *self,
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    policy: RateLimit,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let policy = self.policy;

        Box::pin(async move {
            let subject = subject_of(&req);
            let now_secs = chrono::Utc::now().timestamp().max(0) as u64;
            let key = policy.counter_key(&subject, now_secs);

            let Some(remaining) = take(&COUNTERS, key, policy.max_requests).await else {
                warn!(
                    "Rate limit '{}' exceeded by {} ({} per {}s)",
                    policy.scope, subject, policy.max_requests, policy.window_secs
                );
                let response = too_many_requests(policy.retry_after(now_secs));
                return Ok(req.into_response(response.map_into_right_body()));
            };

            let mut res = srv.call(req).await?.map_into_left_body();
            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(policy.max_requests),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(remaining),
            );
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let login = RateLimit::login();
        assert_eq!((login.max_requests, login.window_secs, login.scope), (5, 60, "login"));
        let import = RateLimit::import();
        assert_eq!((import.max_requests, import.window_secs), (5, 600));
        assert_eq!(RateLimit::new("x", 1, 0).window_secs, 1);
        assert_eq!(RateLimit::new("x", 1, 86_400).window_secs, MAX_WINDOW_SECS);
    }

    #[test]
    fn test_counter_key_rolls_over_with_window() {
        let policy = RateLimit::new("login", 5, 60);
        let subject = Subject::Ip("1.2.3.4".parse().unwrap());
        assert_eq!(policy.counter_key(&subject, 120), "login:ip:1.2.3.4:2");
        assert_eq!(policy.counter_key(&subject, 179), policy.counter_key(&subject, 120));
        assert_ne!(policy.counter_key(&subject, 180), policy.counter_key(&subject, 179));
        assert_eq!(policy.retry_after(120), 60);
        assert_eq!(policy.retry_after(179), 1);
        assert_eq!(policy.counter_key(&Subject::User(9), 0), "login:user:9:0");
    }

    #[test]
    fn test_parse_peer() {
        assert_eq!(parse_peer(Some("10.0.0.1")), Subject::Ip("10.0.0.1".parse().unwrap()));
        assert_eq!(parse_peer(Some("10.0.0.1:443")), Subject::Ip("10.0.0.1".parse().unwrap()));
        assert_eq!(parse_peer(Some("[::1]:8080")), Subject::Ip("::1".parse().unwrap()));
        assert_eq!(parse_peer(Some("not-an-ip")), Subject::Unknown);
        assert_eq!(parse_peer(None), Subject::Unknown);
    }

    #[tokio::test]
    async fn test_take_stops_at_limit() {
        let cache = Cache::new(16);
        assert_eq!(take(&cache, "k".to_string(), 2).await, Some(1));
        assert_eq!(take(&cache, "k".to_string(), 2).await, Some(0));
        assert_eq!(take(&cache, "k".to_string(), 2).await, None);
        assert_eq!(take(&cache, "other".to_string(), 2).await, Some(1));
    }
}
