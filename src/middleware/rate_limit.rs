use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use redis::AsyncCommands;

use crate::{config::Config, error::AppError};

const KEY_PREFIX: &str = "rate_limit:";

/// 基于 Redis 的固定窗口计数，用于登录和注册接口，减缓密码猜测
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    window_secs: u64,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: redis::Client, config: &Config) -> Self {
        Self {
            redis: Arc::new(redis),
            window_secs: config.rate_limit_window().as_secs(),
            max_requests: config.rate_limit_requests,
        }
    }

    async fn hit(&self, ip: &str) -> Result<u32, redis::RedisError> {
        let key = format!("{}{}", KEY_PREFIX, ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            // 第一次请求时设置窗口过期时间
            let _: () = conn.expire(&key, self.window_secs as i64).await?;
        }
        Ok(count)
    }
}

/// 优先取代理头，最后退回到连接地址
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_owned)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let ip = client_ip(req.headers(), remote);

    let count = limiter.hit(&ip).await.map_err(|e| {
        tracing::error!("Rate limiter unavailable: {}", e);
        AppError::ServiceUnavailable
    })?;

    if count > limiter.max_requests {
        tracing::warn!(ip = %ip, count, "Rate limit exceeded");
        return Err(AppError::RateLimited(limiter.window_secs));
    }

    Ok(next.run(req).await)
}
