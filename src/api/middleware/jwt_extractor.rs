//! JWT 认证中间件
//! 从 Authorization 头部解析 Bearer Token，认证上下文注入 request extensions

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    app_state::AppState,
    error::AppError,
    infrastructure::{jwt, log_redact::redact_address},
};

/// 认证上下文
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub wallet: Option<String>,
}

pub async fn jwt_extractor_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // OPTIONS 请求直接放行
    if req.method() == axum::http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let Some(token) = token else {
        tracing::warn!(path = %req.uri().path(), "Missing or malformed Authorization header");
        return Err(AppError::unauthorized("Missing bearer token").with_trace_id_from_request(&req));
    };

    let claims = match jwt::verify_token(&token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(_) => {
            return Err(AppError::token_invalid("Invalid or expired token")
                .with_trace_id_from_request(&req));
        }
    };

    tracing::debug!(
        subject = %claims.sub,
        wallet = %claims.wallet.as_deref().map(redact_address).unwrap_or_default(),
        "Request authenticated"
    );

    req.extensions_mut().insert(AuthContext {
        subject: claims.sub,
        wallet: claims.wallet,
    });

    Ok(next.run(req).await)
}
