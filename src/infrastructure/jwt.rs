//! JWT Token 验证模块
//!
//! Token 由身份服务签发（钱包登录），这里只做 HS256 校验

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>, // 登录钱包地址
    pub jti: String,
}

impl Claims {
    pub fn new(subject: &str, wallet: Option<String>, expires_in_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.to_string(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
            iat: now.timestamp(),
            wallet,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// 生成JWT Token（测试和本地调试使用）
pub fn generate_token(claims: &Claims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("Failed to encode token: {}", e))
}

/// 验证JWT Token
pub fn verify_token(token: &str, secret: &str) -> Result<Claims> {
    tracing::debug!(token_len = token.len(), "JWT: starting verification");

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 10; // 允许10秒时钟偏差

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "JWT: token verification failed");
        anyhow!("Token verification failed: {}", e)
    })?;

    let claims = token_data.claims;
    if claims.sub.trim().is_empty() {
        return Err(anyhow!("Token subject is empty"));
    }

    Ok(claims)
}
