//! Public Configuration API
//! 前端在登录前获取网络、代币、链和表单默认值

use std::sync::Arc;

use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    api::response::{success_response, ApiResult},
    app_state::AppState,
    domain::{
        chain_config::{
            ChainMetadata, DEFAULT_BRIDGE_CHAIN_ID, DEFAULT_BRIDGE_EXECUTE_CHAIN_ID,
            DEFAULT_BRIDGE_TOKEN, DEFAULT_TRANSFER_CHAIN_ID, DEFAULT_TRANSFER_TOKEN,
            SUPPORTED_CHAINS, SUPPORTED_TOKENS,
        },
        network::Network,
    },
};

/// 表单默认值
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormDefaults {
    pub transfer_token: String,
    pub transfer_chain_id: u64,
    pub bridge_token: String,
    pub bridge_chain_id: u64,
    pub bridge_execute_chain_id: u64,
}

/// 公共配置响应（前端可见）
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfigResponse {
    /// 服务器当前时间戳（秒）
    pub server_time: i64,
    pub api_version: String,
    pub default_network: Network,
    pub networks: Vec<Network>,
    pub supported_tokens: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub chains: Vec<ChainMetadata>,
    pub defaults: FormDefaults,
}

/// GET /api/v1/config/public - 获取公共配置
///
/// **无需认证**
#[utoipa::path(
    get,
    path = "/api/v1/config/public",
    tag = "Config",
    responses(
        (status = 200, description = "返回公共配置", body = PublicConfigResponse),
    )
)]
pub async fn get_public_config(
    State(state): State<Arc<AppState>>,
) -> ApiResult<PublicConfigResponse> {
    success_response(PublicConfigResponse {
        server_time: chrono::Utc::now().timestamp(),
        api_version: "v1".to_string(),
        default_network: state.config.nexus.default_network,
        networks: vec![Network::Mainnet, Network::Testnet],
        supported_tokens: SUPPORTED_TOKENS.iter().map(|t| t.to_string()).collect(),
        chains: SUPPORTED_CHAINS.clone(),
        defaults: FormDefaults {
            transfer_token: DEFAULT_TRANSFER_TOKEN.to_string(),
            transfer_chain_id: DEFAULT_TRANSFER_CHAIN_ID,
            bridge_token: DEFAULT_BRIDGE_TOKEN.to_string(),
            bridge_chain_id: DEFAULT_BRIDGE_CHAIN_ID,
            bridge_execute_chain_id: DEFAULT_BRIDGE_EXECUTE_CHAIN_ID,
        },
    })
}
