//! Nexus 仪表盘 API
//!
//! 钱包选择、SDK 初始化 / 销毁、余额查询、transfer / bridge / bridge-and-execute
//! 的模拟与执行。所有路由需要 JWT。
//!
//! 涉及厂商调用的 handler 通过 `tokio::spawn` 执行：客户端断开不会中断进行中的
//! 初始化或操作，状态标志总能复位。

use std::{future::Future, sync::Arc};

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use utoipa::ToSchema;

use crate::{
    api::{
        middleware::{AuthContext, TraceId},
        response::{success_response, success_response_with_message, ApiResult},
    },
    app_state::AppState,
    domain::{
        balance::{format_fiat, total_fiat_value, BalanceView},
        chain_config::{aave_supply_preset, DEFAULT_BRIDGE_EXECUTE_CHAIN_ID},
        network::Network,
        operation::{BridgeAndExecuteParams, OperationKind, OperationMode, OperationRequest},
    },
    error::AppError,
    service::{
        nexus_controller::{DashboardSnapshot, OperationSlot},
        nexus_sdk_service::{NexusError, SdkStatus},
    },
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitializeRequest {
    /// 钱包列表中的下标
    #[serde(default)]
    pub wallet_index: usize,
    /// 缺省使用服务默认网络
    pub network: Option<Network>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub index: usize,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub balances: Vec<BalanceView>,
    pub total_fiat: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationResponse {
    pub kind: OperationKind,
    pub mode: OperationMode,
    #[schema(value_type = Object)]
    pub result: Value,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AaveSupplyPresetRequest {
    pub chain_id: Option<u64>,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub recipient: String,
    /// false 时只桥接，不附带合约调用
    #[serde(default = "default_true")]
    pub with_execute: bool,
}

fn default_true() -> bool {
    true
}

/// 在独立任务中运行控制器调用
async fn detached<T, F>(trace_id: &TraceId, fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, NexusError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(fut.in_current_span()).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AppError::from(e).with_trace_id(trace_id.0.clone())),
        Err(e) => {
            tracing::error!(error = %e, "Nexus task aborted");
            Err(AppError::internal("Nexus task aborted").with_trace_id(trace_id.0.clone()))
        }
    }
}

/// GET /api/v1/nexus/status
#[utoipa::path(
    get,
    path = "/api/v1/nexus/status",
    tag = "Nexus",
    responses(
        (status = 200, description = "SDK 状态", body = SdkStatus),
        (status = 401, description = "未认证", body = crate::api::response::ErrorBodyDoc),
    )
)]
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResult<SdkStatus> {
    success_response(state.controller.service().status().await)
}

/// GET /api/v1/nexus/dashboard
#[utoipa::path(
    get,
    path = "/api/v1/nexus/dashboard",
    tag = "Nexus",
    responses(
        (status = 200, description = "仪表盘快照", body = DashboardSnapshot),
    )
)]
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> ApiResult<DashboardSnapshot> {
    success_response(state.controller.snapshot().await)
}

/// GET /api/v1/nexus/wallets
#[utoipa::path(
    get,
    path = "/api/v1/nexus/wallets",
    tag = "Nexus",
    responses(
        (status = 200, description = "可选钱包", body = Vec<WalletSummary>),
    )
)]
pub async fn list_wallets(State(state): State<Arc<AppState>>) -> ApiResult<Vec<WalletSummary>> {
    let wallets = state.wallets.list_wallets().await?;
    success_response(
        wallets
            .iter()
            .enumerate()
            .map(|(index, w)| WalletSummary {
                index,
                address: w.address().to_string(),
            })
            .collect(),
    )
}

/// POST /api/v1/nexus/initialize
#[utoipa::path(
    post,
    path = "/api/v1/nexus/initialize",
    tag = "Nexus",
    request_body = InitializeRequest,
    responses(
        (status = 200, description = "初始化成功", body = SdkStatus),
        (status = 400, description = "钱包或 provider 不可用", body = crate::api::response::ErrorBodyDoc),
        (status = 409, description = "SDK 初始化中或需先销毁", body = crate::api::response::ErrorBodyDoc),
        (status = 422, description = "初始化失败（retryable 提示可重试）", body = crate::api::response::ErrorBodyDoc),
    )
)]
pub async fn initialize(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InitializeRequest>,
) -> ApiResult<SdkStatus> {
    let controller = state.controller.clone();
    let network = req.network.unwrap_or_else(|| controller.default_network());
    tracing::info!(
        subject = %auth.subject,
        wallet_index = req.wallet_index,
        network = %network,
        "Nexus initialize requested"
    );

    let status = detached(&trace_id, async move {
        controller.initialize_nexus(req.wallet_index, network).await
    })
    .await?;

    success_response_with_message(status, "Nexus SDK initialized")
}

/// POST /api/v1/nexus/kill
#[utoipa::path(
    post,
    path = "/api/v1/nexus/kill",
    tag = "Nexus",
    responses(
        (status = 200, description = "已销毁并重新加载默认网络", body = SdkStatus),
    )
)]
pub async fn kill(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<SdkStatus> {
    tracing::info!(subject = %auth.subject, "Nexus kill requested");
    let controller = state.controller.clone();
    let status = detached(&trace_id, async move { controller.kill_nexus().await }).await?;
    success_response(status)
}

/// GET /api/v1/nexus/balances
///
/// 每次都向厂商重新拉取
#[utoipa::path(
    get,
    path = "/api/v1/nexus/balances",
    tag = "Nexus",
    responses(
        (status = 200, description = "统一余额", body = BalancesResponse),
        (status = 409, description = "SDK 未初始化", body = crate::api::response::ErrorBodyDoc),
    )
)]
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> ApiResult<BalancesResponse> {
    let controller = state.controller.clone();
    let balances = detached(&trace_id, async move { controller.fetch_balances().await }).await?;

    success_response(BalancesResponse {
        total_fiat: format_fiat(total_fiat_value(&balances)),
        balances: balances.iter().map(BalanceView::from).collect(),
    })
}

fn parse_operation(kind: &str, mode: &str) -> Result<(OperationKind, OperationMode), AppError> {
    let kind = kind
        .parse::<OperationKind>()
        .map_err(|e| AppError::invalid_parameter(e.to_string()))?;
    let mode = mode
        .parse::<OperationMode>()
        .map_err(|e| AppError::invalid_parameter(e.to_string()))?;
    Ok((kind, mode))
}

/// POST /api/v1/nexus/operations/{kind}/{mode}
///
/// 参数原样转发给厂商，结果原样返回
#[utoipa::path(
    post,
    path = "/api/v1/nexus/operations/{kind}/{mode}",
    tag = "Nexus",
    params(
        ("kind" = String, Path, description = "transfer | bridge | bridge-and-execute"),
        ("mode" = String, Path, description = "simulate | execute"),
    ),
    request_body(content = Object, description = "TransferParams / BridgeParams / BridgeAndExecuteParams"),
    responses(
        (status = 200, description = "厂商返回结果", body = OperationResponse),
        (status = 409, description = "SDK 未加载", body = crate::api::response::ErrorBodyDoc),
        (status = 429, description = "同一操作进行中", body = crate::api::response::ErrorBodyDoc),
        (status = 502, description = "厂商错误", body = crate::api::response::ErrorBodyDoc),
    )
)]
pub async fn run_operation(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Path((kind, mode)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<OperationResponse> {
    let (kind, mode) =
        parse_operation(&kind, &mode).map_err(|e| e.with_trace_id(trace_id.0.clone()))?;
    let request = OperationRequest::from_json(kind, body)
        .map_err(|e| AppError::from(e).with_trace_id(trace_id.0.clone()))?;

    let controller = state.controller.clone();
    let result = detached(&trace_id, async move {
        controller.run_operation(mode, request).await
    })
    .await?;

    success_response(OperationResponse { kind, mode, result })
}

/// GET /api/v1/nexus/operations/{kind}/{mode}
#[utoipa::path(
    get,
    path = "/api/v1/nexus/operations/{kind}/{mode}",
    tag = "Nexus",
    params(
        ("kind" = String, Path, description = "transfer | bridge | bridge-and-execute"),
        ("mode" = String, Path, description = "simulate | execute"),
    ),
    responses(
        (status = 200, description = "最近一次结果槽", body = OperationSlot),
    )
)]
pub async fn get_operation(
    State(state): State<Arc<AppState>>,
    Path((kind, mode)): Path<(String, String)>,
) -> ApiResult<OperationSlot> {
    let (kind, mode) = parse_operation(&kind, &mode)?;
    success_response(state.controller.operation_slot(kind, mode).await)
}

/// POST /api/v1/nexus/presets/aave-supply
///
/// 生成 "桥接 USDC 后存入 Aave" 的 bridge-and-execute 参数
#[utoipa::path(
    post,
    path = "/api/v1/nexus/presets/aave-supply",
    tag = "Nexus",
    request_body = AaveSupplyPresetRequest,
    responses(
        (status = 200, description = "bridge-and-execute 参数", body = BridgeAndExecuteParams),
        (status = 400, description = "目标链不支持", body = crate::api::response::ErrorBodyDoc),
    )
)]
pub async fn aave_supply(
    Json(req): Json<AaveSupplyPresetRequest>,
) -> ApiResult<BridgeAndExecuteParams> {
    let chain_id = req.chain_id.unwrap_or(DEFAULT_BRIDGE_EXECUTE_CHAIN_ID);
    let params = aave_supply_preset(chain_id, req.amount, &req.recipient, req.with_execute)
        .map_err(|e| AppError::invalid_parameter(e.to_string()))?;
    success_response(params)
}

pub fn routes() -> axum::Router<Arc<AppState>> {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/status", get(get_status))
        .route("/dashboard", get(get_dashboard))
        .route("/wallets", get(list_wallets))
        .route("/initialize", post(initialize))
        .route("/kill", post(kill))
        .route("/balances", get(get_balances))
        .route(
            "/operations/:kind/:mode",
            get(get_operation).post(run_operation),
        )
        .route("/presets/aave-supply", post(aave_supply))
}
