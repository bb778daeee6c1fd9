//! Nexus 绑定控制器
//!
//! 把生命周期服务适配成可观察的仪表盘状态（SDK 状态、余额、每个操作的结果槽），
//! 并编排复合流程：挂载加载、初始化后自动拉余额、kill 后立即重新加载。
//!
//! kill 会推进会话代数，旧会话中仍在进行的操作和余额查询完成后不再写回状态。

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::{
    domain::{
        balance::{format_fiat, total_fiat_value, BalanceView, UnifiedBalance},
        chain_config::{ChainMetadata, SUPPORTED_CHAINS, SUPPORTED_TOKENS},
        network::Network,
        operation::{
            BridgeAndExecuteParams, BridgeParams, OperationKind, OperationMode, OperationRequest,
            TransferParams,
        },
    },
    infrastructure::log_redact::{redact_address, redact_addresses},
    service::{
        init_failure::classify_init_failure,
        nexus_sdk_service::{NexusError, NexusSdkService, SdkStatus},
        provider_adapter::{ProviderResolver, WalletDirectory},
    },
};

/// 单个操作的 {pending, result, error}
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct OperationSlot {
    pub pending: bool,
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    pub error: Option<String>,
}

/// 带操作标识的结果槽
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationSlotView {
    pub kind: OperationKind,
    pub mode: OperationMode,
    #[serde(flatten)]
    pub slot: OperationSlot,
}

/// 仪表盘快照
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSnapshot {
    pub status: SdkStatus,
    pub balances: Vec<BalanceView>,
    /// 所有代币法币价值合计
    pub total_fiat: String,
    pub is_loading_balances: bool,
    pub operations: Vec<OperationSlotView>,
    pub supported_tokens: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub chains: Vec<ChainMetadata>,
}

#[derive(Default)]
struct ControllerState {
    sdk_status: SdkStatus,
    balances: Vec<UnifiedBalance>,
    is_loading_balances: bool,
    operations: HashMap<(OperationKind, OperationMode), OperationSlot>,
    session_epoch: u64,
}

pub struct NexusController {
    service: Arc<NexusSdkService>,
    wallets: Arc<dyn WalletDirectory>,
    resolver: ProviderResolver,
    default_network: Network,
    state: RwLock<ControllerState>,
    mounted: AtomicBool,
    unmounted: AtomicBool,
}

/// 挂载守卫：drop 时确保 cleanup 执行一次
pub struct MountGuard {
    controller: Arc<NexusController>,
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if self.controller.unmounted.load(Ordering::SeqCst) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let controller = self.controller.clone();
                handle.spawn(async move { controller.unmount().await });
            }
            Err(_) => {
                tracing::warn!("No tokio runtime available, skipping Nexus cleanup on unmount");
            }
        }
    }
}

impl NexusController {
    pub fn new(
        service: Arc<NexusSdkService>,
        wallets: Arc<dyn WalletDirectory>,
        default_network: Network,
    ) -> Self {
        Self::with_resolver(service, wallets, ProviderResolver::default(), default_network)
    }

    pub fn with_resolver(
        service: Arc<NexusSdkService>,
        wallets: Arc<dyn WalletDirectory>,
        resolver: ProviderResolver,
        default_network: Network,
    ) -> Self {
        Self {
            service,
            wallets,
            resolver,
            default_network,
            state: RwLock::new(ControllerState::default()),
            mounted: AtomicBool::new(false),
            unmounted: AtomicBool::new(false),
        }
    }

    pub fn service(&self) -> &Arc<NexusSdkService> {
        &self.service
    }

    pub fn default_network(&self) -> Network {
        self.default_network
    }

    /// 挂载：加载默认网络的 SDK（只执行一次）
    pub async fn mount(self: &Arc<Self>) -> MountGuard {
        if !self.mounted.swap(true, Ordering::SeqCst) {
            tracing::info!(network = %self.default_network, "Mounting Nexus controller");
            if let Err(e) = self.service.load_sdk(self.default_network).await {
                tracing::error!(error = %e, "Initial Nexus SDK load failed");
            }
            self.refresh_status().await;
        }
        MountGuard {
            controller: self.clone(),
        }
    }

    /// 卸载：cleanup 只执行一次
    pub async fn unmount(&self) {
        if self.unmounted.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Unmounting Nexus controller");
        self.service.cleanup().await;
        self.refresh_status().await;
    }

    async fn refresh_status(&self) -> SdkStatus {
        let status = self.service.status().await;
        self.state.write().await.sdk_status = status.clone();
        status
    }

    async fn record_error(&self, message: String) {
        self.state.write().await.sdk_status.error = Some(message);
    }

    /// 选择钱包、加载并初始化 SDK，成功后自动拉取余额
    pub async fn initialize_nexus(
        &self,
        wallet_index: usize,
        network: Network,
    ) -> Result<SdkStatus, NexusError> {
        let wallet = match self.wallets.list_wallets().await {
            Ok(wallets) => wallets.get(wallet_index).cloned(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to list wallets");
                None
            }
        };
        let Some(wallet) = wallet else {
            let err = NexusError::NoWalletSelected;
            self.record_error(err.to_string()).await;
            return Err(err);
        };

        tracing::info!(
            wallet = %redact_address(wallet.address()),
            network = %network,
            "Initializing Nexus for wallet"
        );

        let provider = match self.resolver.resolve(wallet.as_ref()).await {
            Ok(provider) => provider,
            Err(e) => {
                self.record_error(e.to_string()).await;
                return Err(e);
            }
        };

        let current = self.service.status().await;
        let already_ready = current.is_initialized && current.network == network;
        if !already_ready {
            if let Err(e) = self.service.load_sdk(network).await {
                self.refresh_status().await;
                return Err(e);
            }
        }

        let outcome = self.service.initialize(provider).await;
        let status = self.refresh_status().await;

        match outcome {
            Ok(true) => {
                // 余额失败只记录错误，不回滚初始化
                let _ = self.fetch_balances().await;
                Ok(self.state.read().await.sdk_status.clone())
            }
            Ok(false) => {
                let failure = match self.service.last_init_failure().await {
                    Some(failure) => failure,
                    None => classify_init_failure(status.error.as_deref().unwrap_or_default()),
                };
                Err(NexusError::InitializationFailed(failure))
            }
            Err(e) => Err(e),
        }
    }

    /// 拉取统一余额，整体替换旧数据；失败写入共享的状态错误
    pub async fn fetch_balances(&self) -> Result<Vec<UnifiedBalance>, NexusError> {
        let epoch = {
            let mut state = self.state.write().await;
            state.is_loading_balances = true;
            state.session_epoch
        };

        let fetched = self.service.get_unified_balances().await;

        let mut state = self.state.write().await;
        if state.session_epoch != epoch {
            tracing::debug!("Discarding balances fetched by a killed session");
            return fetched;
        }
        state.is_loading_balances = false;
        match fetched {
            Ok(balances) => {
                state.balances = balances.clone();
                Ok(balances)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Balance fetch failed");
                state.sdk_status.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// 销毁当前会话并立即重新加载默认网络
    pub async fn kill_nexus(&self) -> Result<SdkStatus, NexusError> {
        tracing::info!("Killing Nexus session");
        self.service.cleanup().await;

        {
            let mut state = self.state.write().await;
            state.session_epoch += 1;
            state.balances.clear();
            state.is_loading_balances = false;
            state.operations.clear();
        }

        let reloaded = self.service.load_sdk(self.default_network).await;
        let status = self.refresh_status().await;
        reloaded.map(|_| status)
    }

    /// 所有 simulate / execute 流程的统一入口
    ///
    /// 同一 (kind, mode) 槽位进行中时拒绝重入
    pub async fn run_operation(
        &self,
        mode: OperationMode,
        request: OperationRequest,
    ) -> Result<Value, NexusError> {
        let kind = request.kind();

        let epoch = {
            let mut state = self.state.write().await;
            let slot = state.operations.entry((kind, mode)).or_default();
            if slot.pending {
                tracing::warn!(kind = %kind, mode = %mode, "Operation already in flight");
                return Err(NexusError::OperationInFlight { kind, mode });
            }
            *slot = OperationSlot {
                pending: true,
                result: None,
                error: None,
            };
            state.session_epoch
        };

        let outcome = self.service.dispatch(mode, &request).await;

        let mut state = self.state.write().await;
        if state.session_epoch != epoch {
            tracing::debug!(kind = %kind, mode = %mode, "Discarding outcome from a killed session");
            return outcome;
        }
        let slot = state.operations.entry((kind, mode)).or_default();
        slot.pending = false;
        match &outcome {
            Ok(result) => {
                tracing::info!(kind = %kind, mode = %mode, "Operation completed");
                slot.result = Some(result.clone());
            }
            Err(e) => {
                let message = e.to_string();
                let message = if message.is_empty() {
                    mode.fallback_error(kind).to_string()
                } else {
                    message
                };
                tracing::warn!(
                    kind = %kind,
                    mode = %mode,
                    error = %redact_addresses(&message),
                    "Operation failed"
                );
                slot.error = Some(message);
            }
        }
        outcome
    }

    pub async fn simulate_transfer(&self, params: TransferParams) -> Result<Value, NexusError> {
        self.run_operation(OperationMode::Simulate, OperationRequest::Transfer(params))
            .await
    }

    pub async fn transfer(&self, params: TransferParams) -> Result<Value, NexusError> {
        self.run_operation(OperationMode::Execute, OperationRequest::Transfer(params))
            .await
    }

    pub async fn simulate_bridge(&self, params: BridgeParams) -> Result<Value, NexusError> {
        self.run_operation(OperationMode::Simulate, OperationRequest::Bridge(params))
            .await
    }

    pub async fn bridge(&self, params: BridgeParams) -> Result<Value, NexusError> {
        self.run_operation(OperationMode::Execute, OperationRequest::Bridge(params))
            .await
    }

    pub async fn simulate_bridge_and_execute(
        &self,
        params: BridgeAndExecuteParams,
    ) -> Result<Value, NexusError> {
        self.run_operation(
            OperationMode::Simulate,
            OperationRequest::BridgeAndExecute(params),
        )
        .await
    }

    pub async fn bridge_and_execute(
        &self,
        params: BridgeAndExecuteParams,
    ) -> Result<Value, NexusError> {
        self.run_operation(
            OperationMode::Execute,
            OperationRequest::BridgeAndExecute(params),
        )
        .await
    }

    pub async fn operation_slot(&self, kind: OperationKind, mode: OperationMode) -> OperationSlot {
        self.state
            .read()
            .await
            .operations
            .get(&(kind, mode))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn balances(&self) -> Vec<UnifiedBalance> {
        self.state.read().await.balances.clone()
    }

    pub async fn sdk_status(&self) -> SdkStatus {
        self.state.read().await.sdk_status.clone()
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let state = self.state.read().await;

        let operations = OperationKind::ALL
            .iter()
            .flat_map(|kind| OperationMode::ALL.iter().map(move |mode| (*kind, *mode)))
            .map(|(kind, mode)| OperationSlotView {
                kind,
                mode,
                slot: state.operations.get(&(kind, mode)).cloned().unwrap_or_default(),
            })
            .collect();

        DashboardSnapshot {
            status: state.sdk_status.clone(),
            balances: state.balances.iter().map(BalanceView::from).collect(),
            total_fiat: format_fiat(total_fiat_value(&state.balances)),
            is_loading_balances: state.is_loading_balances,
            operations,
            supported_tokens: SUPPORTED_TOKENS.iter().map(|t| t.to_string()).collect(),
            chains: SUPPORTED_CHAINS.clone(),
        }
    }
}
