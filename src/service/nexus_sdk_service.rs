//! Nexus SDK 生命周期服务 + 操作分发
//!
//! 状态机：Unloaded → Loaded(sdk, network) → Initializing → {Ready | Failed → Loaded}
//! → (cleanup) → Loaded。
//!
//! - 服务显式构造并由 `AppState` 持有，不使用全局单例
//! - 已初始化（或初始化中）时拒绝切换网络，必须先 `cleanup`
//! - 任何厂商调用期间都不持有状态锁
//! - cleanup 开始即退出就绪态，拆除期间拒绝初始化与加载

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::{
        balance::UnifiedBalance,
        chain_config::{find_chain, is_supported_token},
        network::Network,
        operation::{
            BridgeAndExecuteParams, BridgeParams, OperationKind, OperationMode, OperationRequest,
            TransferParams,
        },
    },
    infrastructure::log_redact::redact_address,
    service::{
        approval_policy::{ApprovalPolicy, ApprovalRequest, AutoApprovePolicy},
        init_failure::{classify_init_failure, InitFailure},
        nexus_sdk::{CrossChainSdk, SdkFactory, VendorError},
        provider_adapter::Eip1193Provider,
    },
};

/// 服务层错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum NexusError {
    #[error("{0}")]
    ProviderUnavailable(String),
    #[error("No wallet selected")]
    NoWalletSelected,
    #[error("{0}")]
    SdkLoad(String),
    #[error("Nexus SDK not loaded")]
    NotLoaded,
    #[error("Nexus SDK not initialized")]
    NotInitialized,
    #[error("Nexus SDK initialization already in progress")]
    InitializationInProgress,
    #[error("Nexus SDK cleanup in progress")]
    CleanupInProgress,
    #[error("Cannot switch Nexus network from {current} to {requested} while the SDK is initialized; clean up first")]
    NetworkSwitchWhileReady { current: Network, requested: Network },
    #[error("{}", .0.message)]
    InitializationFailed(InitFailure),
    #[error("A {kind} {mode} is already in progress")]
    OperationInFlight {
        kind: OperationKind,
        mode: OperationMode,
    },
    #[error(transparent)]
    Vendor(#[from] VendorError),
}

/// SDK 实例标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SdkInstanceInfo {
    pub id: Uuid,
    pub network: Network,
    pub loaded_at: DateTime<Utc>,
}

/// SDK 状态快照
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SdkStatus {
    pub instance: Option<SdkInstanceInfo>,
    pub is_initialized: bool,
    pub is_initializing: bool,
    pub error: Option<String>,
    pub network: Network,
}

impl Default for SdkStatus {
    fn default() -> Self {
        Self {
            instance: None,
            is_initialized: false,
            is_initializing: false,
            error: None,
            network: Network::Mainnet,
        }
    }
}

#[derive(Clone)]
struct LoadedSdk {
    info: SdkInstanceInfo,
    sdk: Arc<dyn CrossChainSdk>,
}

#[derive(Default)]
struct ServiceState {
    loaded: Option<LoadedSdk>,
    is_initialized: bool,
    is_initializing: bool,
    is_cleaning_up: bool,
    error: Option<String>,
    network: Network,
    last_init_failure: Option<InitFailure>,
}

/// Nexus SDK 服务
pub struct NexusSdkService {
    factory: Arc<dyn SdkFactory>,
    policy: Arc<dyn ApprovalPolicy>,
    state: RwLock<ServiceState>,
    /// 串行化 cleanup，保证 deinit 只执行一次
    teardown: Mutex<()>,
}

impl NexusSdkService {
    pub fn new(factory: Arc<dyn SdkFactory>) -> Self {
        Self::with_policy(factory, Arc::new(AutoApprovePolicy))
    }

    pub fn with_policy(factory: Arc<dyn SdkFactory>, policy: Arc<dyn ApprovalPolicy>) -> Self {
        Self {
            factory,
            policy,
            state: RwLock::new(ServiceState::default()),
            teardown: Mutex::new(()),
        }
    }

    /// 为指定网络构造新的 SDK 实例，替换旧实例
    pub async fn load_sdk(&self, network: Network) -> Result<SdkInstanceInfo, NexusError> {
        {
            let mut state = self.state.write().await;
            Self::ensure_switchable(&state, network)?;
            state.error = None;
        }

        tracing::info!(network = %network, "Loading Nexus SDK");

        let created = self.factory.create(network).await;

        let mut state = self.state.write().await;
        match created {
            Ok(sdk) => {
                // 构造期间可能有并发的 initialize 完成
                Self::ensure_switchable(&state, network)?;

                let info = SdkInstanceInfo {
                    id: Uuid::new_v4(),
                    network,
                    loaded_at: Utc::now(),
                };
                state.loaded = Some(LoadedSdk {
                    info: info.clone(),
                    sdk,
                });
                state.network = network;
                state.last_init_failure = None;

                tracing::info!(network = %network, instance = %info.id, "Nexus SDK loaded");
                Ok(info)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::error!(network = %network, error = %message, "Failed to load Nexus SDK");
                state.error = Some(message.clone());
                Err(NexusError::SdkLoad(message))
            }
        }
    }

    fn ensure_switchable(state: &ServiceState, requested: Network) -> Result<(), NexusError> {
        if state.is_cleaning_up {
            return Err(NexusError::CleanupInProgress);
        }
        if state.is_initialized || state.is_initializing {
            return Err(NexusError::NetworkSwitchWhileReady {
                current: state.network,
                requested,
            });
        }
        Ok(())
    }

    /// 使用 provider 初始化当前实例
    ///
    /// 返回 `Ok(false)` 表示厂商初始化失败，分类后的原因见 `last_init_failure`
    pub async fn initialize(&self, provider: Arc<dyn Eip1193Provider>) -> Result<bool, NexusError> {
        let loaded = {
            let mut state = self.state.write().await;
            let Some(loaded) = state.loaded.clone() else {
                state.error = Some(NexusError::NotLoaded.to_string());
                return Err(NexusError::NotLoaded);
            };
            if state.is_cleaning_up {
                return Err(NexusError::CleanupInProgress);
            }
            if state.is_initialized {
                tracing::debug!("Nexus SDK already initialized");
                return Ok(true);
            }
            if state.is_initializing {
                return Err(NexusError::InitializationInProgress);
            }
            state.is_initializing = true;
            state.error = None;
            state.last_init_failure = None;
            loaded
        };

        tracing::info!(network = %loaded.info.network, instance = %loaded.info.id, "Initializing Nexus SDK");

        let outcome = loaded.sdk.initialize(provider).await;

        let mut state = self.state.write().await;
        state.is_initializing = false;

        match outcome {
            Ok(()) => {
                self.register_hooks(loaded.sdk.as_ref());
                state.is_initialized = true;
                tracing::info!(instance = %loaded.info.id, "Nexus SDK setup completed");
                Ok(true)
            }
            Err(err) => {
                let failure = classify_init_failure(&err.message);
                tracing::warn!(
                    category = ?failure.category,
                    cause = %failure.cause,
                    "Nexus SDK initialization failed"
                );
                state.error = Some(failure.message.clone());
                state.last_init_failure = Some(failure);
                Ok(false)
            }
        }
    }

    fn register_hooks(&self, sdk: &dyn CrossChainSdk) {
        let policy = self.policy.clone();
        sdk.set_on_intent_hook(Arc::new(move |intent: &Value| {
            policy.decide(ApprovalRequest::Intent(intent))
        }));

        let policy = self.policy.clone();
        sdk.set_on_allowance_hook(Arc::new(move |sources: &[Value]| {
            policy.decide(ApprovalRequest::Allowance(sources))
        }));

        sdk.on_account_changed(Arc::new(|account: &str| {
            tracing::info!(account = %redact_address(account), "Account changed");
        }));
        sdk.on_chain_changed(Arc::new(|chain_id: u64| {
            tracing::info!(chain_id, "Chain changed");
        }));
    }

    pub async fn status(&self) -> SdkStatus {
        let state = self.state.read().await;
        SdkStatus {
            instance: state.loaded.as_ref().map(|l| l.info.clone()),
            is_initialized: state.is_initialized,
            is_initializing: state.is_initializing,
            error: state.error.clone(),
            network: state.network,
        }
    }

    pub async fn last_init_failure(&self) -> Option<InitFailure> {
        self.state.read().await.last_init_failure.clone()
    }

    /// 释放监听器并 deinit；未初始化时不做任何事
    ///
    /// 并发调用会等待进行中的拆除结束后返回
    pub async fn cleanup(&self) {
        let _teardown = self.teardown.lock().await;

        let loaded = {
            let mut state = self.state.write().await;
            if !state.is_initialized {
                return;
            }
            state.is_initialized = false;
            state.is_cleaning_up = true;
            state.loaded.clone()
        };

        if let Some(loaded) = loaded {
            loaded.sdk.remove_all_listeners();
            if let Err(e) = loaded.sdk.deinit().await {
                tracing::error!(instance = %loaded.info.id, error = %e, "Nexus SDK deinit failed");
            }
            tracing::info!(instance = %loaded.info.id, "Nexus SDK cleaned up");
        }

        self.state.write().await.is_cleaning_up = false;
    }

    async fn ready_sdk(&self, missing: NexusError) -> Result<Arc<dyn CrossChainSdk>, NexusError> {
        let state = self.state.read().await;
        match (&state.loaded, state.is_initialized) {
            (Some(loaded), true) => Ok(loaded.sdk.clone()),
            _ => Err(missing),
        }
    }

    // ===== 操作分发 =====

    pub async fn get_unified_balances(&self) -> Result<Vec<UnifiedBalance>, NexusError> {
        let sdk = self.ready_sdk(NexusError::NotInitialized).await?;
        tracing::debug!("Fetching unified balances");
        let balances = sdk.get_unified_balances().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch balances");
            NexusError::Vendor(e)
        })?;
        tracing::debug!(tokens = balances.len(), "Unified balances fetched");
        Ok(balances)
    }

    /// 统一入口：参数原样转发，结果原样返回
    pub async fn dispatch(
        &self,
        mode: OperationMode,
        request: &OperationRequest,
    ) -> Result<Value, NexusError> {
        let sdk = self.ready_sdk(NexusError::NotLoaded).await?;

        let chain_id = request.destination_chain_id();
        if !is_supported_token(request.token()) {
            // 只提示，参数照常转发给厂商
            tracing::warn!(token = %request.token(), "Token not in the supported list");
        }
        tracing::info!(
            kind = %request.kind(),
            mode = %mode,
            token = %request.token(),
            amount = %request.amount(),
            chain_id,
            chain = find_chain(chain_id).map(|c| c.name).unwrap_or("unknown"),
            recipient = %request.recipient().map(redact_address).unwrap_or_default(),
            "Dispatching Nexus operation"
        );

        let result = match (mode, request) {
            (OperationMode::Simulate, OperationRequest::Transfer(p)) => {
                sdk.simulate_transfer(p).await
            }
            (OperationMode::Execute, OperationRequest::Transfer(p)) => sdk.transfer(p).await,
            (OperationMode::Simulate, OperationRequest::Bridge(p)) => sdk.simulate_bridge(p).await,
            (OperationMode::Execute, OperationRequest::Bridge(p)) => sdk.bridge(p).await,
            (OperationMode::Simulate, OperationRequest::BridgeAndExecute(p)) => {
                sdk.simulate_bridge_and_execute(p).await
            }
            (OperationMode::Execute, OperationRequest::BridgeAndExecute(p)) => {
                sdk.bridge_and_execute(p).await
            }
        };

        result.map_err(NexusError::Vendor)
    }

    pub async fn simulate_transfer(&self, params: TransferParams) -> Result<Value, NexusError> {
        self.dispatch(OperationMode::Simulate, &OperationRequest::Transfer(params))
            .await
    }

    pub async fn transfer(&self, params: TransferParams) -> Result<Value, NexusError> {
        self.dispatch(OperationMode::Execute, &OperationRequest::Transfer(params))
            .await
    }

    pub async fn simulate_bridge(&self, params: BridgeParams) -> Result<Value, NexusError> {
        self.dispatch(OperationMode::Simulate, &OperationRequest::Bridge(params))
            .await
    }

    pub async fn bridge(&self, params: BridgeParams) -> Result<Value, NexusError> {
        self.dispatch(OperationMode::Execute, &OperationRequest::Bridge(params))
            .await
    }

    pub async fn simulate_bridge_and_execute(
        &self,
        params: BridgeAndExecuteParams,
    ) -> Result<Value, NexusError> {
        self.dispatch(
            OperationMode::Simulate,
            &OperationRequest::BridgeAndExecute(params),
        )
        .await
    }

    pub async fn bridge_and_execute(
        &self,
        params: BridgeAndExecuteParams,
    ) -> Result<Value, NexusError> {
        self.dispatch(
            OperationMode::Execute,
            &OperationRequest::BridgeAndExecute(params),
        )
        .await
    }
}
