//! 跨链 SDK 厂商边界
//!
//! 意图解析、额度计算、余额聚合、实际桥接全部由厂商 SDK 完成，
//! 这里只定义调用契约，便于注入真实实现或测试替身。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::{
        balance::UnifiedBalance,
        network::Network,
        operation::{BridgeAndExecuteParams, BridgeParams, TransferParams},
    },
    service::{approval_policy::ApprovalDecision, provider_adapter::Eip1193Provider},
};

/// 厂商 SDK 抛出的错误（消息原样保留）
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct VendorError {
    pub message: String,
}

impl VendorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for VendorError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

pub type VendorResult<T> = Result<T, VendorError>;

/// 待批准的意图回调：返回是否放行
pub type IntentHook = Arc<dyn Fn(&Value) -> ApprovalDecision + Send + Sync>;
/// 额度授权回调：参数为需要授权的来源列表
pub type AllowanceHook = Arc<dyn Fn(&[Value]) -> ApprovalDecision + Send + Sync>;
pub type AccountListener = Arc<dyn Fn(&str) + Send + Sync>;
pub type ChainListener = Arc<dyn Fn(u64) + Send + Sync>;

/// 跨链 SDK 统一接口
#[async_trait]
pub trait CrossChainSdk: Send + Sync {
    fn network(&self) -> Network;

    /// 使用钱包 provider 初始化
    async fn initialize(&self, provider: Arc<dyn Eip1193Provider>) -> VendorResult<()>;

    async fn get_unified_balances(&self) -> VendorResult<Vec<UnifiedBalance>>;

    async fn simulate_transfer(&self, params: &TransferParams) -> VendorResult<Value>;
    async fn transfer(&self, params: &TransferParams) -> VendorResult<Value>;

    async fn simulate_bridge(&self, params: &BridgeParams) -> VendorResult<Value>;
    async fn bridge(&self, params: &BridgeParams) -> VendorResult<Value>;

    async fn simulate_bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> VendorResult<Value>;
    async fn bridge_and_execute(&self, params: &BridgeAndExecuteParams) -> VendorResult<Value>;

    fn set_on_intent_hook(&self, hook: IntentHook);
    fn set_on_allowance_hook(&self, hook: AllowanceHook);
    fn on_account_changed(&self, listener: AccountListener);
    fn on_chain_changed(&self, listener: ChainListener);
    fn remove_all_listeners(&self);

    /// 释放会话资源
    async fn deinit(&self) -> VendorResult<()>;
}

/// SDK 构造工厂：每次调用返回一个全新的实例
#[async_trait]
pub trait SdkFactory: Send + Sync {
    async fn create(&self, network: Network) -> anyhow::Result<Arc<dyn CrossChainSdk>>;
}
