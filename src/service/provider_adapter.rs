//! 钱包 / Provider 适配层
//!
//! 从当前钱包会话获取可发 JSON-RPC 请求的 provider：
//! 先走主访问方式，失败后依次尝试备选方式，全部失败则报错。

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::providers::{Http, Provider};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    config::WalletConfig, infrastructure::log_redact::redact_address,
    service::nexus_sdk_service::NexusError,
};

/// EIP-1193 风格的链 provider
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

/// 获取 provider 的方式，按优先级排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderAccessor {
    /// 钱包自带的 EVM provider
    Ethereum,
    /// 旧版注入方式
    Legacy,
}

/// 已连接的钱包
#[async_trait]
pub trait ConnectedWallet: Send + Sync {
    fn address(&self) -> &str;

    /// `Ok(None)` 表示该方式不可用
    async fn provider(&self, accessor: ProviderAccessor)
        -> Result<Option<Arc<dyn Eip1193Provider>>>;
}

/// 身份层提供的钱包列表
#[async_trait]
pub trait WalletDirectory: Send + Sync {
    async fn list_wallets(&self) -> Result<Vec<Arc<dyn ConnectedWallet>>>;
}

pub const NO_PROVIDER_MESSAGE: &str =
    "No Ethereum provider found. Please ensure you have connected an EVM wallet.";

/// Provider 解析器
#[derive(Debug, Clone)]
pub struct ProviderResolver {
    accessors: Vec<ProviderAccessor>,
}

impl Default for ProviderResolver {
    fn default() -> Self {
        Self::new(vec![ProviderAccessor::Ethereum, ProviderAccessor::Legacy])
    }
}

impl ProviderResolver {
    pub fn new(accessors: Vec<ProviderAccessor>) -> Self {
        Self { accessors }
    }

    pub async fn resolve(
        &self,
        wallet: &dyn ConnectedWallet,
    ) -> Result<Arc<dyn Eip1193Provider>, NexusError> {
        let address = redact_address(wallet.address());

        for accessor in &self.accessors {
            match wallet.provider(*accessor).await {
                Ok(Some(provider)) => {
                    tracing::debug!(wallet = %address, accessor = ?accessor, "Provider resolved");
                    return Ok(provider);
                }
                Ok(None) => {
                    tracing::debug!(wallet = %address, accessor = ?accessor, "Provider accessor unavailable");
                }
                Err(e) => {
                    tracing::warn!(
                        wallet = %address,
                        accessor = ?accessor,
                        error = %e,
                        "Provider accessor failed, trying alternative methods"
                    );
                }
            }
        }

        Err(NexusError::ProviderUnavailable(NO_PROVIDER_MESSAGE.to_string()))
    }
}

/// 基于 ethers HTTP provider 的钱包 provider
///
/// 账户查询直接返回绑定地址，其余方法透传到 RPC 节点
pub struct EthersRpcProvider {
    address: String,
    inner: Provider<Http>,
}

impl EthersRpcProvider {
    pub fn connect(address: &str, rpc_url: &str) -> Result<Self> {
        let inner = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid RPC url: {}", rpc_url))?;
        Ok(Self {
            address: address.to_string(),
            inner,
        })
    }
}

#[async_trait]
impl Eip1193Provider for EthersRpcProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!([self.address])),
            _ => self
                .inner
                .request::<Value, Value>(method, params)
                .await
                .map_err(|e| anyhow!("RPC {} failed: {}", method, e)),
        }
    }
}

/// 通过配置绑定的钱包（地址 + RPC 端点）
pub struct RpcWallet {
    address: String,
    provider: Arc<dyn Eip1193Provider>,
}

impl RpcWallet {
    pub fn new(address: &str, rpc_url: &str) -> Result<Self> {
        let provider = EthersRpcProvider::connect(address, rpc_url)?;
        Ok(Self {
            address: address.to_string(),
            provider: Arc::new(provider),
        })
    }
}

#[async_trait]
impl ConnectedWallet for RpcWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn provider(
        &self,
        accessor: ProviderAccessor,
    ) -> Result<Option<Arc<dyn Eip1193Provider>>> {
        match accessor {
            ProviderAccessor::Ethereum => Ok(Some(self.provider.clone())),
            ProviderAccessor::Legacy => Ok(None),
        }
    }
}

/// 静态钱包目录
#[derive(Default)]
pub struct ConfiguredWalletDirectory {
    wallets: Vec<Arc<dyn ConnectedWallet>>,
}

impl ConfiguredWalletDirectory {
    pub fn new(wallets: Vec<Arc<dyn ConnectedWallet>>) -> Self {
        Self { wallets }
    }

    pub fn from_config(configs: &[WalletConfig]) -> Result<Self> {
        let wallets = configs
            .iter()
            .map(|c| {
                RpcWallet::new(&c.address, &c.rpc_url)
                    .map(|w| Arc::new(w) as Arc<dyn ConnectedWallet>)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(wallets))
    }
}

#[async_trait]
impl WalletDirectory for ConfiguredWalletDirectory {
    async fn list_wallets(&self) -> Result<Vec<Arc<dyn ConnectedWallet>>> {
        Ok(self.wallets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticProvider;

    #[async_trait]
    impl Eip1193Provider for StaticProvider {
        async fn request(&self, _method: &str, _params: Value) -> Result<Value> {
            Ok(json!("0x1"))
        }
    }

    /// 主方式失败、备选方式成功
    struct FlakyWallet {
        legacy: bool,
    }

    #[async_trait]
    impl ConnectedWallet for FlakyWallet {
        fn address(&self) -> &str {
            "0x00000000000000000000000000000000000000a1"
        }

        async fn provider(
            &self,
            accessor: ProviderAccessor,
        ) -> Result<Option<Arc<dyn Eip1193Provider>>> {
            match accessor {
                ProviderAccessor::Ethereum => Err(anyhow!("getEthereumProvider failed")),
                ProviderAccessor::Legacy if self.legacy => Ok(Some(Arc::new(StaticProvider))),
                ProviderAccessor::Legacy => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_resolver_falls_back_to_alternate_accessor() {
        let resolver = ProviderResolver::default();
        let provider = resolver.resolve(&FlakyWallet { legacy: true }).await.unwrap();
        assert_eq!(provider.request("eth_chainId", json!([])).await.unwrap(), json!("0x1"));
    }

    #[tokio::test]
    async fn test_resolver_fails_when_no_accessor_succeeds() {
        let resolver = ProviderResolver::default();
        let err = resolver
            .resolve(&FlakyWallet { legacy: false })
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("No Ethereum provider found"));
    }

    #[tokio::test]
    async fn test_rpc_wallet_reports_bound_account() {
        let wallet = RpcWallet::new(
            "0x00000000000000000000000000000000000000a1",
            "http://127.0.0.1:8545",
        )
        .unwrap();
        let provider = wallet
            .provider(ProviderAccessor::Ethereum)
            .await
            .unwrap()
            .unwrap();
        let accounts = provider.request("eth_accounts", json!([])).await.unwrap();
        assert_eq!(accounts, json!(["0x00000000000000000000000000000000000000a1"]));
        assert!(wallet.provider(ProviderAccessor::Legacy).await.unwrap().is_none());
    }

    #[test]
    fn test_rpc_wallet_rejects_invalid_url() {
        assert!(RpcWallet::new("0xabc", "not a url").is_err());
    }
}
