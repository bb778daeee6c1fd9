//! 基于 HTTP 网关的 Nexus SDK 实现
//!
//! 厂商 SDK 运行在网关侧，这里通过 JSON 接口驱动会话：
//! - `POST /v1/sessions` 建立会话（绑定钱包地址与链）
//! - `GET  /v1/sessions/{id}/balances` 统一余额
//! - `POST /v1/sessions/{id}/{operation}` 模拟/执行操作
//! - `POST /v1/sessions/{id}/approvals/{approval_id}` 回传意图/额度决策
//! - `DELETE /v1/sessions/{id}` 释放会话
//!
//! 网关响应中的 `pendingApproval` 交给已注册的 hook 决策；`events` 分发给账户/链监听器。

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::NexusConfig,
    domain::{
        balance::UnifiedBalance,
        network::Network,
        operation::{BridgeAndExecuteParams, BridgeParams, TransferParams},
    },
    infrastructure::log_redact::redact_address,
    service::{
        approval_policy::ApprovalDecision,
        nexus_sdk::{
            AccountListener, AllowanceHook, ChainListener, CrossChainSdk, IntentHook, SdkFactory,
            VendorError, VendorResult,
        },
        provider_adapter::Eip1193Provider,
    },
};

/// 单次操作最多处理的审批轮数
const MAX_APPROVAL_ROUNDS: usize = 8;

#[derive(Debug, Clone)]
struct GatewaySession {
    id: String,
    address: String,
}

#[derive(Default)]
struct GatewayHooks {
    intent: Option<IntentHook>,
    allowance: Option<AllowanceHook>,
    account_listeners: Vec<AccountListener>,
    chain_listeners: Vec<ChainListener>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCreated {
    session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum PendingApproval {
    Intent {
        id: String,
        intent: Value,
    },
    Allowance {
        id: String,
        #[serde(default)]
        sources: Vec<Value>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum GatewayEvent {
    AccountChanged { account: String },
    #[serde(rename_all = "camelCase")]
    ChainChanged { chain_id: u64 },
}

#[derive(Debug, Serialize)]
struct ApprovalReply<'a> {
    approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowances: Option<&'a [String]>,
}

pub struct GatewayNexusSdk {
    network: Network,
    base_url: String,
    client: reqwest::Client,
    session: RwLock<Option<GatewaySession>>,
    hooks: RwLock<GatewayHooks>,
}

impl GatewayNexusSdk {
    pub fn new(network: Network, base_url: &str, client: reqwest::Client) -> Self {
        Self {
            network,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            session: RwLock::new(None),
            hooks: RwLock::new(GatewayHooks::default()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn session(&self) -> VendorResult<GatewaySession> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| VendorError::new("Nexus session not initialized"))
    }

    async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> VendorResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| format!("Nexus gateway returned {}: {}", status, body));
            return Err(VendorError::new(message));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| VendorError::new(format!("Failed to parse Nexus gateway response: {}", e)))
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> VendorResult<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| VendorError::new(format!("Nexus gateway request failed: {}", e)))?;
        Self::read_response(response).await
    }

    /// 执行一次会话操作，处理期间出现的审批请求
    async fn run(&self, operation: &str, params: Value) -> VendorResult<Value> {
        let session = self.session()?;
        let mut response: Value = self
            .post(&format!("/v1/sessions/{}/{}", session.id, operation), &params)
            .await?;

        for _ in 0..MAX_APPROVAL_ROUNDS {
            self.dispatch_events(&response);

            let Some(pending) = response.get("pendingApproval").cloned() else {
                return Ok(response);
            };
            let pending: PendingApproval = serde_json::from_value(pending)
                .map_err(|e| VendorError::new(format!("Malformed approval request: {}", e)))?;

            let (approval_id, decision) = self.decide(&pending)?;
            let (approved, allowances) = match &decision {
                ApprovalDecision::Approve => (true, None),
                ApprovalDecision::GrantAllowances(choices) => (true, Some(choices.as_slice())),
                ApprovalDecision::Deny => (false, None),
            };
            let reply = serde_json::to_value(ApprovalReply {
                approved,
                allowances,
            })
            .map_err(|e| VendorError::new(e.to_string()))?;

            response = self
                .post(
                    &format!("/v1/sessions/{}/approvals/{}", session.id, approval_id),
                    &reply,
                )
                .await?;
        }

        Err(VendorError::new(format!(
            "Nexus gateway requested more than {} approvals for {}",
            MAX_APPROVAL_ROUNDS, operation
        )))
    }

    fn decide(&self, pending: &PendingApproval) -> VendorResult<(String, ApprovalDecision)> {
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());
        match pending {
            PendingApproval::Intent { id, intent } => {
                let hook = hooks
                    .intent
                    .as_ref()
                    .ok_or_else(|| VendorError::new("No intent hook registered"))?;
                Ok((id.clone(), hook(intent)))
            }
            PendingApproval::Allowance { id, sources } => {
                let hook = hooks
                    .allowance
                    .as_ref()
                    .ok_or_else(|| VendorError::new("No allowance hook registered"))?;
                Ok((id.clone(), hook(sources.as_slice())))
            }
        }
    }

    fn dispatch_events(&self, response: &Value) {
        let Some(events) = response.get("events").and_then(|e| e.as_array()) else {
            return;
        };
        let hooks = self.hooks.read().unwrap_or_else(|e| e.into_inner());

        for raw in events {
            match serde_json::from_value::<GatewayEvent>(raw.clone()) {
                Ok(GatewayEvent::AccountChanged { account }) => {
                    hooks
                        .account_listeners
                        .iter()
                        .for_each(|l| l(account.as_str()));
                }
                Ok(GatewayEvent::ChainChanged { chain_id }) => {
                    hooks.chain_listeners.iter().for_each(|l| l(chain_id));
                }
                Err(e) => tracing::debug!(error = %e, "Ignoring unknown gateway event"),
            }
        }
    }

    fn to_params<T: Serialize>(params: &T) -> VendorResult<Value> {
        serde_json::to_value(params).map_err(|e| VendorError::new(e.to_string()))
    }
}

#[async_trait]
impl CrossChainSdk for GatewayNexusSdk {
    fn network(&self) -> Network {
        self.network
    }

    async fn initialize(&self, provider: Arc<dyn Eip1193Provider>) -> VendorResult<()> {
        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|e| VendorError::new(format!("wallet provider error: {}", e)))?;
        let address = accounts
            .as_array()
            .and_then(|a| a.first())
            .and_then(|a| a.as_str())
            .ok_or_else(|| VendorError::new("wallet provider returned no accounts"))?
            .to_string();

        let chain_id = provider
            .request("eth_chainId", json!([]))
            .await
            .map_err(|e| VendorError::new(format!("wallet provider error: {}", e)))?;

        let created: SessionCreated = self
            .post(
                "/v1/sessions",
                &json!({
                    "network": self.network,
                    "address": address,
                    "chainId": chain_id,
                }),
            )
            .await?;

        tracing::debug!(session = %created.session_id, "Nexus gateway session created");
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(GatewaySession {
            id: created.session_id,
            address,
        });
        Ok(())
    }

    async fn get_unified_balances(&self) -> VendorResult<Vec<UnifiedBalance>> {
        let session = self.session()?;
        let response = self
            .client
            .get(format!("{}/v1/sessions/{}/balances", self.base_url, session.id))
            .send()
            .await
            .map_err(|e| VendorError::new(format!("Nexus gateway request failed: {}", e)))?;
        Self::read_response(response).await
    }

    async fn simulate_transfer(&self, params: &TransferParams) -> VendorResult<Value> {
        self.run("simulate-transfer", Self::to_params(params)?).await
    }

    async fn transfer(&self, params: &TransferParams) -> VendorResult<Value> {
        self.run("transfer", Self::to_params(params)?).await
    }

    async fn simulate_bridge(&self, params: &BridgeParams) -> VendorResult<Value> {
        self.run("simulate-bridge", Self::to_params(params)?).await
    }

    async fn bridge(&self, params: &BridgeParams) -> VendorResult<Value> {
        self.run("bridge", Self::to_params(params)?).await
    }

    async fn simulate_bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> VendorResult<Value> {
        self.run("simulate-bridge-and-execute", Self::to_params(params)?)
            .await
    }

    async fn bridge_and_execute(&self, params: &BridgeAndExecuteParams) -> VendorResult<Value> {
        self.run("bridge-and-execute", Self::to_params(params)?).await
    }

    fn set_on_intent_hook(&self, hook: IntentHook) {
        self.hooks.write().unwrap_or_else(|e| e.into_inner()).intent = Some(hook);
    }

    fn set_on_allowance_hook(&self, hook: AllowanceHook) {
        self.hooks.write().unwrap_or_else(|e| e.into_inner()).allowance = Some(hook);
    }

    fn on_account_changed(&self, listener: AccountListener) {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .account_listeners
            .push(listener);
    }

    fn on_chain_changed(&self, listener: ChainListener) {
        self.hooks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .chain_listeners
            .push(listener);
    }

    fn remove_all_listeners(&self) {
        *self.hooks.write().unwrap_or_else(|e| e.into_inner()) = GatewayHooks::default();
    }

    async fn deinit(&self) -> VendorResult<()> {
        let session = self.session.write().unwrap_or_else(|e| e.into_inner()).take();
        let Some(session) = session else {
            return Ok(());
        };

        tracing::debug!(
            session = %session.id,
            address = %redact_address(&session.address),
            "Closing Nexus gateway session"
        );
        let response = self
            .client
            .delete(format!("{}/v1/sessions/{}", self.base_url, session.id))
            .send()
            .await
            .map_err(|e| VendorError::new(format!("Nexus gateway request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VendorError::new(format!(
                "Nexus gateway refused to close session: {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// 按网络选择网关地址构造 SDK
pub struct GatewaySdkFactory {
    config: NexusConfig,
    client: reqwest::Client,
}

impl GatewaySdkFactory {
    pub fn new(config: NexusConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl SdkFactory for GatewaySdkFactory {
    async fn create(&self, network: Network) -> Result<Arc<dyn CrossChainSdk>> {
        let base_url = self.config.gateway_url(network);
        if base_url.is_empty() {
            return Err(anyhow!("No Nexus gateway configured for {}", network));
        }
        Ok(Arc::new(GatewayNexusSdk::new(
            network,
            base_url,
            self.client.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::infrastructure::logging::capture::capture_logs;

    fn sdk() -> GatewayNexusSdk {
        GatewayNexusSdk::new(
            Network::Testnet,
            "https://nexus-gateway.example/",
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(sdk().base_url(), "https://nexus-gateway.example");
        assert_eq!(sdk().network(), Network::Testnet);
    }

    #[tokio::test]
    async fn test_operations_require_session() {
        let err = sdk()
            .simulate_bridge(&BridgeParams {
                token: "USDC".into(),
                amount: rust_decimal::Decimal::ONE,
                chain_id: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.message, "Nexus session not initialized");
        assert!(sdk().deinit().await.is_ok());
    }

    #[test]
    fn test_pending_approval_routes_to_hooks() {
        let sdk = sdk();
        assert!(sdk
            .decide(&PendingApproval::Intent {
                id: "a1".into(),
                intent: json!({}),
            })
            .is_err());

        sdk.set_on_allowance_hook(Arc::new(|sources: &[Value]| {
            ApprovalDecision::GrantAllowances(vec!["min".to_string(); sources.len()])
        }));
        let (id, decision) = sdk
            .decide(&PendingApproval::Allowance {
                id: "a2".into(),
                sources: vec![json!({ "chain": 1 }), json!({ "chain": 10 })],
            })
            .unwrap();
        assert_eq!(id, "a2");
        assert_eq!(
            decision,
            ApprovalDecision::GrantAllowances(vec!["min".into(), "min".into()])
        );

        // 拆除后 hook 一并释放
        sdk.remove_all_listeners();
        assert!(sdk
            .decide(&PendingApproval::Allowance {
                id: "a3".into(),
                sources: vec![json!({ "chain": 1 })],
            })
            .is_err());
    }

    #[test]
    fn test_events_reach_listeners_until_removed() {
        let sdk = sdk();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        sdk.on_chain_changed(Arc::new(move |chain_id: u64| {
            assert_eq!(chain_id, 10);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let response = json!({ "events": [{ "type": "chainChanged", "chainId": 10 }, { "type": "other" }] });
        sdk.dispatch_events(&response);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        sdk.remove_all_listeners();
        sdk.dispatch_events(&response);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deinit_redacts_session_address() {
        let (logs, _guard) = capture_logs();
        // 无监听端口，关闭请求失败
        let sdk = GatewayNexusSdk::new(
            Network::Mainnet,
            "http://127.0.0.1:9",
            reqwest::Client::new(),
        );
        *sdk.session.write().unwrap() = Some(GatewaySession {
            id: "s-1".into(),
            address: "0x742d35Cc6634C0532925a3b844Bc9e7595f0bFd2".into(),
        });

        assert!(sdk.deinit().await.is_err());
        assert!(sdk.session.read().unwrap().is_none());

        let output = logs.contents();
        assert!(output.contains("Closing Nexus gateway session"));
        assert!(output.contains("0x742d...bFd2"));
        assert!(!output.contains("0x742d35Cc6634C0532925a3b844Bc9e7595f0bFd2"));
    }

    #[tokio::test]
    async fn test_factory_requires_gateway_url() {
        let config = NexusConfig {
            default_network: Network::Mainnet,
            mainnet_gateway_url: "https://mainnet.nexus-gateway.example".into(),
            testnet_gateway_url: String::new(),
            request_timeout_secs: 5,
        };
        let factory = GatewaySdkFactory::new(config).unwrap();
        let sdk = factory.create(Network::Mainnet).await.unwrap();
        assert_eq!(sdk.network(), Network::Mainnet);
        assert!(factory.create(Network::Testnet).await.is_err());
    }
}
