//! 测试辅助模块
//! 提供 SDK / 钱包替身和应用状态构造
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use nexuscore::{
    app_state::AppState,
    config::{Config, JwtConfig, LoggingConfig, NexusConfig, ServerConfig},
    domain::{
        balance::{ChainBalance, ChainRef, UnifiedBalance},
        network::Network,
        operation::{BridgeAndExecuteParams, BridgeParams, TransferParams},
    },
    infrastructure::jwt,
    service::{
        approval_policy::ApprovalDecision,
        nexus_sdk::{
            AccountListener, AllowanceHook, ChainListener, CrossChainSdk, IntentHook, SdkFactory,
            VendorError, VendorResult,
        },
        provider_adapter::{
            ConfiguredWalletDirectory, ConnectedWallet, Eip1193Provider, ProviderAccessor,
        },
    },
};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const TEST_JWT_SECRET: &str = "test_secret_that_is_at_least_32_characters_long";
pub const WALLET_A: &str = "0xAAA0000000000000000000000000000000000001";
pub const RECIPIENT_B: &str = "0xBBB0000000000000000000000000000000000002";

/// 1.5 ETH，Ethereum 1.0 + Optimism 0.5，合计 3000.00
pub fn eth_balances() -> Vec<UnifiedBalance> {
    vec![UnifiedBalance {
        symbol: "ETH".into(),
        balance: "1.5".into(),
        balance_in_fiat: Some("3000.00".into()),
        breakdown: vec![
            ChainBalance {
                chain: ChainRef {
                    id: 1,
                    name: "Ethereum".into(),
                },
                balance: "1.0".into(),
                balance_in_fiat: Some("2000.00".into()),
            },
            ChainBalance {
                chain: ChainRef {
                    id: 10,
                    name: "Optimism".into(),
                },
                balance: "0.5".into(),
                balance_in_fiat: Some("1000.00".into()),
            },
        ],
    }]
}

/// 工厂级别的替身行为配置，对之后创建的实例生效
#[derive(Default)]
pub struct MockBehavior {
    pub init_error: Mutex<Option<String>>,
    pub balance_error: Mutex<Option<String>>,
    pub operation_error: Mutex<Option<String>>,
    pub deinit_error: Mutex<Option<String>>,
    /// 设置后 initialize 等待通知
    pub init_gate: Mutex<Option<Arc<Notify>>>,
    /// 设置后操作等待通知
    pub operation_gate: Mutex<Option<Arc<Notify>>>,
    /// 设置后余额查询等待通知
    pub balance_gate: Mutex<Option<Arc<Notify>>>,
    /// 设置后 deinit 等待通知
    pub deinit_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockBehavior {
    pub fn fail_init(&self, message: &str) {
        *self.init_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn succeed_init(&self) {
        *self.init_error.lock().unwrap() = None;
    }
}

pub struct MockSdk {
    pub serial: usize,
    pub network: Network,
    behavior: Arc<MockBehavior>,
    pub initialize_calls: AtomicUsize,
    pub operation_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub hook_registrations: AtomicUsize,
    pub listener_registrations: AtomicUsize,
    pub listeners_removed: AtomicBool,
    pub deinit_calls: AtomicUsize,
    pub last_operation: Mutex<Option<(String, Value)>>,
    intent_hook: Mutex<Option<IntentHook>>,
    allowance_hook: Mutex<Option<AllowanceHook>>,
}

impl MockSdk {
    fn new(serial: usize, network: Network, behavior: Arc<MockBehavior>) -> Self {
        Self {
            serial,
            network,
            behavior,
            initialize_calls: AtomicUsize::new(0),
            operation_calls: AtomicUsize::new(0),
            balance_calls: AtomicUsize::new(0),
            hook_registrations: AtomicUsize::new(0),
            listener_registrations: AtomicUsize::new(0),
            listeners_removed: AtomicBool::new(false),
            deinit_calls: AtomicUsize::new(0),
            last_operation: Mutex::new(None),
            intent_hook: Mutex::new(None),
            allowance_hook: Mutex::new(None),
        }
    }

    /// 模拟厂商在执行过程中请求意图 / 额度审批
    fn ask_approvals(&self) -> (Option<ApprovalDecision>, Option<ApprovalDecision>) {
        let intent = self
            .intent_hook
            .lock()
            .unwrap()
            .as_ref()
            .map(|hook| hook(&json!({ "sources": [1, 10] })));
        let allowance = self
            .allowance_hook
            .lock()
            .unwrap()
            .as_ref()
            .map(|hook| hook([json!({ "chain": 1, "token": "USDC" })].as_slice()));
        (intent, allowance)
    }

    async fn operation(&self, name: &str, params: Value) -> VendorResult<Value> {
        self.operation_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_operation.lock().unwrap() = Some((name.to_string(), params.clone()));

        let gate = self.behavior.operation_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(message) = self.behavior.operation_error.lock().unwrap().clone() {
            return Err(VendorError::new(message));
        }

        let (intent, allowance) = self.ask_approvals();
        Ok(json!({
            "operation": name,
            "params": params,
            "intentApproved": intent.map(|d| d.is_approved()),
            "allowance": allowance,
        }))
    }
}

#[async_trait]
impl CrossChainSdk for MockSdk {
    fn network(&self) -> Network {
        self.network
    }

    async fn initialize(&self, provider: Arc<dyn Eip1193Provider>) -> VendorResult<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        provider.request("eth_requestAccounts", json!([])).await?;

        let gate = self.behavior.init_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.behavior.init_error.lock().unwrap().clone() {
            Some(message) => Err(VendorError::new(message)),
            None => Ok(()),
        }
    }

    async fn get_unified_balances(&self) -> VendorResult<Vec<UnifiedBalance>> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.behavior.balance_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.behavior.balance_error.lock().unwrap().clone() {
            Some(message) => Err(VendorError::new(message)),
            None => Ok(eth_balances()),
        }
    }

    async fn simulate_transfer(&self, params: &TransferParams) -> VendorResult<Value> {
        self.operation("simulateTransfer", serde_json::to_value(params).unwrap())
            .await
    }

    async fn transfer(&self, params: &TransferParams) -> VendorResult<Value> {
        self.operation("transfer", serde_json::to_value(params).unwrap())
            .await
    }

    async fn simulate_bridge(&self, params: &BridgeParams) -> VendorResult<Value> {
        self.operation("simulateBridge", serde_json::to_value(params).unwrap())
            .await
    }

    async fn bridge(&self, params: &BridgeParams) -> VendorResult<Value> {
        self.operation("bridge", serde_json::to_value(params).unwrap())
            .await
    }

    async fn simulate_bridge_and_execute(
        &self,
        params: &BridgeAndExecuteParams,
    ) -> VendorResult<Value> {
        self.operation(
            "simulateBridgeAndExecute",
            serde_json::to_value(params).unwrap(),
        )
        .await
    }

    async fn bridge_and_execute(&self, params: &BridgeAndExecuteParams) -> VendorResult<Value> {
        self.operation("bridgeAndExecute", serde_json::to_value(params).unwrap())
            .await
    }

    fn set_on_intent_hook(&self, hook: IntentHook) {
        self.hook_registrations.fetch_add(1, Ordering::SeqCst);
        *self.intent_hook.lock().unwrap() = Some(hook);
    }

    fn set_on_allowance_hook(&self, hook: AllowanceHook) {
        *self.allowance_hook.lock().unwrap() = Some(hook);
    }

    fn on_account_changed(&self, _listener: AccountListener) {
        self.listener_registrations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_chain_changed(&self, _listener: ChainListener) {
        self.listener_registrations.fetch_add(1, Ordering::SeqCst);
    }

    fn remove_all_listeners(&self) {
        self.listeners_removed.store(true, Ordering::SeqCst);
    }

    async fn deinit(&self) -> VendorResult<()> {
        self.deinit_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.behavior.deinit_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.behavior.deinit_error.lock().unwrap().clone() {
            Some(message) => Err(VendorError::new(message)),
            None => Ok(()),
        }
    }
}

/// 记录每个创建出的实例
#[derive(Default)]
pub struct MockFactory {
    pub behavior: Arc<MockBehavior>,
    pub fail_create: AtomicBool,
    pub created: Mutex<Vec<Arc<MockSdk>>>,
}

impl MockFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn latest(&self) -> Arc<MockSdk> {
        self.created
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no SDK instance created")
    }

    pub fn total_operation_calls(&self) -> usize {
        self.created
            .lock()
            .unwrap()
            .iter()
            .map(|sdk| sdk.operation_calls.load(Ordering::SeqCst))
            .sum()
    }
}

#[async_trait]
impl SdkFactory for MockFactory {
    async fn create(&self, network: Network) -> Result<Arc<dyn CrossChainSdk>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(anyhow!("Failed to construct Nexus SDK for {}", network));
        }
        let mut created = self.created.lock().unwrap();
        let sdk = Arc::new(MockSdk::new(created.len() + 1, network, self.behavior.clone()));
        created.push(sdk.clone());
        Ok(sdk)
    }
}

pub struct StaticProvider {
    pub address: String,
}

#[async_trait]
impl Eip1193Provider for StaticProvider {
    async fn request(&self, method: &str, _params: Value) -> Result<Value> {
        match method {
            "eth_accounts" | "eth_requestAccounts" => Ok(json!([self.address])),
            "eth_chainId" => Ok(json!("0x1")),
            other => Err(anyhow!("unsupported method {}", other)),
        }
    }
}

/// `has_provider = false` 时所有访问方式都不可用
pub struct MockWallet {
    pub address: String,
    pub has_provider: bool,
}

impl MockWallet {
    pub fn connected(address: &str) -> Arc<dyn ConnectedWallet> {
        Arc::new(Self {
            address: address.to_string(),
            has_provider: true,
        })
    }

    pub fn without_provider(address: &str) -> Arc<dyn ConnectedWallet> {
        Arc::new(Self {
            address: address.to_string(),
            has_provider: false,
        })
    }
}

#[async_trait]
impl ConnectedWallet for MockWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn provider(
        &self,
        accessor: ProviderAccessor,
    ) -> Result<Option<Arc<dyn Eip1193Provider>>> {
        match (self.has_provider, accessor) {
            (true, ProviderAccessor::Ethereum) => Ok(Some(Arc::new(StaticProvider {
                address: self.address.clone(),
            }))),
            (true, ProviderAccessor::Legacy) => Ok(None),
            (false, _) => Err(anyhow!("wallet has no EVM provider")),
        }
    }
}

pub fn wallet_directory(wallets: Vec<Arc<dyn ConnectedWallet>>) -> Arc<ConfiguredWalletDirectory> {
    Arc::new(ConfiguredWalletDirectory::new(wallets))
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
            frontend_url: None,
        },
        logging: LoggingConfig {
            level: "debug".into(),
            format: "text".into(),
            enable_file_logging: false,
            log_file_path: None,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.into(),
        },
        nexus: NexusConfig {
            default_network: Network::Mainnet,
            mainnet_gateway_url: "http://127.0.0.1:8790".into(),
            testnet_gateway_url: "http://127.0.0.1:8791".into(),
            request_timeout_secs: 5,
        },
        wallets: vec![],
    }
}

/// 创建测试应用状态（替身工厂 + 单钱包）
pub fn create_test_app_state(factory: Arc<MockFactory>) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(test_config()),
        factory,
        wallet_directory(vec![MockWallet::connected(WALLET_A)]),
    ))
}

pub fn bearer_token() -> String {
    let claims = jwt::Claims::new("user-1", Some(WALLET_A.to_string()), 3600);
    format!("Bearer {}", jwt::generate_token(&claims, TEST_JWT_SECRET).unwrap())
}
