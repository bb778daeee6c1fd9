use std::sync::Arc;

use crate::{
    config::Config,
    service::{
        gateway_sdk::GatewaySdkFactory,
        nexus_controller::NexusController,
        nexus_sdk::SdkFactory,
        nexus_sdk_service::NexusSdkService,
        provider_adapter::{ConfiguredWalletDirectory, WalletDirectory},
    },
};

/// 应用状态
/// 包含所有共享资源；SDK 服务只在这里构造一次
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub wallets: Arc<dyn WalletDirectory>,
    pub controller: Arc<NexusController>,
}

impl AppState {
    /// 用注入的工厂和钱包目录构造（测试使用替身）
    pub fn new(
        config: Arc<Config>,
        factory: Arc<dyn SdkFactory>,
        wallets: Arc<dyn WalletDirectory>,
    ) -> Self {
        let service = Arc::new(NexusSdkService::new(factory));
        let controller = Arc::new(NexusController::new(
            service,
            wallets.clone(),
            config.nexus.default_network,
        ));

        Self {
            config,
            wallets,
            controller,
        }
    }

    /// 按配置构造网关 SDK 工厂和 RPC 钱包
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let factory = Arc::new(GatewaySdkFactory::new(config.nexus.clone())?);
        let wallets = Arc::new(ConfiguredWalletDirectory::from_config(&config.wallets)?);
        tracing::info!(
            wallets = config.wallets.len(),
            network = %config.nexus.default_network,
            "Nexus state constructed"
        );
        Ok(Self::new(config, factory, wallets))
    }
}
