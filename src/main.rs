//! NexusCore 主入口
//! 跨链 SDK 生命周期服务 + 仪表盘 API

use std::sync::Arc;

use anyhow::Result;
use nexuscore::{api, app_state::AppState, config::Config, infrastructure::logging};

const DEFAULT_JWT_SECRET_PREFIX: &str = "default-jwt-secret";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载环境变量
    dotenvy::dotenv().ok();

    // 2. 加载配置（CONFIG_PATH 指向的 TOML 优先）
    let config_path = std::env::var("CONFIG_PATH").ok();
    let config = Config::from_env_and_file(config_path.as_deref())?;

    // 3. 初始化日志，guard 持有到进程退出
    let _log_guard = logging::init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    if config.jwt.secret.starts_with(DEFAULT_JWT_SECRET_PREFIX) {
        tracing::warn!("JWT_SECRET not set, using the built-in development secret");
    }
    config.validate()?;

    tracing::info!(
        network = %config.nexus.default_network,
        bind_addr = %config.server.bind_addr,
        "Starting NexusCore"
    );

    // 4. 构造应用状态并挂载控制器（加载默认网络 SDK）
    let config = Arc::new(config);
    let state = Arc::new(AppState::from_config(config.clone())?);
    let mount_guard = state.controller.mount().await;

    // 5. 启动服务器
    let app = api::routes(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;

    tracing::info!(addr = %config.server.bind_addr, "Server listening");
    tracing::info!(url = %format!("http://{}/docs", config.server.bind_addr), "Swagger UI");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 6. 卸载：释放 SDK 会话
    state.controller.unmount().await;
    drop(mount_guard);
    tracing::info!("NexusCore stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
