//! NexusCore - 跨链 SDK 生命周期服务
//!
//! 加载 / 初始化 / 销毁厂商 SDK，分发余额、转账、桥接、桥接后执行操作，
//! 并通过 HTTP API 暴露仪表盘状态

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

// 重新导出常用类型
pub use app_state::AppState;
pub use error::{AppError, AppErrorCode};

pub mod prelude {
    pub use crate::{
        app_state::AppState,
        domain::{network::Network, operation::OperationRequest},
        error::{AppError, AppErrorCode},
        service::{
            nexus_controller::NexusController,
            nexus_sdk_service::{NexusError, NexusSdkService, SdkStatus},
        },
    };
}
