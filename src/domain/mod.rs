//! Domain 模块
//!
//! 网络、操作参数、余额模型和链/代币静态配置

pub mod balance;
pub mod chain_config;
pub mod network;
pub mod operation;

// 重新导出常用类型
pub use balance::UnifiedBalance;
pub use network::Network;
pub use operation::{OperationKind, OperationMode, OperationRequest};
