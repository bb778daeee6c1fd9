//! Service 模块
//!
//! - `nexus_sdk`: 厂商 SDK 边界
//! - `nexus_sdk_service`: 生命周期 + 操作分发
//! - `nexus_controller`: 仪表盘状态绑定
//! - `gateway_sdk`: 基于 HTTP 网关的 SDK 实现

pub mod approval_policy;
pub mod gateway_sdk;
pub mod init_failure;
pub mod nexus_controller;
pub mod nexus_sdk;
pub mod nexus_sdk_service;
pub mod provider_adapter;
