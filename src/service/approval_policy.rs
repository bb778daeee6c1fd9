//! 意图 / 额度授权策略
//!
//! 默认策略自动放行所有意图并授予最小额度，没有用户确认环节。
//! 需要确认界面时替换为自定义 `ApprovalPolicy` 即可，生命周期服务无需改动。

use serde::Serialize;
use serde_json::Value;

use crate::infrastructure::log_redact::redact_addresses;

/// 需要决策的请求
#[derive(Debug, Clone, Copy)]
pub enum ApprovalRequest<'a> {
    /// 厂商生成的跨链意图
    Intent(&'a Value),
    /// 需要授权额度的来源
    Allowance(&'a [Value]),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision", content = "allowances")]
pub enum ApprovalDecision {
    Approve,
    /// 每个来源对应一个额度选项（"min" / "max" / 具体数值）
    GrantAllowances(Vec<String>),
    Deny,
}

impl ApprovalDecision {
    pub fn is_approved(&self) -> bool {
        !matches!(self, Self::Deny)
    }
}

pub trait ApprovalPolicy: Send + Sync {
    fn decide(&self, request: ApprovalRequest<'_>) -> ApprovalDecision;
}

/// 自动批准
#[derive(Debug, Default, Clone)]
pub struct AutoApprovePolicy;

impl ApprovalPolicy for AutoApprovePolicy {
    fn decide(&self, request: ApprovalRequest<'_>) -> ApprovalDecision {
        match request {
            ApprovalRequest::Intent(intent) => {
                tracing::info!(
                    intent = %redact_addresses(&intent.to_string()),
                    "Intent received, auto-approving"
                );
                ApprovalDecision::Approve
            }
            ApprovalRequest::Allowance(sources) => {
                tracing::info!(
                    sources = sources.len(),
                    "Allowance needed, granting minimum allowance"
                );
                ApprovalDecision::GrantAllowances(vec!["min".to_string()])
            }
        }
    }
}

/// 全部拒绝，用于只读/演示环境
#[derive(Debug, Default, Clone)]
pub struct DenyAllPolicy;

impl ApprovalPolicy for DenyAllPolicy {
    fn decide(&self, request: ApprovalRequest<'_>) -> ApprovalDecision {
        match request {
            ApprovalRequest::Intent(intent) => tracing::warn!(
                intent = %redact_addresses(&intent.to_string()),
                "Intent denied by policy"
            ),
            ApprovalRequest::Allowance(sources) => tracing::warn!(
                sources = sources.len(),
                "Allowance denied by policy"
            ),
        }
        ApprovalDecision::Deny
    }
}
