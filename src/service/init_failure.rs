//! 初始化失败分类
//!
//! 厂商只给出错误文本，按有序规则表做子串匹配，第一条命中即生效。
//! 新增分类只需在 `INIT_FAILURE_RULES` 中追加一行。

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitFailureCategory {
    /// 厂商内部初始化失败（通常是钱包签名弹窗被拒）
    VendorSetup,
    /// 用户拒绝或取消
    UserCancelled,
    /// 钱包 / provider 缺失或异常
    WalletConnection,
    Generic,
}

impl InitFailureCategory {
    /// 是否提示用户重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VendorSetup | Self::UserCancelled)
    }
}

/// 分类后的初始化失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct InitFailure {
    pub category: InitFailureCategory,
    /// 面向用户的提示
    pub message: String,
    /// 厂商原始错误
    pub cause: String,
}

struct FailureRule {
    category: InitFailureCategory,
    patterns: &'static [&'static str],
    message: &'static str,
}

const INIT_FAILURE_RULES: &[FailureRule] = &[
    FailureRule {
        category: InitFailureCategory::VendorSetup,
        patterns: &["Failed to initialize CA SDK", "Error initializing CA", "CA SDK"],
        message: "Initialization was rejected. Please approve the wallet connection prompt and try again.",
    },
    FailureRule {
        category: InitFailureCategory::UserCancelled,
        patterns: &["User rejected", "User denied", "rejected"],
        message: "Initialization was cancelled. Please try again and approve the connection.",
    },
    FailureRule {
        category: InitFailureCategory::WalletConnection,
        patterns: &["MetaMask", "wallet", "provider"],
        message: "Wallet connection failed. Please check your wallet and try again.",
    },
];

pub fn classify_init_failure(cause: &str) -> InitFailure {
    let matched = INIT_FAILURE_RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| cause.contains(p)));

    match matched {
        Some(rule) => InitFailure {
            category: rule.category,
            message: rule.message.to_string(),
            cause: cause.to_string(),
        },
        None => InitFailure {
            category: InitFailureCategory::Generic,
            message: format!("Initialization failed: {}", cause),
            cause: cause.to_string(),
        },
    }
}
