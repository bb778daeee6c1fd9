//! 统一余额模型
//!
//! SDK 返回的跨链聚合余额，字段保持厂商的十进制字符串原样。
//! 汇总/过滤属于展示层逻辑，不在 dispatcher 中做。

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChainRef {
    pub id: u64,
    pub name: String,
}

/// 单链余额明细
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainBalance {
    pub chain: ChainRef,
    pub balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_in_fiat: Option<String>,
}

/// 统一余额（跨链聚合）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedBalance {
    pub symbol: String,
    pub balance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_in_fiat: Option<String>,
    #[serde(default)]
    pub breakdown: Vec<ChainBalance>,
}

impl UnifiedBalance {
    /// 余额大于零的链
    pub fn funded_breakdown(&self) -> impl Iterator<Item = &ChainBalance> {
        self.breakdown
            .iter()
            .filter(|entry| parse_decimal(&entry.balance).is_some_and(|v| v > Decimal::ZERO))
    }

    pub fn fiat_value(&self) -> Option<Decimal> {
        self.balance_in_fiat.as_deref().and_then(parse_decimal)
    }
}

/// 所有代币的法币总值；无法解析的条目忽略
pub fn total_fiat_value(balances: &[UnifiedBalance]) -> Decimal {
    balances
        .iter()
        .filter_map(UnifiedBalance::fiat_value)
        .fold(Decimal::ZERO, |acc, v| acc + v)
}

/// 展示用：保留两位小数
pub fn format_fiat(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// 展示视图：过滤零余额明细并附带法币小计
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub symbol: String,
    pub balance: String,
    pub balance_in_fiat: Option<String>,
    pub chains_with_balance: usize,
    pub breakdown: Vec<ChainBalance>,
}

impl From<&UnifiedBalance> for BalanceView {
    fn from(balance: &UnifiedBalance) -> Self {
        let breakdown: Vec<ChainBalance> = balance.funded_breakdown().cloned().collect();
        Self {
            symbol: balance.symbol.clone(),
            balance: balance.balance.clone(),
            balance_in_fiat: balance.fiat_value().map(format_fiat),
            chains_with_balance: breakdown.len(),
            breakdown,
        }
    }
}
