//! Nexus 操作参数模型
//!
//! 三类操作（transfer / bridge / bridge-and-execute），每类都有 simulate 与 execute 两种模式。
//! 参数为纯值对象，原样转发给 SDK。

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// 转账参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub token: String,
    #[schema(value_type = String, example = "100")]
    pub amount: Decimal,
    /// 目标链 ID
    #[serde(alias = "destinationChainId")]
    pub chain_id: u64,
    #[serde(alias = "recipientAddress")]
    pub recipient: String,
}

/// 跨链桥参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BridgeParams {
    pub token: String,
    #[schema(value_type = String, example = "25.5")]
    pub amount: Decimal,
    #[serde(alias = "destinationChainId")]
    pub chain_id: u64,
}

/// 桥接后在目标链执行的合约调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSpec {
    pub contract_address: String,
    #[schema(value_type = Object)]
    pub contract_abi: Value,
    pub function_name: String,
    #[schema(value_type = Vec<Object>)]
    pub function_params: Vec<Value>,
    /// 原生币数量（wei，十进制字符串）
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "nativeValue")]
    pub value: Option<String>,
    pub token_approval: TokenApproval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenApproval {
    pub token: String,
    /// 最小单位数量
    pub amount: String,
}

/// 桥接并执行参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BridgeAndExecuteParams {
    #[serde(alias = "destinationChainId")]
    pub to_chain_id: u64,
    pub token: String,
    #[schema(value_type = String, example = "10")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "recipientAddress")]
    pub recipient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute: Option<ExecuteSpec>,
}

/// 操作类型（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Transfer,
    Bridge,
    BridgeAndExecute,
}

impl OperationKind {
    pub const ALL: [OperationKind; 3] = [Self::Transfer, Self::Bridge, Self::BridgeAndExecute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Bridge => "bridge",
            Self::BridgeAndExecute => "bridge-and-execute",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(Self::Transfer),
            "bridge" => Ok(Self::Bridge),
            "bridge-and-execute" | "bridge-execute" => Ok(Self::BridgeAndExecute),
            other => anyhow::bail!("Unknown operation kind: {}", other),
        }
    }
}

/// 操作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    Simulate,
    Execute,
}

impl OperationMode {
    pub const ALL: [OperationMode; 2] = [Self::Simulate, Self::Execute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simulate => "simulate",
            Self::Execute => "execute",
        }
    }

    /// 厂商错误没有消息时展示的默认文案
    pub fn fallback_error(&self, kind: OperationKind) -> &'static str {
        match (self, kind) {
            (Self::Simulate, _) => "Simulation failed",
            (Self::Execute, OperationKind::Transfer) => "Transfer failed",
            (Self::Execute, OperationKind::Bridge) => "Bridge failed",
            (Self::Execute, OperationKind::BridgeAndExecute) => "Bridge and execute failed",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simulate" => Ok(Self::Simulate),
            "execute" => Ok(Self::Execute),
            other => anyhow::bail!("Unknown operation mode: {}", other),
        }
    }
}

/// 统一的操作请求
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OperationRequest {
    Transfer(TransferParams),
    Bridge(BridgeParams),
    BridgeAndExecute(BridgeAndExecuteParams),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Transfer(_) => OperationKind::Transfer,
            Self::Bridge(_) => OperationKind::Bridge,
            Self::BridgeAndExecute(_) => OperationKind::BridgeAndExecute,
        }
    }

    /// 按操作类型解析 JSON 参数
    pub fn from_json(kind: OperationKind, body: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            OperationKind::Transfer => Self::Transfer(serde_json::from_value(body)?),
            OperationKind::Bridge => Self::Bridge(serde_json::from_value(body)?),
            OperationKind::BridgeAndExecute => {
                Self::BridgeAndExecute(serde_json::from_value(body)?)
            }
        })
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Transfer(p) => &p.token,
            Self::Bridge(p) => &p.token,
            Self::BridgeAndExecute(p) => &p.token,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Self::Transfer(p) => p.amount,
            Self::Bridge(p) => p.amount,
            Self::BridgeAndExecute(p) => p.amount,
        }
    }

    pub fn destination_chain_id(&self) -> u64 {
        match self {
            Self::Transfer(p) => p.chain_id,
            Self::Bridge(p) => p.chain_id,
            Self::BridgeAndExecute(p) => p.to_chain_id,
        }
    }

    pub fn recipient(&self) -> Option<&str> {
        match self {
            Self::Transfer(p) => Some(&p.recipient),
            Self::Bridge(_) => None,
            Self::BridgeAndExecute(p) => p.recipient.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_transfer_params_accept_numeric_amount() {
        let params: TransferParams = serde_json::from_value(json!({
            "token": "USDC",
            "amount": 100,
            "chainId": 1,
            "recipient": "0x00000000000000000000000000000000000000b2"
        }))
        .unwrap();
        assert_eq!(params.amount, Decimal::from(100));
        assert_eq!(params.chain_id, 1);
    }

    #[test]
    fn test_destination_chain_alias() {
        let params: BridgeParams = serde_json::from_value(json!({
            "token": "ETH",
            "amount": "0.25",
            "destinationChainId": 10
        }))
        .unwrap();
        assert_eq!(params.chain_id, 10);
        assert_eq!(params.amount.to_string(), "0.25");
    }

    #[test]
    fn test_operation_request_from_json() {
        let request = OperationRequest::from_json(
            OperationKind::BridgeAndExecute,
            json!({ "toChainId": 8453, "token": "USDC", "amount": 5 }),
        )
        .unwrap();
        assert_eq!(request.kind(), OperationKind::BridgeAndExecute);
        assert_eq!(request.destination_chain_id(), 8453);
        assert!(request.recipient().is_none());

        let err = OperationRequest::from_json(OperationKind::Transfer, json!({ "token": "ETH" }));
        assert!(err.is_err());
    }

    #[test]
    fn test_kind_and_mode_parse() {
        assert_eq!(
            "bridge-and-execute".parse::<OperationKind>().unwrap(),
            OperationKind::BridgeAndExecute
        );
        assert_eq!("simulate".parse::<OperationMode>().unwrap(), OperationMode::Simulate);
        assert!("swap".parse::<OperationKind>().is_err());
        assert_eq!(
            OperationMode::Execute.fallback_error(OperationKind::Bridge),
            "Bridge failed"
        );
    }
}
