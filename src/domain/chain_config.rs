//! 链与代币静态配置
//!
//! 仅用于界面填充（下拉框、默认值），dispatcher 不做强制校验

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::operation::{BridgeAndExecuteParams, ExecuteSpec, TokenApproval};

/// 支持的代币
pub const SUPPORTED_TOKENS: [&str; 3] = ["ETH", "USDC", "USDT"];

pub const DEFAULT_TRANSFER_TOKEN: &str = "ETH";
pub const DEFAULT_TRANSFER_CHAIN_ID: u64 = 1;
pub const DEFAULT_BRIDGE_TOKEN: &str = "USDC";
pub const DEFAULT_BRIDGE_CHAIN_ID: u64 = 10;
pub const DEFAULT_BRIDGE_EXECUTE_CHAIN_ID: u64 = 8453;

/// USDC 精度
pub const USDC_DECIMALS: u32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// 链元数据
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    pub id: u64,
    pub name: &'static str,
    pub short_name: &'static str,
    pub native_currency: NativeCurrency,
}

const ETHER: NativeCurrency = NativeCurrency {
    name: "Ether",
    symbol: "ETH",
    decimals: 18,
};

pub static SUPPORTED_CHAINS: Lazy<Vec<ChainMetadata>> = Lazy::new(|| {
    vec![
        ChainMetadata {
            id: 1,
            name: "Ethereum",
            short_name: "ETH",
            native_currency: ETHER,
        },
        ChainMetadata {
            id: 10,
            name: "Optimism",
            short_name: "OPT",
            native_currency: ETHER,
        },
        ChainMetadata {
            id: 137,
            name: "Polygon",
            short_name: "POL",
            native_currency: NativeCurrency {
                name: "MATIC",
                symbol: "MATIC",
                decimals: 18,
            },
        },
        ChainMetadata {
            id: 42161,
            name: "Arbitrum",
            short_name: "ARB",
            native_currency: ETHER,
        },
        ChainMetadata {
            id: 8453,
            name: "Base",
            short_name: "BASE",
            native_currency: ETHER,
        },
    ]
});

pub fn find_chain(chain_id: u64) -> Option<&'static ChainMetadata> {
    SUPPORTED_CHAINS.iter().find(|c| c.id == chain_id)
}

pub fn is_supported_token(token: &str) -> bool {
    SUPPORTED_TOKENS.contains(&token)
}

/// Aave v3 Pool 合约（目前只有 Base）
pub fn aave_v3_pool_address(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        8453 => Some("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"),
        _ => None,
    }
}

/// 各链 USDC 合约地址
pub fn usdc_token_address(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        10 => Some("0x7F5c764cBc14f9669B88837ca1490cCa17c31607"),
        137 => Some("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
        42161 => Some("0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8"),
        8453 => Some("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
        _ => None,
    }
}

/// Aave v3 Pool ABI（supply / depositETH）
pub static AAVE_V3_POOL_ABI: Lazy<Value> = Lazy::new(|| {
    json!([
        {
            "inputs": [
                { "internalType": "address", "name": "asset", "type": "address" },
                { "internalType": "uint256", "name": "amount", "type": "uint256" },
                { "internalType": "address", "name": "onBehalfOf", "type": "address" },
                { "internalType": "uint16", "name": "referralCode", "type": "uint16" }
            ],
            "name": "supply",
            "outputs": [],
            "stateMutability": "nonpayable",
            "type": "function"
        },
        {
            "inputs": [
                { "internalType": "address", "name": "pool", "type": "address" },
                { "internalType": "address", "name": "onBehalfOf", "type": "address" },
                { "internalType": "uint16", "name": "referralCode", "type": "uint16" }
            ],
            "name": "depositETH",
            "outputs": [],
            "stateMutability": "payable",
            "type": "function"
        }
    ])
});

/// USDC 显示金额转最小单位（截断多余精度）
pub fn usdc_base_units(amount: Decimal) -> String {
    (amount * Decimal::from(10u64.pow(USDC_DECIMALS)))
        .trunc()
        .to_string()
}

/// 构建 "桥接 USDC 后存入 Aave" 的 bridge-and-execute 参数
///
/// `with_execute = false` 时只桥接，不附带合约调用
pub fn aave_supply_preset(
    chain_id: u64,
    amount: Decimal,
    recipient: &str,
    with_execute: bool,
) -> Result<BridgeAndExecuteParams> {
    let execute = if with_execute {
        let pool = aave_v3_pool_address(chain_id)
            .ok_or_else(|| anyhow!("Aave v3 pool not available on chain {}", chain_id))?;
        let usdc = usdc_token_address(chain_id)
            .ok_or_else(|| anyhow!("USDC not available on chain {}", chain_id))?;
        let units = usdc_base_units(amount);

        Some(ExecuteSpec {
            contract_address: pool.to_string(),
            contract_abi: AAVE_V3_POOL_ABI.clone(),
            function_name: "supply".to_string(),
            function_params: vec![
                json!(usdc),
                json!(units),
                json!(recipient),
                json!(0),
            ],
            value: None,
            token_approval: TokenApproval {
                token: "USDC".to_string(),
                amount: units,
            },
        })
    } else {
        None
    };

    Ok(BridgeAndExecuteParams {
        to_chain_id: chain_id,
        token: "USDC".to_string(),
        amount,
        recipient: Some(recipient.to_string()),
        execute,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_supported_chains() {
        assert_eq!(SUPPORTED_CHAINS.len(), 5);
        assert_eq!(find_chain(10).map(|c| c.name), Some("Optimism"));
        assert_eq!(find_chain(137).unwrap().native_currency.symbol, "MATIC");
        assert!(find_chain(56).is_none());
        assert!(is_supported_token("USDT"));
        assert!(!is_supported_token("DAI"));
    }

    #[test]
    fn test_usdc_base_units() {
        assert_eq!(usdc_base_units(Decimal::from_str("12.5").unwrap()), "12500000");
        assert_eq!(usdc_base_units(Decimal::from_str("0.0000019").unwrap()), "1");
    }

    #[test]
    fn test_aave_supply_preset() {
        let recipient = "0x00000000000000000000000000000000000000a1";
        let params = aave_supply_preset(8453, Decimal::from(10), recipient, true).unwrap();
        let execute = params.execute.unwrap();
        assert_eq!(execute.function_name, "supply");
        assert_eq!(execute.token_approval.amount, "10000000");
        assert_eq!(execute.function_params[2], json!(recipient));
        assert_eq!(params.recipient.as_deref(), Some(recipient));

        assert!(aave_supply_preset(10, Decimal::ONE, recipient, true).is_err());
        let bridge_only = aave_supply_preset(10, Decimal::ONE, recipient, false).unwrap();
        assert!(bridge_only.execute.is_none());
    }
}
