//! 日志脱敏
//! 钱包地址只保留前 6 位和后 4 位

use once_cell::sync::Lazy;
use regex::Regex;

static EVM_ADDRESS: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"0x[0-9a-fA-F]{40}").ok());

/// 脱敏地址（显示前6位和后4位）
pub fn redact_address(address: &str) -> String {
    if address.len() < 10 || !address.is_ascii() {
        return "*".repeat(address.len());
    }

    let prefix = &address[..6];
    let suffix = &address[address.len() - 4..];
    format!("{}...{}", prefix, suffix)
}

/// 脱敏文本中出现的所有 EVM 地址（厂商错误消息可能包含地址）
pub fn redact_addresses(text: &str) -> String {
    match EVM_ADDRESS.as_ref() {
        Some(re) => re
            .replace_all(text, |caps: &regex::Captures<'_>| redact_address(&caps[0]))
            .into_owned(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_address() {
        let address = "0x742d35Cc6634C0532925a3b844Bc9e7595f0bFd2";
        assert_eq!(redact_address(address), "0x742d...bFd2");
        assert_eq!(redact_address("0xabc"), "*****");
    }

    #[test]
    fn test_redact_addresses_in_text() {
        let text = "transfer to 0x742d35Cc6634C0532925a3b844Bc9e7595f0bFd2 reverted";
        assert_eq!(redact_addresses(text), "transfer to 0x742d...bFd2 reverted");
        assert_eq!(redact_addresses("no address here"), "no address here");
    }
}
