//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};

use crate::domain::network::Network;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub nexus: NexusConfig,
    #[serde(default)]
    pub wallets: Vec<WalletConfig>,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    #[serde(default)]
    pub frontend_url: Option<String>,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// JWT配置（只做校验，签发由身份服务负责）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// Nexus 网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NexusConfig {
    /// 挂载和 kill 后重新加载使用的网络
    pub default_network: Network,
    pub mainnet_gateway_url: String,
    pub testnet_gateway_url: String,
    pub request_timeout_secs: u64,
}

/// 绑定的钱包：地址 + JSON-RPC 端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub address: String,
    pub rpc_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8088".into()),
            frontend_url: std::env::var("FRONTEND_URL").ok(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| {
                // 警告在 main.rs 中根据实际使用的密钥输出
                "default-jwt-secret-please-change-in-production-min-32-chars".to_string()
            }),
        }
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            default_network: std::env::var("NEXUS_NETWORK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            mainnet_gateway_url: std::env::var("NEXUS_MAINNET_GATEWAY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8790".into()),
            testnet_gateway_url: std::env::var("NEXUS_TESTNET_GATEWAY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8791".into()),
            request_timeout_secs: std::env::var("NEXUS_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl NexusConfig {
    pub fn gateway_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet_gateway_url,
            Network::Testnet => &self.testnet_gateway_url,
        }
    }
}

impl WalletConfig {
    /// 解析 `address@rpc_url,address@rpc_url`
    pub fn parse_list(raw: &str) -> Result<Vec<Self>> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (address, rpc_url) = entry
                    .split_once('@')
                    .with_context(|| format!("Invalid wallet entry (expected address@rpc_url): {}", entry))?;
                Ok(Self {
                    address: address.trim().to_string(),
                    rpc_url: rpc_url.trim().to_string(),
                })
            })
            .collect()
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        let wallets = match std::env::var("NEXUS_WALLETS") {
            Ok(raw) => WalletConfig::parse_list(&raw)?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            jwt: JwtConfig::default(),
            nexus: NexusConfig::default(),
            wallets,
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                let file_config = Self::from_file(path)?;
                // 文件未配置钱包时保留环境变量中的钱包
                let env_wallets = std::mem::take(&mut config.wallets);
                config = file_config;
                if config.wallets.is_empty() {
                    config.wallets = env_wallets;
                }
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        // 验证JWT secret长度
        if self.jwt.secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        // 验证日志级别
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        // 验证日志格式
        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        // 默认网络必须有网关，否则挂载即失败
        let gateway = self.nexus.gateway_url(self.nexus.default_network);
        if !gateway.starts_with("http://") && !gateway.starts_with("https://") {
            anyhow::bail!(
                "Nexus gateway URL for {} must start with http:// or https://",
                self.nexus.default_network
            );
        }

        if self.nexus.request_timeout_secs == 0 {
            anyhow::bail!("NEXUS_REQUEST_TIMEOUT_SECS must be greater than 0");
        }

        for wallet in &self.wallets {
            wallet
                .address
                .parse::<Address>()
                .with_context(|| format!("Invalid wallet address: {}", wallet.address))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn valid_config() -> Config {
        Config {
            server: ServerConfig {
                bind_addr: "127.0.0.1:8088".into(),
                frontend_url: None,
            },
            logging: LoggingConfig {
                level: "info".into(),
                format: "text".into(),
                enable_file_logging: false,
                log_file_path: None,
            },
            jwt: JwtConfig {
                secret: "test_secret_that_is_at_least_32_characters_long".into(),
            },
            nexus: NexusConfig {
                default_network: Network::Mainnet,
                mainnet_gateway_url: "https://mainnet.nexus-gateway.example".into(),
                testnet_gateway_url: "https://testnet.nexus-gateway.example".into(),
                request_timeout_secs: 30,
            },
            wallets: vec![],
        }
    }

    #[test]
    fn test_config_from_env() {
        let config = Config::from_env().unwrap();
        assert!(!config.server.bind_addr.is_empty());
        assert!(config.nexus.request_timeout_secs > 0);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
bind_addr = "0.0.0.0:9090"

[logging]
level = "debug"
format = "json"
enable_file_logging = false

[jwt]
secret = "test_secret_that_is_at_least_32_characters_long"

[nexus]
default_network = "testnet"
mainnet_gateway_url = "https://mainnet.nexus-gateway.example"
testnet_gateway_url = "https://testnet.nexus-gateway.example"
request_timeout_secs = 10

[[wallets]]
address = "0x00000000000000000000000000000000000000a1"
rpc_url = "https://rpc.example/eth"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9090");
        assert_eq!(config.nexus.default_network, Network::Testnet);
        assert_eq!(
            config.nexus.gateway_url(Network::Testnet),
            "https://testnet.nexus-gateway.example"
        );
        assert_eq!(config.wallets.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_wallet_list() {
        let wallets = WalletConfig::parse_list(
            "0x00000000000000000000000000000000000000a1@https://rpc.example/eth, 0x00000000000000000000000000000000000000b2@http://127.0.0.1:8545",
        )
        .unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[1].rpc_url, "http://127.0.0.1:8545");

        assert!(WalletConfig::parse_list("0xabc").is_err());
        assert!(WalletConfig::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());

        let mut short_secret = valid_config();
        short_secret.jwt.secret = "short".into();
        assert!(short_secret.validate().is_err());

        let mut no_gateway = valid_config();
        no_gateway.nexus.mainnet_gateway_url = String::new();
        assert!(no_gateway.validate().is_err());

        let mut bad_wallet = valid_config();
        bad_wallet.wallets.push(WalletConfig {
            address: "not-an-address".into(),
            rpc_url: "https://rpc.example/eth".into(),
        });
        assert!(bad_wallet.validate().is_err());
    }
}
