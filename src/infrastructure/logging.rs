//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和按天轮转的文件日志

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LoggingConfig;

const LOG_FILE_NAME: &str = "nexuscore.log";

/// 初始化日志系统
///
/// 开启文件日志时返回 `WorkerGuard`，调用方须持有到进程退出，否则缓冲日志会丢失
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    // 设置日志级别过滤器
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let json = config.format == "json";

    if !config.enable_file_logging {
        // 仅控制台日志
        if json {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
                .try_init()?;
        } else {
            Registry::default()
                .with(filter)
                .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_ansi(true))
                .try_init()?;
        }
        return Ok(None);
    }

    let log_dir = log_dir(config);
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = non_blocking(file_appender);

    if json {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init()?;
    } else {
        Registry::default()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false),
            )
            .with(fmt::layer().with_timer(ChronoUtc::rfc_3339()).with_ansi(true))
            .try_init()?;
    }

    Ok(Some(guard))
}

fn log_dir(config: &LoggingConfig) -> &Path {
    config
        .log_file_path
        .as_ref()
        .and_then(|p| Path::new(p).parent())
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("./logs"))
}
