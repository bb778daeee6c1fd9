use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::{api::middleware::TraceId, service::nexus_sdk_service::NexusError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorCode {
    // HTTP 基础错误码
    Unauthorized,
    Internal,
    InvalidParameter,
    TokenInvalid,

    // Nexus 业务错误码
    ProviderUnavailable,
    WalletNotSelected,
    SdkLoadFailed,
    SdkNotLoaded,
    SdkNotInitialized,
    InitializationInProgress,
    CleanupInProgress,
    NetworkSwitchRejected,
    InitializationFailed,
    OperationInFlight,
    ExternalServiceError,
}

impl AppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Internal => "internal",
            Self::InvalidParameter => "invalid_parameter",
            Self::TokenInvalid => "token_invalid",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::WalletNotSelected => "wallet_not_selected",
            Self::SdkLoadFailed => "sdk_load_failed",
            Self::SdkNotLoaded => "sdk_not_loaded",
            Self::SdkNotInitialized => "sdk_not_initialized",
            Self::InitializationInProgress => "initialization_in_progress",
            Self::CleanupInProgress => "cleanup_in_progress",
            Self::NetworkSwitchRejected => "network_switch_rejected",
            Self::InitializationFailed => "initialization_failed",
            Self::OperationInFlight => "operation_in_flight",
            Self::ExternalServiceError => "external_service_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub message: String,
    pub status: StatusCode,
    pub trace_id: Option<String>,
    /// 初始化失败时是否提示重试
    pub retryable: Option<bool>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
    trace_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code.as_str(),
            message: &self.message,
            trace_id: self.trace_id.as_deref(),
            retryable: self.retryable,
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    fn new(code: AppErrorCode, status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            status,
            trace_id: None,
            retryable: None,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Internal, StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::Unauthorized, StatusCode::UNAUTHORIZED, msg)
    }

    pub fn token_invalid(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::TokenInvalid, StatusCode::UNAUTHORIZED, msg)
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::new(AppErrorCode::InvalidParameter, StatusCode::BAD_REQUEST, msg)
    }

    /// 设置追踪ID
    pub fn with_trace_id(mut self, trace_id: String) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// 从请求扩展中获取trace_id并设置
    pub fn with_trace_id_from_request(mut self, req: &axum::extract::Request) -> Self {
        if let Some(trace_id) = req.extensions().get::<TraceId>() {
            self.trace_id = Some(trace_id.0.clone());
        }
        self
    }
}

impl From<NexusError> for AppError {
    fn from(err: NexusError) -> Self {
        let message = err.to_string();
        match err {
            NexusError::ProviderUnavailable(_) => Self::new(
                AppErrorCode::ProviderUnavailable,
                StatusCode::BAD_REQUEST,
                message,
            ),
            NexusError::NoWalletSelected => Self::new(
                AppErrorCode::WalletNotSelected,
                StatusCode::BAD_REQUEST,
                message,
            ),
            NexusError::SdkLoad(_) => Self::new(
                AppErrorCode::SdkLoadFailed,
                StatusCode::SERVICE_UNAVAILABLE,
                message,
            ),
            NexusError::NotLoaded => {
                Self::new(AppErrorCode::SdkNotLoaded, StatusCode::CONFLICT, message)
            }
            NexusError::NotInitialized => Self::new(
                AppErrorCode::SdkNotInitialized,
                StatusCode::CONFLICT,
                message,
            ),
            NexusError::InitializationInProgress => Self::new(
                AppErrorCode::InitializationInProgress,
                StatusCode::CONFLICT,
                message,
            ),
            NexusError::CleanupInProgress => Self::new(
                AppErrorCode::CleanupInProgress,
                StatusCode::CONFLICT,
                message,
            ),
            NexusError::NetworkSwitchWhileReady { .. } => Self::new(
                AppErrorCode::NetworkSwitchRejected,
                StatusCode::CONFLICT,
                message,
            ),
            NexusError::InitializationFailed(failure) => {
                let mut err = Self::new(
                    AppErrorCode::InitializationFailed,
                    StatusCode::UNPROCESSABLE_ENTITY,
                    message,
                );
                err.retryable = Some(failure.category.is_retryable());
                err
            }
            NexusError::OperationInFlight { .. } => Self::new(
                AppErrorCode::OperationInFlight,
                StatusCode::TOO_MANY_REQUESTS,
                message,
            ),
            NexusError::Vendor(_) => Self::new(
                AppErrorCode::ExternalServiceError,
                StatusCode::BAD_GATEWAY,
                message,
            ),
        }
    }
}

// 从 serde_json 错误转换
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_parameter(format!("Invalid request body: {}", err))
    }
}

// 从 anyhow 错误转换
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{}", err))
    }
}
