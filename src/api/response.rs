//! 统一 API 响应格式
//!
//! 所有 API 接口使用统一的响应格式：{ code, message, data }
//! 错误响应由 AppError 输出：{ code: "error_code", message, trace_id?, retryable? }

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;

/// 统一成功响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data,
        }
    }

    /// 创建成功响应（带自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            code: 0,
            message: message.into(),
            data,
        }
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// 辅助函数：将数据包装为统一响应格式
pub fn success_response<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// 辅助函数：将数据包装为统一响应格式（带自定义消息）
pub fn success_response_with_message<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> ApiResult<T> {
    Ok(Json(ApiResponse::success_with_message(data, message)))
}

/// OpenAPI 文档用的错误体
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBodyDoc {
    pub code: String,
    pub message: String,
    pub trace_id: Option<String>,
    pub retryable: Option<bool>,
}
