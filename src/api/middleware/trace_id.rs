//! Trace ID 中间件
//! 为每个请求生成唯一的 trace_id，写入请求扩展、响应头和请求级 tracing span

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// 请求追踪 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceId(pub String);

impl TraceId {
    /// 优先沿用调用方传入的 trace_id
    pub fn from_request(req: &Request) -> Self {
        req.headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(|| Self(Uuid::new_v4().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub async fn trace_id_middleware(mut req: Request, next: Next) -> Response {
    let trace_id = TraceId::from_request(&req);
    req.extensions_mut().insert(trace_id.clone());

    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id.as_str(),
        method = %req.method(),
        path = %req.uri().path()
    );
    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(trace_id.as_str()) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};

    use super::*;

    #[test]
    fn test_trace_id_from_header_or_generated() {
        let req = http::Request::builder()
            .header(TRACE_ID_HEADER, "abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(TraceId::from_request(&req).as_str(), "abc-123");

        let req = http::Request::builder().body(Body::empty()).unwrap();
        let generated = TraceId::from_request(&req);
        assert!(Uuid::parse_str(generated.as_str()).is_ok());
    }
}
