//! API 中间件

pub mod jwt_extractor;
pub mod trace_id;

pub use jwt_extractor::{jwt_extractor_middleware, AuthContext};
pub use trace_id::{trace_id_middleware, TraceId};
