use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use crate::app_state::AppState;

pub mod config_api;
pub mod middleware;
pub mod nexus_api;
pub mod response;

use middleware::{jwt_extractor_middleware, trace_id_middleware};

#[derive(OpenApi)]
#[openapi(
    paths(
        config_api::get_public_config,
        nexus_api::get_status,
        nexus_api::get_dashboard,
        nexus_api::list_wallets,
        nexus_api::initialize,
        nexus_api::kill,
        nexus_api::get_balances,
        nexus_api::run_operation,
        nexus_api::get_operation,
        nexus_api::aave_supply,
    ),
    components(
        schemas(
            config_api::PublicConfigResponse,
            config_api::FormDefaults,
            nexus_api::InitializeRequest,
            nexus_api::WalletSummary,
            nexus_api::BalancesResponse,
            nexus_api::OperationResponse,
            nexus_api::AaveSupplyPresetRequest,
            crate::domain::network::Network,
            crate::domain::balance::BalanceView,
            crate::domain::balance::ChainRef,
            crate::domain::balance::ChainBalance,
            crate::domain::operation::OperationKind,
            crate::domain::operation::OperationMode,
            crate::domain::operation::TransferParams,
            crate::domain::operation::BridgeParams,
            crate::domain::operation::BridgeAndExecuteParams,
            crate::domain::operation::ExecuteSpec,
            crate::domain::operation::TokenApproval,
            crate::service::nexus_sdk_service::SdkStatus,
            crate::service::nexus_sdk_service::SdkInstanceInfo,
            crate::service::nexus_controller::DashboardSnapshot,
            crate::service::nexus_controller::OperationSlot,
            crate::service::nexus_controller::OperationSlotView,
            response::ErrorBodyDoc,
        )
    ),
    tags(
        (name = "Nexus", description = "Cross-chain SDK lifecycle and operations"),
        (name = "Config", description = "Public configuration")
    )
)]
pub struct ApiDoc;

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.and_then(|url| HeaderValue::from_str(url).ok()) {
        Some(origin) => AllowOrigin::exact(origin),
        None => AllowOrigin::any(),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(middleware::trace_id::TRACE_ID_HEADER),
        ])
        .expose_headers(Any)
}

pub fn routes(state: Arc<AppState>) -> Router {
    // 公开路由（不需要认证）
    let public_routes = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/v1/config/public", get(config_api::get_public_config))
        .merge(utoipa_swagger_ui::SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()));

    let protected_routes = Router::new()
        .nest("/api/v1/nexus", nexus_api::routes())
        .layer(from_fn_with_state(state.clone(), jwt_extractor_middleware));

    public_routes
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(state.config.server.frontend_url.as_deref()))
                .layer(from_fn(trace_id_middleware)),
        )
        .with_state(state)
}
