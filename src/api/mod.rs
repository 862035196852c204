use crate::api::rate_limit::log_rate_limit_events;
use crate::config::Config;
use crate::services::account_service::AccountService;
use crate::services::auth_service::AuthService;
use crate::services::delivery_service::DeliveryService;
use crate::services::health_service::HealthService;
use crate::services::mailing_service::MailingService;
use crate::services::message_service::MessageService;
use crate::services::rate_limit_service::RateLimitService;
use crate::services::recipient_service::RecipientService;
use crate::services::stats_service::StatsService;
use crate::services::user_service::UserService;
use anyhow::Context;
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod attempts;
pub mod auth;
pub mod health;
pub mod mailings;
pub mod messages;
pub mod middleware;
pub mod rate_limit;
pub mod recipients;
pub mod schemas;
pub mod stats;
pub mod users;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub account_service: AccountService,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub recipient_service: RecipientService,
    pub message_service: MessageService,
    pub mailing_service: MailingService,
    pub delivery_service: DeliveryService,
    pub stats_service: StatsService,
    pub rate_limit_service: RateLimitService,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub account_service: AccountService,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub recipient_service: RecipientService,
    pub message_service: MessageService,
    pub mailing_service: MailingService,
    pub delivery_service: DeliveryService,
    pub stats_service: StatsService,
    pub rate_limit_service: RateLimitService,
}

/// Configures and returns the primary application router.
///
/// # Errors
/// Returns an error if the rate limiter configuration is invalid.
pub fn app_router(config: Config, services: ServiceContainer) -> anyhow::Result<Router> {
    // Registration and login are expensive (argon2), so they get a strict per-IP limit.
    let auth_interval_ns = 1_000_000_000 / config.rate_limit.auth_per_second.max(1);
    let auth_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(u64::from(auth_interval_ns))
            .burst_size(config.rate_limit.auth_burst.max(1))
            .key_extractor(services.rate_limit_service.extractor.clone())
            .finish()
            .context("Invalid auth rate limiter configuration")?,
    );

    let state = AppState {
        config,
        account_service: services.account_service,
        auth_service: services.auth_service,
        user_service: services.user_service,
        recipient_service: services.recipient_service,
        message_service: services.message_service,
        mailing_service: services.mailing_service,
        delivery_service: services.delivery_service,
        stats_service: services.stats_service,
        rate_limit_service: services.rate_limit_service,
    };

    let auth_routes = Router::new()
        .route("/users", post(auth::register))
        .route("/sessions", post(auth::login).delete(auth::logout))
        .route("/sessions/refresh", post(auth::refresh))
        .layer(GovernorLayer::new(auth_conf))
        .layer(from_fn_with_state(state.clone(), log_rate_limit_events));

    let api_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user).patch(users::update_user))
        .route("/users/{id}/block", post(users::block_user))
        .route("/users/{id}/unblock", post(users::unblock_user))
        .route("/recipients", get(recipients::list_recipients).post(recipients::create_recipient))
        .route(
            "/recipients/{id}",
            get(recipients::get_recipient).put(recipients::update_recipient).delete(recipients::delete_recipient),
        )
        .route("/messages", get(messages::list_messages).post(messages::create_message))
        .route(
            "/messages/{id}",
            get(messages::get_message).put(messages::update_message).delete(messages::delete_message),
        )
        .route("/mailings", get(mailings::list_mailings).post(mailings::create_mailing))
        .route(
            "/mailings/{id}",
            get(mailings::get_mailing).put(mailings::update_mailing).delete(mailings::delete_mailing),
        )
        .route("/mailings/{id}/send", post(mailings::send_mailing))
        .route("/mailings/{id}/disable", post(mailings::disable_mailing))
        .route("/attempts", get(attempts::list_attempts))
        .route("/stats", get(stats::dashboard));

    Ok(Router::new()
        .nest("/v1", auth_routes.merge(api_routes))
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            middleware::MakeRequestUuidOrHeader,
        ))
        .with_state(state))
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
