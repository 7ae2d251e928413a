pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::PgPool;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::middleware::{
    cors::mini_app_cors,
    init_data::require_init_data,
    rate_limit::{rps_middleware, RateLimiter},
};
use crate::services::{
    ai_service::AIService, chat_service::ChatService, message_service::MessageService,
    payment_service::PaymentService, settings_service::SettingsService,
    subscription_service::SubscriptionService, usage_service::UsageService,
    user_service::UserService,
};
use crate::utils::telegram_auth::InitDataVerifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub verifier: InitDataVerifier,
    pub user_service: UserService,
    pub chat_service: ChatService,
    pub message_service: MessageService,
    pub settings_service: SettingsService,
    pub subscription_service: SubscriptionService,
    pub usage_service: UsageService,
    pub ai_service: AIService,
    pub payment_service: PaymentService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let verifier = InitDataVerifier::new(&config.telegram_bot_token)
            .ok_or_else(|| Error::Config("Invalid Telegram bot token".into()))?;
        let user_service = UserService::new(pool.clone());
        let chat_service = ChatService::new(pool.clone());
        let message_service = MessageService::new(pool.clone());
        let settings_service = SettingsService::new(pool.clone(), config.default_ai_model.clone());
        let subscription_service = SubscriptionService::new(pool.clone());
        let usage_service = UsageService::new(pool.clone());
        let ai_service = AIService::new(
            config.ai_api_key.clone(),
            config.ai_api_url.clone(),
            http_client.clone(),
        );
        let payment_service = PaymentService::new(
            http_client,
            config.yookassa_api_url.clone(),
            config.yookassa_shop_id.clone(),
            config.yookassa_secret_key.clone(),
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            verifier,
            user_service,
            chat_service,
            message_service,
            settings_service,
            subscription_service,
            usage_service,
            ai_service,
            payment_service,
        })
    }
}

/// Full HTTP surface of the backend.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let mini_app_api = Router::new()
        .route("/api/auth", post(routes::auth::authenticate))
        .route(
            "/api/chat",
            get(routes::chat::list_chats)
                .post(routes::chat::create_chat)
                .put(routes::chat::rename_chat)
                .delete(routes::chat::delete_chat),
        )
        .route(
            "/api/chat/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route(
            "/api/subscription",
            get(routes::subscription::get_subscription)
                .post(routes::subscription::create_payment),
        )
        .route_layer(from_fn_with_state(state.clone(), require_init_data));

    let api = mini_app_api
        .route("/api/webhook/payment", post(routes::webhook::payment_webhook))
        .route_layer(from_fn_with_state(
            RateLimiter::per_second(config.api_rps),
            rps_middleware,
        ));

    tracing::info!(uploads_dir = %config.uploads_dir, "Serving uploads");

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .nest_service("/uploads", ServeDir::new(&config.uploads_dir))
        .with_state(state)
        .layer(mini_app_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
}
