//! `POST /api/chat/:id/messages` through the full router against a real
//! Postgres. The AI endpoint points at a closed port, so every completion
//! fails. Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use miniapp_chat_backend::{
    app,
    config::{Config, DEFAULT_AI_MODEL, DEFAULT_YOOKASSA_API_URL},
    models::user::UserProfile,
    routes::messages::AI_FALLBACK_REPLY,
    services::ai_service::estimate_tokens,
    utils::{telegram_auth::InitDataVerifier, time::unix_now},
    AppState,
};
use serde_json::{json, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;
use uuid::Uuid;

const BOT_TOKEN: &str = "123456789:TEST-bot-token";
const BOUNDARY: &str = "flow-boundary";

struct Fixture {
    state: AppState,
    pool: PgPool,
    user_id: i64,
    chat_id: i64,
    init_data: String,
}

fn test_config(database_url: String, uploads_dir: String) -> Config {
    Config {
        server_address: "127.0.0.1:0".into(),
        database_url,
        database_max_connections: 2,
        telegram_bot_token: BOT_TOKEN.into(),
        ai_api_key: "sk-test".into(),
        ai_api_url: "http://127.0.0.1:9/v1/messages".into(),
        default_ai_model: DEFAULT_AI_MODEL.into(),
        yookassa_shop_id: "shop".into(),
        yookassa_secret_key: "test_secret".into(),
        yookassa_api_url: DEFAULT_YOOKASSA_API_URL.into(),
        public_base_url: "https://miniapp.example".into(),
        uploads_dir,
        api_rps: 1000,
        max_body_bytes: 1024 * 1024,
    }
}

fn init_data_for(telegram_id: i64) -> String {
    let user = json!({ "id": telegram_id, "first_name": "Anna" }).to_string();
    let payload = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("auth_date", &unix_now().to_string())
        .append_pair("user", &user)
        .finish();
    let hash = InitDataVerifier::new(BOT_TOKEN).unwrap().sign(&payload);
    format!("{}&hash={}", payload, hash)
}

async fn fixture() -> Fixture {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("pool");
    miniapp_chat_backend::database::pool::run_migrations(&pool)
        .await
        .expect("migrations");

    let uploads_dir = std::env::temp_dir()
        .join(format!("miniapp-flow-{}", Uuid::new_v4().simple()))
        .to_string_lossy()
        .into_owned();
    let state = AppState::new(pool.clone(), test_config(url, uploads_dir)).expect("state");

    let telegram_id = (Uuid::new_v4().as_u128() & 0x7fff_ffff_ffff) as i64;
    let user_id = state
        .user_service
        .create(&UserProfile {
            telegram_id,
            first_name: "Anna".into(),
            auth_date: unix_now(),
            ..Default::default()
        })
        .await
        .unwrap();
    state
        .settings_service
        .create_default_ai_settings(user_id)
        .await
        .unwrap();
    let chat = state.chat_service.create(user_id, "Flow").await.unwrap();

    Fixture {
        state,
        pool,
        user_id,
        chat_id: chat.id,
        init_data: init_data_for(telegram_id),
    }
}

fn multipart_request(chat_id: i64, init_data: &str, content: &str, files: &[(&str, &str)]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"initData\"\r\n\r\n{i}\r\n\
         --{b}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\n{c}\r\n",
        b = BOUNDARY,
        i = init_data,
        c = content
    );
    for (name, data) in files {
        body.push_str(&format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{n}\"\r\n\
             Content-Type: text/plain\r\n\r\n{d}\r\n",
            b = BOUNDARY,
            n = name,
            d = data
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::post(format!("/api/chat/{}/messages", chat_id))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = router.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn files_without_subscription_are_forbidden() {
    let fx = fixture().await;
    let req = multipart_request(fx.chat_id, &fx.init_data, "see file", &[("a.txt", "abc")]);

    let (status, body) = send(app(fx.state.clone()), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "An active subscription is required to send files");
    assert_eq!(body["success"], false);

    let stored = fx
        .state
        .message_service
        .list_for_chat(fx.chat_id, fx.user_id)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn ai_failure_stores_fallback_and_counts_user_tokens() {
    let fx = fixture().await;
    let content = "hello there friend";
    let req = multipart_request(fx.chat_id, &fx.init_data, content, &[]);

    let (status, body) = send(app(fx.state.clone()), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Failed to get a response from the AI service");

    let stored = fx
        .state
        .message_service
        .list_for_chat(fx.chat_id, fx.user_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].is_user);
    assert_eq!(stored[0].content, content);
    assert_eq!(body["userMessageId"], stored[0].id);
    assert!(!stored[1].is_user);
    assert_eq!(stored[1].content, AI_FALLBACK_REPLY);
    assert_eq!(body["errorMessageId"], stored[1].id);

    let usage = fx.state.usage_service.get(fx.user_id).await.unwrap().unwrap();
    assert_eq!(usage.total_messages, 2);
    assert_eq!(usage.total_tokens, estimate_tokens(content));
    assert_eq!(usage.total_files, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn subscriber_files_with_same_name_are_all_kept() {
    let fx = fixture().await;
    let plan = fx
        .state
        .subscription_service
        .list_active_plans()
        .await
        .unwrap()
        .remove(0);
    sqlx::query(
        r#"
        INSERT INTO subscriptions (user_id, plan_id, status, start_date, end_date)
        VALUES ($1, $2, 'active', NOW(), NOW() + INTERVAL '30 days')
        "#,
    )
    .bind(fx.user_id)
    .bind(plan.id)
    .execute(&fx.pool)
    .await
    .unwrap();

    let req = multipart_request(
        fx.chat_id,
        &fx.init_data,
        "",
        &[("image.jpg", "first"), ("image.jpg", "second")],
    );
    let (status, body) = send(app(fx.state.clone()), req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);

    let stored = fx
        .state
        .message_service
        .list_for_chat(fx.chat_id, fx.user_id)
        .await
        .unwrap();
    let attachments = &stored[0].attachments;
    assert_eq!(attachments.len(), 2);
    assert_ne!(attachments[0].file_path, attachments[1].file_path);

    let mut contents = Vec::new();
    for attachment in attachments {
        let relative = attachment.file_path.trim_start_matches("/uploads/");
        let on_disk = std::path::Path::new(&fx.state.config.uploads_dir).join(relative);
        contents.push(tokio::fs::read_to_string(on_disk).await.unwrap());
    }
    contents.sort();
    assert_eq!(contents, vec!["first".to_string(), "second".to_string()]);

    let usage = fx.state.usage_service.get(fx.user_id).await.unwrap().unwrap();
    assert_eq!(usage.total_files, 2);
}
