//! Admission gate for Telegram Mini App requests.
//!
//! The client sends `initData` in the query string, a JSON body, a urlencoded
//! form or a multipart form. The middleware finds it, runs the verifier and
//! stores the resulting [`VerifiedTelegramUser`] in request extensions. Any
//! buffered body is handed back to the handler unchanged.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::CONTENT_LENGTH, header::CONTENT_TYPE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};
use crate::utils::telegram_auth::VerifiedTelegramUser;
use crate::AppState;

pub const INIT_DATA_FIELD: &str = "initData";

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Multipart(String),
    Other,
}

pub async fn require_init_data(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (mut req, init_data) = match extract_init_data(req, state.config.max_body_bytes).await {
        Ok(found) => found,
        Err(err) => return err.into_response(),
    };

    match state
        .verifier
        .authenticate(init_data.as_deref().unwrap_or_default())
    {
        Ok(user) => {
            tracing::debug!(telegram_id = user.id, "Init data accepted");
            req.extensions_mut().insert::<VerifiedTelegramUser>(user);
            next.run(req).await
        }
        Err(rejection) => {
            tracing::warn!(
                reason = ?rejection,
                method = %req.method(),
                path = %req.uri().path(),
                "Rejected Telegram init data"
            );
            Error::from(rejection).into_response()
        }
    }
}

async fn extract_init_data(req: Request, limit: usize) -> Result<(Request, Option<String>)> {
    if let Some(found) = req.uri().query().and_then(|q| find_form_field(q.as_bytes())) {
        return Ok((req, Some(found)));
    }

    let kind = body_kind(req.headers());
    if kind == BodyKind::Other {
        return Ok((req, None));
    }
    if declared_length(req.headers()).is_some_and(|len| len > limit) {
        return Err(Error::PayloadTooLarge);
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|_| Error::PayloadTooLarge)?;

    let found = match kind {
        BodyKind::Json => find_json_field(&bytes),
        BodyKind::Form => find_form_field(&bytes),
        BodyKind::Multipart(boundary) => find_multipart_field(bytes.clone(), boundary).await,
        BodyKind::Other => None,
    };

    Ok((Request::from_parts(parts, Body::from(bytes)), found))
}

fn body_kind(headers: &HeaderMap) -> BodyKind {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return BodyKind::Other;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => BodyKind::Json,
        "application/x-www-form-urlencoded" => BodyKind::Form,
        "multipart/form-data" => multer::parse_boundary(content_type)
            .map(BodyKind::Multipart)
            .unwrap_or(BodyKind::Other),
        m if m.ends_with("+json") => BodyKind::Json,
        _ => BodyKind::Other,
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn find_form_field(raw: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(raw)
        .find(|(k, _)| k == INIT_DATA_FIELD)
        .map(|(_, v)| v.into_owned())
}

fn find_json_field(raw: &[u8]) -> Option<String> {
    let value: JsonValue = serde_json::from_slice(raw).ok()?;
    value.get(INIT_DATA_FIELD)?.as_str().map(str::to_string)
}

async fn find_multipart_field(bytes: Bytes, boundary: String) -> Option<String> {
    let stream = futures_util::stream::once(async move { Ok::<Bytes, std::io::Error>(bytes) });
    let mut multipart = multer::Multipart::new(stream, boundary);
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(INIT_DATA_FIELD) {
            return field.text().await.ok();
        }
    }
    None
}
