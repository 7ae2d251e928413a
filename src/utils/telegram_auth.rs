use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::utils::time::unix_now;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, in seconds.
pub const MAX_AUTH_AGE_SECS: i64 = 86_400;

const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

/// Identity carried in the `user` field of Telegram Web App init data,
/// merged with the top-level `auth_date` and `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedTelegramUser {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub language_code: Option<String>,
    pub is_premium: Option<bool>,
    pub auth_date: String,
    pub hash: String,
}

#[derive(Debug, Deserialize)]
struct InitDataUser {
    id: i64,
    first_name: String,
    last_name: Option<String>,
    username: Option<String>,
    photo_url: Option<String>,
    language_code: Option<String>,
    is_premium: Option<bool>,
}

/// Why a request failed admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No init data was supplied at all.
    Missing,
    /// The signature did not match (or there was no `hash`).
    InvalidSignature,
    /// Signed correctly, but `user` is absent or undecodable.
    MalformedIdentity,
    /// Signed correctly, but `auth_date` is too old or not a number.
    Expired,
}

impl AuthRejection {
    pub fn message(self) -> &'static str {
        match self {
            AuthRejection::Missing => "Telegram init data is missing",
            AuthRejection::InvalidSignature => "Telegram init data is invalid",
            AuthRejection::MalformedIdentity => "Could not read user from Telegram init data",
            AuthRejection::Expired => "Authorization has expired, please reopen the app",
        }
    }
}

/// Checks Telegram Web App init data against a bot token.
///
/// Only the key derived from the token is kept; the token itself is dropped
/// after construction.
#[derive(Clone)]
pub struct InitDataVerifier {
    keyed_mac: HmacSha256,
}

impl std::fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("keyed_mac", &"<redacted>")
            .finish()
    }
}

impl InitDataVerifier {
    /// Derives the signing key from the bot token. Returns `None` only if the
    /// HMAC implementation refuses the key.
    pub fn new(bot_token: &str) -> Option<Self> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(WEB_APP_DATA_KEY).ok()?;
        mac.update(bot_token.as_bytes());
        let secret_key = mac.finalize().into_bytes();
        let keyed_mac = <HmacSha256 as Mac>::new_from_slice(&secret_key).ok()?;
        Some(Self { keyed_mac })
    }

    /// Returns true iff `hash` matches the HMAC of the canonical check string.
    pub fn verify(&self, init_data: &str) -> bool {
        let mut pairs = parse_pairs(init_data);
        let Some(hash) = pairs
            .iter()
            .find(|(k, _)| k == "hash")
            .map(|(_, v)| v.clone())
        else {
            return false;
        };
        pairs.retain(|(k, _)| k != "hash");

        let calculated = self.sign_pairs(pairs);
        calculated.as_bytes().ct_eq(hash.as_bytes()).into()
    }

    /// Computes the lowercase hex signature for a payload, ignoring any
    /// `hash` it already carries.
    pub fn sign(&self, init_data: &str) -> String {
        let pairs = parse_pairs(init_data)
            .into_iter()
            .filter(|(k, _)| k != "hash")
            .collect();
        self.sign_pairs(pairs)
    }

    fn sign_pairs(&self, mut pairs: Vec<(String, String)>) -> String {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        let data_check_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("\n");

        let mut mac = self.keyed_mac.clone();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Extracts the user identity. Does not look at the signature.
    pub fn parse(init_data: &str) -> Option<VerifiedTelegramUser> {
        let pairs = parse_pairs(init_data);
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let user: InitDataUser = serde_json::from_str(get("user")?).ok()?;
        Some(VerifiedTelegramUser {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            photo_url: user.photo_url,
            language_code: user.language_code,
            is_premium: user.is_premium,
            auth_date: get("auth_date").unwrap_or_default().to_string(),
            hash: get("hash").unwrap_or_default().to_string(),
        })
    }

    pub fn is_expired(auth_date: &str) -> bool {
        Self::is_expired_at(auth_date, unix_now())
    }

    /// Unparseable timestamps are treated as expired.
    pub fn is_expired_at(auth_date: &str, now: i64) -> bool {
        match auth_date.parse::<i64>() {
            Ok(ts) => now.saturating_sub(ts) > MAX_AUTH_AGE_SECS,
            Err(_) => true,
        }
    }

    /// Runs the full admission check: signature, identity, freshness.
    pub fn authenticate(&self, init_data: &str) -> Result<VerifiedTelegramUser, AuthRejection> {
        self.authenticate_at(init_data, unix_now())
    }

    pub fn authenticate_at(
        &self,
        init_data: &str,
        now: i64,
    ) -> Result<VerifiedTelegramUser, AuthRejection> {
        if init_data.trim().is_empty() {
            return Err(AuthRejection::Missing);
        }
        if !self.verify(init_data) {
            return Err(AuthRejection::InvalidSignature);
        }
        let user = Self::parse(init_data).ok_or(AuthRejection::MalformedIdentity)?;
        if Self::is_expired_at(&user.auth_date, now) {
            return Err(AuthRejection::Expired);
        }
        Ok(user)
    }
}

pub fn verify_init_data(init_data: &str, bot_token: &str) -> bool {
    InitDataVerifier::new(bot_token).is_some_and(|v| v.verify(init_data))
}

fn parse_pairs(init_data: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(init_data.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_TOKEN: &str = "123456789:TEST-bot-token";
    const USER_JSON: &str = r#"{"id":123,"first_name":"Anna"}"#;

    // Computed independently with a reference HMAC implementation.
    const KNOWN_PAYLOAD: &str = "auth_date=1700000000&query_id=AAHdF6IQAAAAAN0XohDhrOrc&user=%7B%22id%22%3A123%2C%22first_name%22%3A%22Anna%22%7D&hash=9b1636cc90ad583c9dd7ce10cb97a6fbf4328a3063df65dbc39c6f9aabf02724";
    const KNOWN_HASH: &str = "9b1636cc90ad583c9dd7ce10cb97a6fbf4328a3063df65dbc39c6f9aabf02724";

    fn signed_payload(verifier: &InitDataVerifier, user: &str, auth_date: i64) -> String {
        let unsigned: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("user", user)
            .append_pair("auth_date", &auth_date.to_string())
            .finish();
        let hash = verifier.sign(&unsigned);
        format!("{}&hash={}", unsigned, hash)
    }

    #[test]
    fn known_answer_vector_verifies() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        assert!(verifier.verify(KNOWN_PAYLOAD));
        assert_eq!(verifier.sign(KNOWN_PAYLOAD), KNOWN_HASH);
        assert!(verify_init_data(KNOWN_PAYLOAD, BOT_TOKEN));
        assert!(!verify_init_data(KNOWN_PAYLOAD, "other-token"));
    }

    #[test]
    fn verify_is_deterministic() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let results: Vec<bool> = (0..5).map(|_| verifier.verify(KNOWN_PAYLOAD)).collect();
        assert!(results.iter().all(|r| *r));
        assert!(!verifier.verify("auth_date=1&hash=00"));
        assert!(!verifier.verify("auth_date=1&hash=00"));
    }

    #[test]
    fn tampering_any_value_breaks_signature() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let now = unix_now();
        let payload = signed_payload(&verifier, USER_JSON, now);
        assert!(verifier.verify(&payload));

        let tampered_user = payload.replace("Anna", "Anne");
        assert!(!verifier.verify(&tampered_user));

        let tampered_date = payload.replace(&now.to_string(), &(now + 1).to_string());
        assert!(!verifier.verify(&tampered_date));

        let extra = format!("{}&query_id=x", payload);
        assert!(!verifier.verify(&extra));
    }

    #[test]
    fn hash_comparison_is_exact() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let upper = KNOWN_PAYLOAD.replace(KNOWN_HASH, &KNOWN_HASH.to_uppercase());
        assert!(!verifier.verify(&upper));
    }

    #[test]
    fn pair_order_does_not_matter() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let mut parts: Vec<&str> = KNOWN_PAYLOAD.split('&').collect();
        parts.reverse();
        assert!(verifier.verify(&parts.join("&")));
        parts.rotate_left(1);
        assert!(verifier.verify(&parts.join("&")));
    }

    #[test]
    fn missing_hash_or_garbage_fails_without_panicking() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        assert!(!verifier.verify(""));
        assert!(!verifier.verify("auth_date=1700000000"));
        assert!(!verifier.verify("%%%&&&==="));
        assert!(!verifier.verify("hash="));
    }

    #[test]
    fn expiry_window_boundaries() {
        let now = 1_700_000_000;
        assert!(!InitDataVerifier::is_expired_at(&(now - 1).to_string(), now));
        assert!(!InitDataVerifier::is_expired_at(&(now - 86_400).to_string(), now));
        assert!(InitDataVerifier::is_expired_at(&(now - 86_401).to_string(), now));

        let fresh = (unix_now() - 1).to_string();
        assert!(!InitDataVerifier::is_expired(&fresh));
        let stale = (unix_now() - 86_401).to_string();
        assert!(InitDataVerifier::is_expired(&stale));
    }

    #[test]
    fn unparseable_auth_date_is_expired() {
        assert!(InitDataVerifier::is_expired("not-a-number"));
        assert!(InitDataVerifier::is_expired(""));
        assert!(InitDataVerifier::is_expired("12.5"));
    }

    #[test]
    fn parse_returns_none_for_missing_or_bad_user() {
        assert!(InitDataVerifier::parse("").is_none());
        assert!(InitDataVerifier::parse("auth_date=1&hash=ab").is_none());
        assert!(InitDataVerifier::parse("user=%7Bnot-json&hash=ab").is_none());
        assert!(InitDataVerifier::parse("user=%7B%22first_name%22%3A%22A%22%7D").is_none());
    }

    #[test]
    fn parse_passes_optional_fields_through() {
        let user = r#"{"id":42,"first_name":"Ivan","last_name":"P","username":"ivanp","language_code":"ru","is_premium":true}"#;
        let payload = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("user", user)
            .append_pair("auth_date", "1700000000")
            .append_pair("hash", "abc")
            .finish();

        let parsed = InitDataVerifier::parse(&payload).expect("user parsed");
        assert_eq!(parsed.id, 42);
        assert_eq!(parsed.last_name.as_deref(), Some("P"));
        assert_eq!(parsed.username.as_deref(), Some("ivanp"));
        assert_eq!(parsed.language_code.as_deref(), Some("ru"));
        assert_eq!(parsed.is_premium, Some(true));
        assert_eq!(parsed.photo_url, None);
        assert_eq!(parsed.auth_date, "1700000000");
        assert_eq!(parsed.hash, "abc");
    }

    #[test]
    fn fresh_signed_payload_is_authenticated() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let now = unix_now();
        let payload = signed_payload(&verifier, USER_JSON, now);
        let hash = verifier.sign(&payload);

        assert!(verifier.verify(&payload));
        let parsed = InitDataVerifier::parse(&payload).expect("user parsed");
        assert_eq!(
            parsed,
            VerifiedTelegramUser {
                id: 123,
                first_name: "Anna".into(),
                last_name: None,
                username: None,
                photo_url: None,
                language_code: None,
                is_premium: None,
                auth_date: now.to_string(),
                hash,
            }
        );
        assert!(!InitDataVerifier::is_expired(&parsed.auth_date));
        assert_eq!(verifier.authenticate(&payload), Ok(parsed));
    }

    #[test]
    fn wrong_hash_is_rejected() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let now = unix_now();
        let payload = signed_payload(&verifier, USER_JSON, now);
        let good = verifier.sign(&payload);
        let forged = payload.replace(&good, &"0".repeat(64));

        assert!(!verifier.verify(&forged));
        assert_eq!(
            verifier.authenticate(&forged),
            Err(AuthRejection::InvalidSignature)
        );

        let stale_forged = signed_payload(&verifier, USER_JSON, now - 100_000);
        let stale_hash = verifier.sign(&stale_forged);
        let stale_forged = stale_forged.replace(&stale_hash, &"f".repeat(64));
        assert_eq!(
            verifier.authenticate(&stale_forged),
            Err(AuthRejection::InvalidSignature)
        );
    }

    #[test]
    fn old_auth_date_is_stale() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let payload = signed_payload(&verifier, USER_JSON, unix_now() - 100_000);

        assert!(verifier.verify(&payload));
        let parsed = InitDataVerifier::parse(&payload).expect("user parsed");
        assert!(InitDataVerifier::is_expired(&parsed.auth_date));
        assert_eq!(verifier.authenticate(&payload), Err(AuthRejection::Expired));
    }

    #[test]
    fn empty_payload_is_missing() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        assert!(!verifier.verify(""));
        assert!(InitDataVerifier::parse("").is_none());
        assert_eq!(verifier.authenticate(""), Err(AuthRejection::Missing));
    }

    #[test]
    fn signed_payload_without_user_is_malformed() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let unsigned = format!("auth_date={}", unix_now());
        let payload = format!("{}&hash={}", unsigned, verifier.sign(&unsigned));
        assert_eq!(
            verifier.authenticate(&payload),
            Err(AuthRejection::MalformedIdentity)
        );
    }

    #[test]
    fn signing_key_is_derived_for_any_token() {
        let empty = InitDataVerifier::new("").unwrap();
        let long = InitDataVerifier::new(&"x".repeat(1024)).unwrap();
        let unsigned = "auth_date=1700000000&query_id=AAHdF6IQAAAAAN0XohDhrOrc";
        assert_eq!(empty.sign(unsigned).len(), 64);
        assert_ne!(empty.sign(unsigned), long.sign(unsigned));
        assert!(!verify_init_data(KNOWN_PAYLOAD, ""));
    }

    #[test]
    fn cloned_verifier_signs_identically() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let first = verifier.sign(KNOWN_PAYLOAD);
        let second = verifier.clone().sign(KNOWN_PAYLOAD);
        assert_eq!(first, KNOWN_HASH);
        assert_eq!(second, KNOWN_HASH);
        assert_eq!(verifier.sign(KNOWN_PAYLOAD), KNOWN_HASH);
    }

    #[test]
    fn debug_output_hides_key_material() {
        let verifier = InitDataVerifier::new(BOT_TOKEN).unwrap();
        let debug = format!("{:?}", verifier);
        assert!(debug.contains("redacted"));
        assert!(!debug.contains(BOT_TOKEN));
    }
}
