//! Client identity resolution.
//!
//! A client is identified by the `user_id` query parameter or, failing
//! that, by the `waitroom_uid` cookie set on its first join.

use axum::http::{header, HeaderMap, HeaderValue};
use serde::Deserialize;

/// Cookie that carries a minted identity between requests.
pub const IDENTITY_COOKIE: &str = "waitroom_uid";

/// Query parameters carrying an explicit identity.
#[derive(Debug, Default, Deserialize)]
pub struct IdentityParams {
    pub user_id: Option<String>,
}

/// Identity from the query string, else from the identity cookie.
///
/// An explicit `user_id` wins even when blank, so that it is rejected
/// rather than silently replaced by the cookie.
pub fn resolve_identity(params: &IdentityParams, headers: &HeaderMap) -> Option<String> {
    if let Some(user_id) = &params.user_id {
        return Some(user_id.clone());
    }
    identity_cookie(headers)
}

/// Value of the identity cookie, if present and non-empty.
pub fn identity_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == IDENTITY_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Fresh random identity for a client that presented none.
pub fn mint_identity() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `Set-Cookie` value persisting `identity`.
pub fn identity_set_cookie(identity: &str) -> Result<HeaderValue, header::InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        IDENTITY_COOKIE, identity
    ))
}
