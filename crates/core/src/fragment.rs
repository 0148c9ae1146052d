//! Redirect response parsing
//!
//! The authorization server hands the result back in the URL fragment. These
//! functions turn that fragment (or any query string) into data without
//! touching the window location.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use handoff_domain::{AuthData, AuthError, Result};
use url::Url;

/// Which part of a URL [`parse_query_params`] reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStrategy {
    /// The `?query` part only.
    Regular,
    /// The `#fragment` part only.
    Hash,
    /// Both, fragment values overriding query values.
    #[default]
    Both,
}

/// Parse an OAuth redirect fragment using the current time for expiry.
pub fn parse_fragment(fragment: &str) -> AuthData {
    parse_fragment_at(fragment, Utc::now())
}

/// Parse an OAuth redirect fragment, computing expiry relative to `now`.
///
/// An `error` response yields only `error`/`error_description`. A token
/// response yields the token, its expiry and `state`. Anything else yields an
/// empty record.
pub fn parse_fragment_at(fragment: &str, now: DateTime<Utc>) -> AuthData {
    let params = parse_pairs(fragment);

    if let Some(error) = params.get("error") {
        return AuthData::with_error(error.clone(), params.get("error_description").cloned());
    }

    let Some(token) = params.get("access_token") else {
        return AuthData::default();
    };

    let mut data = AuthData::with_token(token.replace('+', " "));
    data.state = params.get("state").cloned().map(serde_json::Value::String);

    let expires_at = params
        .get("expires_in")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(|ms| now.timestamp_millis().checked_add(ms));
    // Out-of-range lifetimes leave the expiry unset.
    if let Some(expires_at) = expires_at {
        data.set_expiry(expires_at);
    }

    data
}

/// Parse the query and/or fragment of `href` into a map.
///
/// Fails with a configuration error listing every key of `required` that is
/// missing.
pub fn parse_query_params(
    href: &str,
    strategy: QueryStrategy,
    required: &[&str],
) -> Result<HashMap<String, String>> {
    let url = Url::parse(href).map_err(|e| AuthError::Config(format!("invalid url {href}: {e}")))?;

    let mut params = HashMap::new();
    if matches!(strategy, QueryStrategy::Regular | QueryStrategy::Both) {
        params.extend(parse_pairs(url.query().unwrap_or_default()));
    }
    if matches!(strategy, QueryStrategy::Hash | QueryStrategy::Both) {
        params.extend(parse_pairs(url.fragment().unwrap_or_default()));
    }

    let missing: Vec<&str> =
        required.iter().copied().filter(|key| !params.contains_key(*key)).collect();
    if !missing.is_empty() {
        return Err(AuthError::Config(format!(
            "Missing required query params: \"{}\"",
            missing.join("\", \"")
        )));
    }

    Ok(params)
}

/// Split `a=1&b=2` into pairs. Leading `#`/`?` are ignored, keys end at the
/// first `=`, and pairs with an empty key or value are dropped.
fn parse_pairs(input: &str) -> HashMap<String, String> {
    input
        .trim_start_matches(['#', '?'])
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .map(|(key, value)| (key.to_string(), decode_value(value)))
        .collect()
}

/// The server double-encodes values and sends spaces as `+`.
fn decode_value(raw: &str) -> String {
    let spaced = raw.replace('+', "%20");
    let once = urlencoding::decode(&spaced).map_or_else(|_| spaced.clone(), |v| v.into_owned());
    urlencoding::decode(&once).map_or(once.clone(), |v| v.into_owned())
}
