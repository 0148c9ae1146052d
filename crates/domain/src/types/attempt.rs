//! Login attempt metadata
//!
//! Before handing control to the login page the opener persists what it
//! asked for under the attempt's topic key. The landing page reads it back
//! (using the `state` parameter returned by the authorization server) to find
//! out where the result belongs and which application state to restore.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::RESPONSE_TYPE_TOKEN;

/// Query parameters sent to the authorization endpoint
///
/// Values are kept raw here; percent-encoding happens when the URL is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRequestParams {
    pub client_id: String,
    pub response_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// Opaque correlation value. Strings go on the wire as-is, anything
    /// else as its JSON text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl AuthRequestParams {
    /// Implicit grant request for `client_id`.
    pub fn implicit(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            response_type: RESPONSE_TYPE_TOKEN.to_string(),
            ..Self::default()
        }
    }

    /// Parameters in wire order, skipping every key whose value is empty.
    pub fn query_pairs(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        [
            ("client_id", Some(Cow::Borrowed(self.client_id.as_str()))),
            ("response_type", Some(Cow::Borrowed(self.response_type.as_str()))),
            ("redirect_uri", self.redirect_uri.as_deref().map(Cow::Borrowed)),
            ("state", self.state.as_ref().and_then(state_text)),
            ("org", self.org.as_deref().map(Cow::Borrowed)),
            ("provider", self.provider.as_deref().map(Cow::Borrowed)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v)))
        .collect()
    }
}

fn state_text(state: &Value) -> Option<Cow<'_, str>> {
    match state {
        Value::Null => None,
        Value::String(text) => Some(Cow::Borrowed(text.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

/// How the landing page hands the result back to the opener
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    /// Write the merged auth data straight into the auth data store.
    #[default]
    Storage,
    /// Publish a `COMPLETE` event on the attempt's topic.
    Messenger,
}

/// Metadata persisted under a topic key before the redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetadata {
    /// Requested query parameters. `state` holds the caller's application
    /// state, not the topic key.
    #[serde(flatten)]
    pub params: AuthRequestParams,

    /// Key of the long-lived auth data record.
    #[serde(rename = "storageKey")]
    pub storage_key: String,

    /// Keep the landing window and this entry around for inspection.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub debug: bool,

    #[serde(default)]
    pub delivery: DeliveryChannel,
}

impl AttemptMetadata {
    pub fn new(params: AuthRequestParams, storage_key: impl Into<String>) -> Self {
        Self { params, storage_key: storage_key.into(), debug: false, delivery: DeliveryChannel::default() }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_delivery(mut self, delivery: DeliveryChannel) -> Self {
        self.delivery = delivery;
        self
    }

    /// Caller-supplied application state, if any. `null` and `""` count as absent.
    pub fn app_state(&self) -> Option<&Value> {
        self.params.state.as_ref().filter(|state| match state {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pairs_skip_empty_values() {
        let mut params = AuthRequestParams::implicit("client");
        params.redirect_uri = Some("https://app/cb".into());
        params.org = Some(String::new());

        assert_eq!(
            params.query_pairs(),
            vec![
                ("client_id", Cow::from("client")),
                ("response_type", Cow::from("token")),
                ("redirect_uri", Cow::from("https://app/cb")),
            ]
        );
    }

    #[test]
    fn structured_state_is_sent_as_json_text() {
        let mut params = AuthRequestParams::implicit("client");
        params.state = Some(serde_json::json!({ "route": "/x" }));
        let pairs = params.query_pairs();
        assert_eq!(pairs[2], ("state", Cow::from(r#"{"route":"/x"}"#)));

        params.state = Some(Value::Null);
        assert!(params.query_pairs().iter().all(|(key, _)| *key != "state"));
    }

    #[test]
    fn minimal_metadata_parses_with_defaults() {
        let raw = r#"{"storageKey":"app_auth","state":"route/abc"}"#;
        let metadata: AttemptMetadata = serde_json::from_str(raw).unwrap();

        assert_eq!(metadata.storage_key, "app_auth");
        assert_eq!(metadata.app_state(), Some(&Value::from("route/abc")));
        assert!(!metadata.debug);
        assert_eq!(metadata.delivery, DeliveryChannel::Storage);
        assert!(metadata.params.client_id.is_empty());
    }

    #[test]
    fn object_state_round_trips_through_metadata() {
        let raw = r#"{"storageKey":"app_auth","state":{"route":"/x","n":1}}"#;
        let metadata: AttemptMetadata = serde_json::from_str(raw).unwrap();

        assert_eq!(metadata.app_state(), Some(&serde_json::json!({ "route": "/x", "n": 1 })));
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["state"]["route"], "/x");

        let blank: AttemptMetadata =
            serde_json::from_str(r#"{"storageKey":"k","state":""}"#).unwrap();
        assert_eq!(blank.app_state(), None);
    }

    #[test]
    fn metadata_flattens_params() {
        let metadata = AttemptMetadata::new(AuthRequestParams::implicit("c"), "key")
            .with_debug(true)
            .with_delivery(DeliveryChannel::Messenger);
        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["client_id"], "c");
        assert_eq!(json["response_type"], "token");
        assert_eq!(json["storageKey"], "key");
        assert_eq!(json["debug"], true);
        assert_eq!(json["delivery"], "messenger");
    }
}
