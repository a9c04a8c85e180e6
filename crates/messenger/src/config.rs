use {
    messenger_protocol::send::INBOX_APP_ID,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    url::Url,
};

use crate::{Error, Result};

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_SEND_API_VERSION: &str = "v2.11";

/// Configuration for a single page access token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Page access token, sent as the `access_token` query parameter.
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,

    /// Graph API version segment (e.g. "v2.11").
    pub api_version: String,

    /// Graph API host. Overridable for tests and proxies.
    pub graph_base_url: String,

    /// Per-request deadline in seconds. 0 disables the deadline.
    pub request_timeout_secs: u64,

    /// Secondary receiver that `pass_thread_to_inbox` hands threads to.
    pub inbox_app_id: i64,
}

impl std::fmt::Debug for MessengerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessengerConfig")
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("graph_base_url", &self.graph_base_url)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            access_token: Secret::new(String::new()),
            api_version: DEFAULT_SEND_API_VERSION.into(),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.into(),
            request_timeout_secs: 30,
            inbox_app_id: INBOX_APP_ID,
        }
    }
}

impl MessengerConfig {
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            ..Self::default()
        }
    }

    /// Parse a config from an untyped JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(value).map_err(Error::Config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_token.expose_secret().is_empty() {
            return Err(Error::invalid_input("messenger access token is required"));
        }
        if self.api_version.is_empty() {
            return Err(Error::invalid_input("send API version is required"));
        }
        Ok(())
    }

    /// `{base}/{version}/me/messages`
    pub fn send_message_url(&self) -> Result<Url> {
        self.endpoint("me/messages")
    }

    /// `{base}/{version}/me/pass_thread_control`
    pub fn thread_control_url(&self) -> Result<Url> {
        self.endpoint("me/pass_thread_control")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.graph_base_url.trim_end_matches('/');
        let raw = format!("{base}/{}/{path}", self.api_version);
        Url::parse(&raw).map_err(|e| Error::external(format!("invalid endpoint {raw}"), e))
    }

    pub fn request_timeout(&self) -> Option<std::time::Duration> {
        (self.request_timeout_secs > 0)
            .then(|| std::time::Duration::from_secs(self.request_timeout_secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let cfg = MessengerConfig::default();
        assert_eq!(cfg.api_version, "v2.11");
        assert_eq!(cfg.graph_base_url, "https://graph.facebook.com");
        assert_eq!(cfg.request_timeout_secs, 30);
        assert_eq!(cfg.inbox_app_id, 263_902_037_430_900);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn deserialize_from_json() {
        let cfg = MessengerConfig::from_value(serde_json::json!({
            "access_token": "EAAB",
            "api_version": "v19.0"
        }))
        .unwrap();
        assert_eq!(cfg.access_token.expose_secret(), "EAAB");
        assert_eq!(cfg.api_version, "v19.0");
        // defaults for unspecified fields
        assert_eq!(cfg.request_timeout_secs, 30);
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = MessengerConfig::from_value(serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("access token is required"));
    }

    #[test]
    fn mistyped_field_is_config_error() {
        let err = MessengerConfig::from_value(serde_json::json!({
            "access_token": "tok",
            "request_timeout_secs": "thirty"
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().starts_with("invalid messenger config: "));
    }

    #[test]
    fn endpoints_include_version() {
        let cfg = MessengerConfig {
            graph_base_url: "http://127.0.0.1:1234/".into(),
            ..MessengerConfig::new("tok")
        };
        assert_eq!(
            cfg.send_message_url().unwrap().as_str(),
            "http://127.0.0.1:1234/v2.11/me/messages"
        );
        assert_eq!(
            cfg.thread_control_url().unwrap().as_str(),
            "http://127.0.0.1:1234/v2.11/me/pass_thread_control"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = MessengerConfig::new("super-secret-token");
        let debug_output = format!("{cfg:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-token"));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let cfg = MessengerConfig {
            request_timeout_secs: 0,
            ..MessengerConfig::new("tok")
        };
        assert!(cfg.request_timeout().is_none());
    }
}
