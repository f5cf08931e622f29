//! Client configuration.

use punchcard_channel::ChannelConfig;
use punchcard_core::AuthScheme;
use punchcard_gateway::GatewayConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

fn default_scheme() -> AuthScheme {
    AuthScheme::Bearer
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Authorization scheme of the active deployment. Exactly one scheme
    /// is ever in effect.
    #[serde(default = "default_scheme")]
    pub auth_scheme: AuthScheme,

    /// REST gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Realtime channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_scheme: default_scheme(),
            gateway: GatewayConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML configuration document.
    pub fn from_toml(text: &str) -> ClientResult<Self> {
        toml::from_str(text).map_err(|e| ClientError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ClientConfig::from_toml("").unwrap();
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert_eq!(config.gateway.base_url, "http://localhost:8080/api");
        assert_eq!(config.channel.url, "ws://localhost:8080/ws");
    }

    #[test]
    fn sections_override_selectively() {
        let config = ClientConfig::from_toml(
            r#"
            auth_scheme = "basic"

            [gateway]
            base_url = "https://loyalty.example.com/api"
            request_timeout_secs = 5

            [channel]
            url = "https://loyalty.example.com/ws"
            connect_timeout_secs = 3
            poll_interval_millis = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.auth_scheme, AuthScheme::Basic);
        assert_eq!(config.gateway.request_timeout_secs, 5);
        assert_eq!(config.channel.poll_interval_millis, 500);
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = ClientConfig::from_toml("auth_scheme = 3").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
