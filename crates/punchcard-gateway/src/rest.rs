//! REST gateway implementation over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use punchcard_core::{
    AuthProvider, Bar, LoginRequest, LoginResponse, RegisterRequest, SharedSession,
    TransactionReceipt, TransactionRequest, User,
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base API URL, without a trailing slash.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// The backend operations the client consumes.
///
/// Implemented by [`RestGateway`] for production and by in-memory fakes in
/// tests.
#[async_trait]
pub trait LoyaltyApi: Send + Sync {
    /// Authenticate and obtain the session material.
    async fn login(&self, request: &LoginRequest) -> GatewayResult<LoginResponse>;

    /// Create a new account. Does not open a session; the created-user
    /// payload is passed through opaquely.
    async fn register(&self, request: &RegisterRequest) -> GatewayResult<serde_json::Value>;

    /// Fetch the authenticated user's profile, including the authoritative
    /// points balance.
    async fn fetch_profile(&self, user_id: i64) -> GatewayResult<User>;

    /// List participating venues.
    async fn list_bars(&self) -> GatewayResult<Vec<Bar>>;

    /// Create a points-spending transaction.
    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> GatewayResult<TransactionReceipt>;
}

/// REST gateway over `reqwest`.
pub struct RestGateway {
    config: GatewayConfig,
    client: reqwest::Client,
    auth: AuthProvider,
    session: SharedSession,
}

impl RestGateway {
    /// Create a gateway for the configured backend.
    pub fn new(
        config: GatewayConfig,
        auth: AuthProvider,
        session: SharedSession,
    ) -> GatewayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            config,
            client,
            auth,
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        let headers = self.auth.headers_for(path, self.session.get().as_ref());

        let mut builder = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, headers.content_type);
        if let Some(value) = headers.authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> GatewayResult<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status = status.as_u16(), "gateway request rejected");
            return Err(GatewayError::rejected(status.as_u16(), &body));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::decode(e.to_string()))
    }
}

#[async_trait]
impl LoyaltyApi for RestGateway {
    async fn login(&self, request: &LoginRequest) -> GatewayResult<LoginResponse> {
        tracing::debug!(username = %request.username, "logging in");
        self.execute(self.request(Method::POST, "/v1/auth/login").json(request))
            .await
    }

    async fn register(&self, request: &RegisterRequest) -> GatewayResult<serde_json::Value> {
        tracing::debug!(email = %request.email, "registering account");
        self.execute(self.request(Method::POST, "/v1/auth/register").json(request))
            .await
    }

    async fn fetch_profile(&self, user_id: i64) -> GatewayResult<User> {
        tracing::debug!(user_id, "fetching profile");
        self.execute(self.request(Method::GET, &format!("/v1/users/{user_id}")))
            .await
    }

    async fn list_bars(&self) -> GatewayResult<Vec<Bar>> {
        tracing::debug!("listing bars");
        self.execute(self.request(Method::GET, "/bars")).await
    }

    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> GatewayResult<TransactionReceipt> {
        tracing::debug!(
            user_id = request.user_id,
            bar_id = request.bar_id,
            amount = request.amount,
            "creating transaction"
        );
        self.execute(self.request(Method::POST, "/transactions").json(request))
            .await
    }
}
