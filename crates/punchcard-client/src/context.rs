//! The per-session client context.
//!
//! One [`LoyaltyClient`] exists per logical session. It owns the shared
//! session value, the balance engine, and the realtime channel, wires them
//! together at sign-in, and tears all of it down with a single logout call.
//! Nothing here re-reads identity from ambient storage: the session store
//! is read at resume and written at sign-in, and every component receives
//! the shared handle as a dependency.

use std::sync::Arc;

use punchcard_channel::{
    ChannelConfig, LongPollTransport, RealtimeChannel, StreamTransport, WebSocketTransport,
};
use punchcard_core::{
    AuthProvider, AuthScheme, Bar, LoginRequest, RegisterRequest, Reward, Session, SessionStore,
    SharedSession, TransactionReceipt,
};
use punchcard_gateway::{LoyaltyApi, RestGateway};
use url::Url;

use crate::config::ClientConfig;
use crate::dispatcher::CommandDispatcher;
use crate::error::{ClientError, ClientResult, CommandError};
use crate::sync::BalanceEngine;

/// The client context for one signed-in user.
pub struct LoyaltyClient {
    config: ClientConfig,
    store: Arc<dyn SessionStore>,
    session: SharedSession,
    gateway: Arc<dyn LoyaltyApi>,
    engine: Arc<BalanceEngine>,
    channel: RealtimeChannel,
    dispatcher: CommandDispatcher,
}

impl LoyaltyClient {
    /// Build a client against the real gateway and a transport chosen from
    /// the channel URL scheme.
    pub fn new(config: ClientConfig, store: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let session = SharedSession::new();
        let auth = AuthProvider::new(config.auth_scheme);
        let gateway: Arc<dyn LoyaltyApi> = Arc::new(RestGateway::new(
            config.gateway.clone(),
            auth,
            session.clone(),
        )?);
        let transport = transport_for(&config.channel)?;
        Ok(Self::assemble(config, store, session, gateway, transport))
    }

    /// Build a client over externally supplied gateway and transport.
    ///
    /// This is the seam the integration tests use to run full session flows
    /// against in-memory fakes.
    pub fn with_parts(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        gateway: Arc<dyn LoyaltyApi>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        Self::assemble(config, store, SharedSession::new(), gateway, transport)
    }

    fn assemble(
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
        session: SharedSession,
        gateway: Arc<dyn LoyaltyApi>,
        transport: Arc<dyn StreamTransport>,
    ) -> Self {
        let engine = Arc::new(BalanceEngine::new(None));
        let push_engine = engine.clone();
        let channel = RealtimeChannel::new(config.channel.clone(), transport, move |value| {
            push_engine.apply_push(value)
        });
        let dispatcher = CommandDispatcher::new(gateway.clone(), engine.clone(), session.clone());
        Self {
            config,
            store,
            session,
            gateway,
            engine,
            channel,
            dispatcher,
        }
    }

    /// Authenticate, persist the session, and bring the session up.
    pub async fn sign_in(&self, username: &str, password: &str) -> ClientResult<()> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.gateway.login(&request).await?;

        let mut session =
            Session::new(response.user_id, response.username.clone()).with_token(response.token);
        if self.config.auth_scheme == AuthScheme::Basic {
            session = session.with_secret(password);
        }
        self.session.set(session.clone());
        self.store.save(&session);
        tracing::info!(user_id = session.user_id, "signed in");

        self.start().await
    }

    /// Resume the session persisted by a previous run.
    pub async fn resume(&self) -> ClientResult<()> {
        let session = self.store.load().ok_or(ClientError::SessionAbsent)?;
        tracing::info!(user_id = session.user_id, "resuming persisted session");
        self.session.set(session);
        self.start().await
    }

    /// Create a new account. Does not open a session; sign in afterwards.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<serde_json::Value> {
        Ok(self.gateway.register(request).await?)
    }

    /// List participating venues.
    pub async fn bars(&self) -> ClientResult<Vec<Bar>> {
        Ok(self.gateway.list_bars().await?)
    }

    /// Pay the fixed amount at a venue.
    pub async fn pay(&self, bar: &Bar) -> Result<TransactionReceipt, CommandError> {
        self.dispatcher.pay(bar).await
    }

    /// Redeem a reward against the current balance.
    pub async fn redeem(&self, reward: &Reward) -> Result<i64, CommandError> {
        self.dispatcher.redeem(reward).await
    }

    /// End the session: disconnect the channel, drop every balance
    /// observer, and clear persisted identity. One signal, no partial
    /// teardown.
    pub async fn logout(&self) {
        self.channel.disconnect().await;
        self.engine.reset();
        self.session.clear();
        self.store.clear();
        tracing::info!("logged out");
    }

    /// The balance engine, for subscribing to updates.
    pub fn engine(&self) -> &Arc<BalanceEngine> {
        &self.engine
    }

    /// The realtime channel, for status checks and manual reconnects.
    pub fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    /// The command dispatcher.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Snapshot of the current session, if one is active.
    pub fn session(&self) -> Option<Session> {
        self.session.get()
    }

    // Bring the session up: seed from cache, fetch the authoritative
    // balance, then subscribe to pushes. Neither a failed fetch nor an
    // unavailable channel ends the session.
    async fn start(&self) -> ClientResult<()> {
        let session = self.session.get().ok_or(ClientError::SessionAbsent)?;

        if let Some(cached) = session.cached_balance {
            self.engine.seed(cached);
        }

        let snapshot = self.engine.begin_fetch();
        match self.gateway.fetch_profile(session.user_id).await {
            Ok(profile) => {
                self.engine.complete_fetch(snapshot, profile.points_balance);
                let refreshed = session.clone().with_cached_balance(profile.points_balance);
                self.session.set(refreshed.clone());
                self.store.save(&refreshed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed; continuing with cached balance");
                self.engine.fail_fetch();
            }
        }

        if let Err(e) = self.channel.connect(session.user_id).await {
            tracing::warn!(error = %e, "realtime channel unavailable; balance updates paused");
        }
        Ok(())
    }
}

fn transport_for(config: &ChannelConfig) -> ClientResult<Arc<dyn StreamTransport>> {
    let url = Url::parse(&config.url)
        .map_err(|e| ClientError::config(format!("channel url: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(Arc::new(WebSocketTransport::new(config.connect_timeout()))),
        "http" | "https" => Ok(Arc::new(LongPollTransport::new(config.poll_interval())?)),
        other => Err(ClientError::config(format!(
            "unsupported channel scheme: {other}"
        ))),
    }
}
