//! # Punchcard Client
//!
//! The session context for the Punchcard loyalty client: balance
//! reconciliation, command dispatch, and session lifecycle.
//!
//! A signed-in session keeps one points balance consistent across three
//! independent sources: the authoritative profile fetch at session start,
//! incremental pushes from the realtime channel, and optimistic local
//! mutations from the user's own commands. The [`BalanceEngine`] decides
//! which value is authoritative at any instant and broadcasts every change
//! to its observers; the [`CommandDispatcher`] runs payment and redemption
//! flows; the [`LoyaltyClient`] owns all of it for exactly one session and
//! tears it down with a single logout.
//!
//! ```no_run
//! use std::sync::Arc;
//! use punchcard_client::{ClientConfig, LoyaltyClient, MemorySessionStore};
//!
//! # async fn run() -> Result<(), punchcard_client::ClientError> {
//! let client = LoyaltyClient::new(ClientConfig::default(), Arc::new(MemorySessionStore::new()))?;
//! client.sign_in("ada", "hunter2").await?;
//! client.engine().subscribe(|state| println!("balance: {}", state.value));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod sync;

pub use config::ClientConfig;
pub use context::LoyaltyClient;
pub use dispatcher::{CommandDispatcher, CommandKind, PendingCommand, PAYMENT_AMOUNT};
pub use error::{ClientError, ClientResult, CommandError};
pub use sync::{BalanceEngine, ObserverId, SyncPhase};

// Re-export the types an SDK consumer needs without reaching into the
// lower crates directly.
pub use punchcard_channel::{ChannelConfig, ChannelStatus};
pub use punchcard_core::{
    AuthScheme, BalanceSource, BalanceState, Bar, MemorySessionStore, RegisterRequest, Reward,
    Session, SessionStore, User,
};
pub use punchcard_gateway::GatewayConfig;
