//! # Punchcard Core
//!
//! Domain types and pure logic for the Punchcard loyalty client.
//!
//! This crate holds everything the networked crates agree on but that does
//! no I/O of its own:
//!
//! - **Wire models**: request/response records matching the backend's JSON.
//! - **Session**: the identity material threaded through every component as
//!   an explicit value, plus the [`SessionStore`] seam for whatever
//!   key-value area persists it across restarts.
//! - **Auth derivation**: per-request `Authorization` header synthesis for
//!   the bearer-token and encoded-credential schemes.
//! - **Push decoding**: tolerant decoding of realtime balance payloads.
//! - **Balance provenance**: the [`BalanceState`] record tracking which of
//!   the three balance sources last wrote the value.
//!
//! Gateway, channel, and session-context logic live in the sibling crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod balance;
pub mod models;
pub mod push;
pub mod session;

pub use auth::{AuthProvider, AuthScheme, RequestHeaders};
pub use balance::{BalanceSource, BalanceState};
pub use models::{
    Bar, LoginRequest, LoginResponse, RegisterRequest, Reward, TransactionReceipt,
    TransactionRequest, User,
};
pub use push::{points_topic, PointsPush};
pub use session::{MemorySessionStore, Session, SessionStore, SharedSession};
