//! # Punchcard Gateway
//!
//! Stateless REST client for the loyalty backend: login, registration,
//! profile fetch, venue listing, and transaction creation.
//!
//! The gateway consumes the backend's endpoint map as-is, including its
//! versioning split (auth and user endpoints live under `/v1`, venue and
//! transaction endpoints do not). Authorization headers are derived per
//! request by the [`AuthProvider`](punchcard_core::AuthProvider) from the
//! shared session handle.
//!
//! The [`LoyaltyApi`] trait is the seam consumers program against; the
//! dispatcher and session context take an `Arc<dyn LoyaltyApi>` so tests can
//! substitute a fake backend.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod rest;

pub use error::{GatewayError, GatewayResult};
pub use rest::{GatewayConfig, LoyaltyApi, RestGateway};
