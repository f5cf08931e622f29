//! Wire models shared with the loyalty backend.
//!
//! Field names follow the backend's JSON verbatim, so everything here is
//! `camelCase` on the wire.

use serde::{Deserialize, Serialize};

/// A loyalty program member, as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Backend identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Current points balance according to the backend.
    pub points_balance: i64,
}

/// A venue participating in the loyalty program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    /// Backend identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Street address, when the backend revision carries one.
    #[serde(default)]
    pub location: Option<String>,
    /// Rewards redeemable at this venue. Absent on older backend revisions.
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

/// A reward redeemable against the points balance at a specific venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    /// Backend identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Points deducted when the reward is redeemed.
    pub points_cost: i64,
    /// Optional artwork URL.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Credentials submitted to the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password; only ever sent over the login call.
    pub password: String,
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests, when the deployment issues one.
    pub token: String,
    /// Identifier of the authenticated user.
    pub user_id: i64,
    /// Login name echoed back.
    pub username: String,
    /// Account email, when the backend revision carries one.
    #[serde(default)]
    pub email: Option<String>,
    /// Account role, when the backend revision carries one.
    #[serde(default)]
    pub role: Option<String>,
}

/// New-account payload for the registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Given name.
    pub firstname: String,
    /// Family name.
    pub lastname: String,
    /// Contact email; doubles as the account identity on some revisions.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// A points-spending transaction at a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    /// Paying user.
    pub user_id: i64,
    /// Venue being paid.
    pub bar_id: i64,
    /// Amount charged, in the venue's currency.
    pub amount: i64,
}

/// Server acknowledgement of a created transaction.
///
/// `new_balance` is advisory only: the authoritative balance update for a
/// payment arrives over the realtime channel, not in this response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction identifier, once persisted.
    #[serde(default)]
    pub id: Option<i64>,
    /// Points credited for the purchase.
    #[serde(default)]
    pub points_earned: Option<i64>,
    /// Hash of the QR code generated for the transaction.
    #[serde(default)]
    pub qr_code_hash: Option<String>,
    /// Backend processing status.
    #[serde(default)]
    pub status: Option<String>,
    /// Advisory balance echoed by some backend revisions.
    #[serde(default)]
    pub new_balance: Option<i64>,
}
