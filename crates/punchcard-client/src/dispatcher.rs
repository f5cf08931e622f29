//! Payment and redemption command flows.
//!
//! Both flows share one in-flight slot: a second command issued while one
//! is processing is rejected outright, never queued. A payment's direct
//! response is recorded but not trusted for the balance; the authoritative
//! update arrives over the realtime channel. Redemption has no backend call
//! yet; its confirmation is a fixed delay followed by an optimistic local
//! decrement, broadcast as if authoritative.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use punchcard_core::{Bar, Reward, SharedSession, TransactionReceipt, TransactionRequest};
use punchcard_gateway::LoyaltyApi;

use crate::error::CommandError;
use crate::sync::BalanceEngine;

/// Fixed charge for a venue payment, in the venue's currency.
pub const PAYMENT_AMOUNT: i64 = 50;

/// Stand-in confirmation delay until the redemption endpoint exists.
const REDEMPTION_CONFIRM_DELAY: Duration = Duration::from_millis(400);

/// What kind of command is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Spending money at a venue.
    Payment,
    /// Spending points on a reward.
    Redemption,
}

/// The single command allowed in flight at any time.
#[derive(Debug, Clone)]
pub struct PendingCommand {
    /// Payment or redemption.
    pub kind: CommandKind,
    /// Payment amount or redemption cost.
    pub amount: i64,
    /// The venue or reward acted on.
    pub target_id: i64,
    /// When the command was issued.
    pub issued_at: Instant,
}

/// Orchestrates user commands against the gateway and balance engine.
pub struct CommandDispatcher {
    gateway: Arc<dyn LoyaltyApi>,
    engine: Arc<BalanceEngine>,
    session: SharedSession,
    in_flight: Arc<Mutex<Option<PendingCommand>>>,
}

impl CommandDispatcher {
    /// Create a dispatcher over the shared session, gateway, and engine.
    pub fn new(
        gateway: Arc<dyn LoyaltyApi>,
        engine: Arc<BalanceEngine>,
        session: SharedSession,
    ) -> Self {
        Self {
            gateway,
            engine,
            session,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// The command currently processing, if any.
    pub fn in_flight(&self) -> Option<PendingCommand> {
        self.in_flight.lock().clone()
    }

    /// Pay the fixed amount at a venue.
    ///
    /// On success the receipt is returned as-is; the balance is left alone
    /// until the corresponding push arrives.
    pub async fn pay(&self, bar: &Bar) -> Result<TransactionReceipt, CommandError> {
        let session = self.session.get().ok_or(CommandError::SessionAbsent)?;
        let _guard = self.begin(PendingCommand {
            kind: CommandKind::Payment,
            amount: PAYMENT_AMOUNT,
            target_id: bar.id,
            issued_at: Instant::now(),
        })?;

        let request = TransactionRequest {
            user_id: session.user_id,
            bar_id: bar.id,
            amount: PAYMENT_AMOUNT,
        };
        match self.gateway.create_transaction(&request).await {
            Ok(receipt) => {
                tracing::info!(
                    bar_id = bar.id,
                    amount = PAYMENT_AMOUNT,
                    "payment accepted; balance arrives via push"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(bar_id = bar.id, error = %e, "payment rejected");
                Err(CommandError::rejected(&e))
            }
        }
    }

    /// Redeem a reward against the current balance.
    ///
    /// Rejected locally, without contacting the server, when the balance
    /// cannot cover the cost. Returns the new balance on success.
    pub async fn redeem(&self, reward: &Reward) -> Result<i64, CommandError> {
        self.session.get().ok_or(CommandError::SessionAbsent)?;
        let _guard = self.begin(PendingCommand {
            kind: CommandKind::Redemption,
            amount: reward.points_cost,
            target_id: reward.id,
            issued_at: Instant::now(),
        })?;

        let balance = self.engine.state().value;
        if balance < reward.points_cost {
            let deficit = reward.points_cost - balance;
            tracing::debug!(reward_id = reward.id, deficit, "redemption short on points");
            return Err(CommandError::InsufficientPoints { deficit });
        }

        // Simulated confirmation until the redemption endpoint lands; the
        // decrement below is optimistic and broadcast as if authoritative.
        tokio::time::sleep(REDEMPTION_CONFIRM_DELAY).await;

        let new_balance = balance - reward.points_cost;
        self.engine.apply_optimistic(new_balance);
        tracing::info!(
            reward_id = reward.id,
            cost = reward.points_cost,
            new_balance,
            "reward redeemed"
        );
        Ok(new_balance)
    }

    fn begin(&self, command: PendingCommand) -> Result<InFlightGuard, CommandError> {
        let mut slot = self.in_flight.lock();
        if slot.is_some() {
            tracing::debug!(kind = ?command.kind, "command rejected: another is in flight");
            return Err(CommandError::Busy);
        }
        *slot = Some(command);
        Ok(InFlightGuard {
            slot: self.in_flight.clone(),
        })
    }
}

// Clears the in-flight slot on every exit path, including early returns.
struct InFlightGuard {
    slot: Arc<Mutex<Option<PendingCommand>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}
