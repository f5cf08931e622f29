//! Balance provenance types.

use serde::{Deserialize, Serialize};

/// Which of the three independent sources last wrote the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceSource {
    /// Authoritative REST profile fetch at session start.
    Fetched,
    /// Incremental push from the realtime channel. Defined as always more
    /// recent than any in-flight fetch.
    Pushed,
    /// Local mutation applied ahead of server confirmation.
    Optimistic,
}

/// The current balance together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceState {
    /// Points balance. Intended to stay non-negative; the redemption guard
    /// is what enforces that for local mutations.
    pub value: i64,
    /// Provenance of `value`.
    pub source: BalanceSource,
    /// Monotonic stamp bumped on every applied update. Used to order a
    /// fetch completion against pushes that landed while it was in flight.
    pub revision: u64,
}

impl BalanceState {
    /// Initial state seeded from a cached value before any fetch completes.
    pub fn seeded(value: i64) -> Self {
        Self {
            value,
            source: BalanceSource::Fetched,
            revision: 0,
        }
    }
}
