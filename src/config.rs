//! Construction-time configuration.
//!
//! Policies form closed sets picked by plain enums; there is no runtime
//! loading. Defaults mirror the reference parameterization: comm radius
//! 1 km at 80% reliability, lookahead over 10 futures backed by 42 samples,
//! 10% switching inertia and punctuality tolerance.

use crate::select::{BestFutureSelect, EarlySelect, SelectPolicy};
use crate::value::{SimpleValue, TrivialValue, ValuePolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValuationKind {
    Trivial,
    #[default]
    Simple,
}

impl ValuationKind {
    pub fn build(self) -> Box<dyn ValuePolicy> {
        match self {
            ValuationKind::Trivial => Box::new(TrivialValue),
            ValuationKind::Simple => Box::new(SimpleValue),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectorKind {
    Early,
    #[default]
    BestFuture,
}

impl SelectorKind {
    pub fn build(self, lookahead: &LookaheadConfig) -> Box<dyn SelectPolicy> {
        match self {
            SelectorKind::Early => Box::new(EarlySelect),
            SelectorKind::BestFuture => Box::new(BestFutureSelect::new(
                lookahead.nr_considered_futures,
                lookahead.nr_future_backers,
                lookahead.inertial_threshold,
                lookahead.punctuality,
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookaheadConfig {
    pub nr_considered_futures: usize,
    pub nr_future_backers: usize,
    pub inertial_threshold: f64,
    pub punctuality: f64,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self {
            nr_considered_futures: 10,
            nr_future_backers: 42,
            inertial_threshold: 1.1,
            punctuality: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Rebroadcast budget a fresh bid starts with.
    pub bid_ttl: i32,
    /// Sensing and broadcast radius, km.
    pub comm_radius: f64,
    /// Per-endpoint probability that a broadcast hop goes through.
    pub comm_reliability: f64,
    /// How long a vanished parcel stays blocked from re-merging, ms.
    pub vanished_horizon_ms: i64,
    /// Ticks after which a silent peer drops out of the contact log.
    pub contact_horizon_ticks: u32,
    /// Base seed for per-courier wander randomness.
    pub agent_seed: u64,
    pub valuation: ValuationKind,
    pub selector: SelectorKind,
    pub lookahead: LookaheadConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bid_ttl: 5,
            comm_radius: 1.0,
            comm_reliability: 0.8,
            vanished_horizon_ms: 600_000,
            contact_horizon_ticks: 6_000,
            agent_seed: 0,
            valuation: ValuationKind::default(),
            selector: SelectorKind::default(),
            lookahead: LookaheadConfig::default(),
        }
    }
}
