//! Run metrics for protocol evaluation.
//!
//! Collected during a simulation run: gossip traffic (publishes, per-hop
//! deliveries and drops), service outcomes (pickups, deliveries, tardiness)
//! and periodic cache-divergence snapshots across the fleet.

use crate::world::SimEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GossipStats {
    pub published: u64,
    pub hops_delivered: u64,
    pub hops_dropped: u64,
}

impl GossipStats {
    /// Fraction of attempted hops that went through.
    pub fn hop_rate(&self) -> f64 {
        let attempted = self.hops_delivered + self.hops_dropped;
        if attempted == 0 {
            return 0.0;
        }
        self.hops_delivered as f64 / attempted as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub picked_up: u64,
    pub delivered: u64,
    pub pickup_tardiness_ms: i64,
    pub delivery_tardiness_ms: i64,
}

/// Final shape of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRun {
    pub ticks: u64,
    pub gossip: GossipStats,
    pub service: ServiceStats,
    /// Worst fleet-wide cache divergence observed.
    pub max_divergence: usize,
    pub final_divergence: usize,
}

#[derive(Debug, Default)]
pub struct EvalCollector {
    gossip: GossipStats,
    service: ServiceStats,
    /// (time, missing (courier, parcel) pairs vs. the union of knowledge)
    divergence: Vec<(i64, usize)>,
}

impl EvalCollector {
    pub fn record_publish(&mut self) {
        self.gossip.published += 1;
    }

    pub fn record_hop_delivered(&mut self) {
        self.gossip.hops_delivered += 1;
    }

    pub fn record_hop_dropped(&mut self) {
        self.gossip.hops_dropped += 1;
    }

    pub fn record_event(&mut self, event: &SimEvent) {
        match event {
            SimEvent::PickedUp { tardiness_ms, .. } => {
                self.service.picked_up += 1;
                self.service.pickup_tardiness_ms += tardiness_ms;
            }
            SimEvent::Delivered { tardiness_ms, .. } => {
                self.service.delivered += 1;
                self.service.delivery_tardiness_ms += tardiness_ms;
            }
        }
    }

    pub fn snapshot(&mut self, now_ms: i64, divergence: usize) {
        self.divergence.push((now_ms, divergence));
    }

    pub fn gossip(&self) -> &GossipStats {
        &self.gossip
    }

    pub fn service(&self) -> &ServiceStats {
        &self.service
    }

    pub fn finalize(&self, ticks: u64) -> EvalRun {
        EvalRun {
            ticks,
            gossip: self.gossip.clone(),
            service: self.service.clone(),
            max_divergence: self.divergence.iter().map(|(_, d)| *d).max().unwrap_or(0),
            final_divergence: self.divergence.last().map(|(_, d)| *d).unwrap_or(0),
        }
    }
}
