//! Bid records and the per-courier bid store.
//!
//! Every courier keeps its own picture of the running auction in a
//! [`BidStore`]: the best known bid per parcel, with three coordinated views:
//!
//! - **by-task**: parcel id -> single dominant record (at most one per parcel)
//! - **rotation**: FIFO queue over the same records, giving every record a
//!   fair turn at the one outbound broadcast slot per cycle
//! - **by-value**: descending value order for cheap top-K peeks
//!
//! All mutation goes through [`BidStore::ensconce`], [`BidStore::yoink`] and
//! [`BidStore::purge`], which keep the views in lockstep. Records themselves
//! are immutable values; relaying one constructs a new record that shares
//! every field except the carrier.

use haulier_core::Point;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, trace};

/// One round of the SplitMix64 output permutation.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

/// Deterministic tiebreaker for exact-value bid ties.
///
/// Part of the protocol contract: FNV-1a 64 over `"<bidder>|<parcel>"`,
/// finalized by one SplitMix64 round. Any two implementations that agree on
/// the two identifiers agree on the tiebreaker, so equal-value conflicts
/// resolve the same way everywhere.
pub fn tiebreak(bidder_id: &str, parcel_id: &str) -> u64 {
    let mut buf = Vec::with_capacity(bidder_id.len() + parcel_id.len() + 1);
    buf.extend_from_slice(bidder_id.as_bytes());
    buf.push(b'|');
    buf.extend_from_slice(parcel_id.as_bytes());
    splitmix64(fnv1a64(&buf))
}

/// Deterministic seed mixer for per-cycle sampling seeds.
pub fn mix_seed(a: u64, b: u64, c: u64) -> u64 {
    splitmix64(a ^ splitmix64(b ^ splitmix64(c)))
}

/// One courier's valuation of one parcel at one point in time.
///
/// `original_bidder` is provenance and survives any number of hops;
/// `carrier` names whoever transmitted this particular copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidRecord {
    pub parcel_id: String,
    pub value: f64,
    /// Remaining rebroadcast lifetime; one unit is spent per transmission.
    pub ttl: i32,
    pub tiebreaker: u64,
    /// Where the parcel was when the bid was made: its live location if
    /// unclaimed, its destination if the bidder already holds it.
    pub position: Point,
    pub original_bidder: String,
    pub carrier: String,
}

impl BidRecord {
    pub fn new(
        bidder_id: impl Into<String>,
        parcel_id: impl Into<String>,
        value: f64,
        ttl: i32,
        position: Point,
    ) -> Self {
        let bidder_id = bidder_id.into();
        let parcel_id = parcel_id.into();
        let tiebreaker = tiebreak(&bidder_id, &parcel_id);
        Self {
            parcel_id,
            value,
            ttl,
            tiebreaker,
            position,
            original_bidder: bidder_id.clone(),
            carrier: bidder_id,
        }
    }

    /// A retransmission copy: same bid, new carrier.
    pub fn relayed_by(&self, carrier: &str) -> Self {
        Self {
            carrier: carrier.to_string(),
            ..self.clone()
        }
    }

    fn spent(&self) -> Self {
        Self {
            ttl: self.ttl - 1,
            ..self.clone()
        }
    }

    /// Total order used by the by-value view: value, then tiebreaker, then
    /// parcel id. `total_cmp` keeps NaN values inert instead of panicking.
    fn rank_cmp(&self, other: &BidRecord) -> std::cmp::Ordering {
        self.value
            .total_cmp(&other.value)
            .then(self.tiebreaker.cmp(&other.tiebreaker))
            .then_with(|| self.parcel_id.cmp(&other.parcel_id))
    }
}

/// Bounded-memory auction cache: best known bid per parcel, round-robin
/// broadcast rotation, and a value-ordered view.
#[derive(Debug, Default)]
pub struct BidStore {
    by_task: HashMap<String, BidRecord>,
    rotation: VecDeque<String>,
    by_value: Vec<String>,
}

impl BidStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_task.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_task.is_empty()
    }

    pub fn get(&self, parcel_id: &str) -> Option<&BidRecord> {
        self.by_task.get(parcel_id)
    }

    /// Last recorded position snapshot for a parcel.
    pub fn position_of(&self, parcel_id: &str) -> Option<Point> {
        self.by_task.get(parcel_id).map(|r| r.position)
    }

    /// All parcels with a live record, best value first.
    pub fn parcels_known(&self) -> Vec<String> {
        self.by_value.clone()
    }

    /// Live records whose provenance is `bidder_id`, best value first.
    /// Returns owned snapshots so callers can purge while they scan.
    pub fn records_from(&self, bidder_id: &str) -> Vec<BidRecord> {
        self.by_value
            .iter()
            .filter_map(|id| self.by_task.get(id))
            .filter(|r| r.original_bidder == bidder_id)
            .cloned()
            .collect()
    }

    /// The `k` highest-value records without disturbing the rotation.
    pub fn top_k(&self, k: usize) -> Vec<BidRecord> {
        self.by_value
            .iter()
            .take(k)
            .filter_map(|id| self.by_task.get(id))
            .cloned()
            .collect()
    }

    /// Merge an incoming record under the dominance rules.
    ///
    /// For a parcel already known, the incoming record wins iff it has a
    /// strictly higher value, or an equal value and a higher tiebreaker, or
    /// the same provenance (a self-refresh always beats a stale copy of
    /// itself). A winning replacement keeps the loser's rotation slot, so a
    /// contested parcel cannot leapfrog the broadcast rotation; only a
    /// first-seen parcel joins at the tail.
    pub fn ensconce(&mut self, incoming: BidRecord) {
        match self.by_task.get(&incoming.parcel_id) {
            None => {
                trace!(parcel = %incoming.parcel_id, value = incoming.value, "new bid");
                self.rotation.push_back(incoming.parcel_id.clone());
                self.value_insert(&incoming);
                self.by_task.insert(incoming.parcel_id.clone(), incoming);
            }
            Some(existing) => {
                let dominates = incoming.value > existing.value
                    || (incoming.value == existing.value
                        && incoming.tiebreaker > existing.tiebreaker)
                    || incoming.original_bidder == existing.original_bidder;
                if dominates {
                    trace!(
                        parcel = %incoming.parcel_id,
                        old = existing.value,
                        new = incoming.value,
                        "bid replaced"
                    );
                    self.value_remove(&incoming.parcel_id);
                    self.value_insert(&incoming);
                    self.by_task.insert(incoming.parcel_id.clone(), incoming);
                }
            }
        }
    }

    /// Select the next record to broadcast, or `None` if the store is empty.
    ///
    /// Pops the rotation head; an already-expired record (negative TTL) is
    /// purged and the next head tried. Otherwise the stored record is
    /// replaced by a copy with one TTL unit spent, re-queued at the tail,
    /// and a carrier-updated copy of that spent record is returned. A record
    /// inserted with TTL = n is therefore transmitted at most n + 1 times
    /// and removed by the first selection after its TTL drops below zero.
    pub fn yoink(&mut self, carrier: &str) -> Option<BidRecord> {
        while let Some(id) = self.rotation.pop_front() {
            let Some(record) = self.by_task.get(&id) else {
                continue;
            };
            if record.ttl < 0 {
                debug!(parcel = %id, "bid expired, purging");
                self.value_remove(&id);
                self.by_task.remove(&id);
                continue;
            }
            let spent = record.spent();
            let outbound = spent.relayed_by(carrier);
            self.by_task.insert(id.clone(), spent);
            self.rotation.push_back(id);
            return Some(outbound);
        }
        None
    }

    /// Drop a parcel's record from every view, returning it if present.
    pub fn purge(&mut self, parcel_id: &str) -> Option<BidRecord> {
        let removed = self.by_task.remove(parcel_id)?;
        self.rotation.retain(|id| id != parcel_id);
        self.value_remove(parcel_id);
        Some(removed)
    }

    /// Cross-view consistency check, used by the test suites.
    pub fn check_invariants(&self) {
        assert_eq!(self.rotation.len(), self.by_task.len());
        assert_eq!(self.by_value.len(), self.by_task.len());
        for id in &self.rotation {
            assert!(self.by_task.contains_key(id), "rotation entry {id} missing");
        }
        for pair in self.by_value.windows(2) {
            let a = &self.by_task[&pair[0]];
            let b = &self.by_task[&pair[1]];
            assert_ne!(
                a.rank_cmp(b),
                std::cmp::Ordering::Less,
                "by-value view out of order at {}/{}",
                pair[0],
                pair[1]
            );
        }
    }

    fn value_insert(&mut self, record: &BidRecord) {
        let idx = self
            .by_value
            .partition_point(|id| self.by_task[id].rank_cmp(record).is_gt());
        self.by_value.insert(idx, record.parcel_id.clone());
    }

    fn value_remove(&mut self, parcel_id: &str) {
        if let Some(idx) = self.by_value.iter().position(|id| id == parcel_id) {
            self.by_value.remove(idx);
        }
    }
}
