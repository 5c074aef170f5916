//! Courier agents: the per-tick orchestration loop.
//!
//! A [`Courier`] runs the full protocol cycle (vanish detection, valuation,
//! one outbound broadcast, commitment selection, action) against a
//! [`WorldView`] it never mutates. All movement, pickup and delivery is
//! requested through an [`Action`] and executed by the world model.
//!
//! [`GreedyCourier`] is the non-communicating baseline: closest parcel wins,
//! no store, no gossip.

use crate::bid::{BidRecord, BidStore};
use crate::config::ProtocolConfig;
use crate::select::{SelectCx, SelectPolicy};
use crate::value::{Observer, ValuePolicy};
use haulier_core::{Point, WorldView};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;
use tracing::{debug, trace};

/// Request issued to the world model at the end of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Travel toward the parcel (or its destination when carried) and pick
    /// up / deliver on arrival.
    Pursue(String),
    /// Travel toward a free-roaming waypoint.
    Wander(Point),
    ReturnToDepot,
    Idle,
}

/// Everything a courier can hear over the air. Foreign kinds are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Envelope {
    Bid(BidRecord),
    Beacon { courier_id: String, position: Point },
}

/// Result of one decision cycle.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub broadcast: Option<BidRecord>,
    pub action: Action,
}

impl CycleOutput {
    fn idle() -> Self {
        Self {
            broadcast: None,
            action: Action::Idle,
        }
    }
}

/// Rolling memory of parcels confirmed or inferred gone. Blocks a stale
/// gossip copy from resurrecting a purged record until the horizon passes.
#[derive(Debug, Default)]
struct VanishedLog {
    noted_at: HashMap<String, i64>,
}

impl VanishedLog {
    fn note(&mut self, parcel_id: &str, now_ms: i64) {
        self.noted_at.insert(parcel_id.to_string(), now_ms);
    }

    fn contains(&self, parcel_id: &str) -> bool {
        self.noted_at.contains_key(parcel_id)
    }

    fn expire(&mut self, now_ms: i64, horizon_ms: i64) {
        self.noted_at.retain(|_, t| now_ms - *t <= horizon_ms);
    }
}

/// Peers recently heard from, aged out after a tick horizon.
#[derive(Debug, Default)]
struct ContactLog {
    ages: HashMap<String, u32>,
}

impl ContactLog {
    fn note(&mut self, peer_id: &str) {
        self.ages.insert(peer_id.to_string(), 0);
    }

    fn tick(&mut self, horizon_ticks: u32) {
        for age in self.ages.values_mut() {
            *age += 1;
        }
        self.ages.retain(|_, age| *age <= horizon_ticks);
    }

    fn len(&self) -> usize {
        self.ages.len()
    }
}

/// A protocol-speaking courier.
pub struct Courier {
    pub id: String,
    pub speed_kmh: f64,
    pub comm_radius: f64,
    pub comm_reliability: f64,
    cfg: ProtocolConfig,
    bids: BidStore,
    /// Parcels this courier has personally bid on, with its latest bid.
    own_bids: HashMap<String, BidRecord>,
    vanished: VanishedLog,
    contacts: ContactLog,
    received: u64,
    curr: Option<String>,
    value: Box<dyn ValuePolicy>,
    select: Box<dyn SelectPolicy>,
    heading: f64,
    rng: StdRng,
}

impl std::fmt::Debug for Courier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Courier")
            .field("id", &self.id)
            .field("bids", &self.bids.len())
            .field("curr", &self.curr)
            .finish()
    }
}

impl Courier {
    pub fn new(id: impl Into<String>, speed_kmh: f64, cfg: ProtocolConfig) -> Self {
        let id = id.into();
        let rng = StdRng::seed_from_u64(crate::bid::mix_seed(
            cfg.agent_seed,
            crate::bid::tiebreak(&id, "heading"),
            0,
        ));
        Self {
            speed_kmh,
            comm_radius: cfg.comm_radius,
            comm_reliability: cfg.comm_reliability,
            value: cfg.valuation.build(),
            select: cfg.selector.build(&cfg.lookahead),
            cfg,
            bids: BidStore::new(),
            own_bids: HashMap::new(),
            vanished: VanishedLog::default(),
            contacts: ContactLog::default(),
            received: 0,
            curr: None,
            heading: 0.0,
            rng,
            id,
        }
    }

    pub fn bids(&self) -> &BidStore {
        &self.bids
    }

    pub fn commitment(&self) -> Option<&str> {
        self.curr.as_deref()
    }

    /// The latest bid this courier personally made on a parcel, kept even
    /// after a competitor's bid displaced it from the store.
    pub fn own_bid(&self, parcel_id: &str) -> Option<&BidRecord> {
        self.own_bids.get(parcel_id)
    }

    /// Broadcasts heard since construction, counting ignored ones.
    pub fn received_count(&self) -> u64 {
        self.received
    }

    /// Peers heard from within the contact horizon.
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Merge an incoming broadcast. Anything that is not a bid, or that
    /// refers to a parcel this courier knows to be gone, is dropped.
    pub fn receive(&mut self, envelope: &Envelope) {
        self.received += 1;
        match envelope {
            Envelope::Bid(record) => {
                if self.vanished.contains(&record.parcel_id) {
                    trace!(parcel = %record.parcel_id, "ignoring bid on vanished parcel");
                    return;
                }
                self.contacts.note(&record.carrier);
                self.bids.ensconce(record.clone());
            }
            other => trace!(kind = ?other, "ignoring foreign broadcast"),
        }
    }

    /// One decision cycle. `budget_ms` is the remaining time slice for this
    /// tick; a spent budget is a no-op.
    pub fn tick(&mut self, world: &dyn WorldView, budget_ms: i64, seed: u64) -> CycleOutput {
        if budget_ms <= 0 {
            return CycleOutput::idle();
        }
        let now = world.now_ms();
        let Some(position) = world.courier_position(&self.id) else {
            return CycleOutput::idle();
        };
        let cargo = world.cargo_of(&self.id);

        self.contacts.tick(self.cfg.contact_horizon_ticks);
        self.vanished.expire(now, self.cfg.vanished_horizon_ms);

        let visible = world.visible_parcels(position, self.comm_radius);
        self.detect_vanished(world, now, position, &cargo, &visible);

        // Value everything newly visible and refresh everything known; both
        // merge through the same dominance gate.
        let obs = Observer {
            courier_id: &self.id,
            position,
            cargo: &cargo,
            speed_kmh: self.speed_kmh,
            now_ms: now,
        };
        let mut targets = visible.clone();
        for parcel_id in self.bids.parcels_known() {
            if !targets.contains(&parcel_id) {
                targets.push(parcel_id);
            }
        }
        for parcel_id in targets {
            if self.vanished.contains(&parcel_id) {
                continue;
            }
            let value = self.value.value(world, &self.bids, &obs, &parcel_id);
            let snapshot = self.bid_position(world, &cargo, &parcel_id);
            let record = BidRecord::new(&self.id, &parcel_id, value, self.cfg.bid_ttl, snapshot);
            self.own_bids.insert(parcel_id, record.clone());
            self.bids.ensconce(record);
        }

        let broadcast = self.bids.yoink(&self.id);

        let previous = self.curr.take();
        let cx = SelectCx {
            world,
            obs,
            value: &*self.value,
            curr: previous.as_deref(),
            seed,
        };
        let next = self.select.select(&cx, &mut self.bids);
        self.curr = next.clone();

        let action = match next {
            Some(parcel_id) => Action::Pursue(parcel_id),
            None => self.wander(world, position, &visible),
        };
        CycleOutput { broadcast, action }
    }

    /// A parcel we hold a record for, that is neither in cargo nor visible
    /// although we are close enough to its last known position to see it,
    /// has been taken by someone else. Parcels that just entered our own
    /// cargo leave the auction the same way.
    fn detect_vanished(
        &mut self,
        world: &dyn WorldView,
        now: i64,
        position: Point,
        cargo: &[String],
        visible: &[String],
    ) {
        for parcel_id in self.bids.parcels_known() {
            if cargo.contains(&parcel_id) {
                debug!(parcel = %parcel_id, "picked up, retiring from auction");
                self.retire(&parcel_id, now);
                continue;
            }
            let on_road = world
                .parcel_state(&parcel_id)
                .is_some_and(|s| s.on_road());
            if !on_road {
                debug!(parcel = %parcel_id, "left the road, retiring from auction");
                self.retire(&parcel_id, now);
                continue;
            }
            if visible.contains(&parcel_id) {
                continue;
            }
            // Close enough to its last known position to see it, yet it is
            // not there: someone took it.
            if let Some(last_known) = self.bids.position_of(&parcel_id) {
                if position.distance(last_known) <= self.comm_radius {
                    debug!(parcel = %parcel_id, "vanished from its last known position");
                    self.retire(&parcel_id, now);
                }
            }
        }
    }

    fn retire(&mut self, parcel_id: &str, now: i64) {
        self.vanished.note(parcel_id, now);
        self.bids.purge(parcel_id);
        self.own_bids.remove(parcel_id);
    }

    /// Position a fresh own bid is made against: destination once we hold
    /// the parcel, otherwise the freshest location we can name.
    fn bid_position(&self, world: &dyn WorldView, cargo: &[String], parcel_id: &str) -> Point {
        if cargo.iter().any(|p| p == parcel_id) {
            if let Some(parcel) = world.parcel(parcel_id) {
                return parcel.destination;
            }
        }
        world
            .parcel_position(parcel_id)
            .or_else(|| self.bids.position_of(parcel_id))
            .or_else(|| world.parcel(parcel_id).map(|p| p.origin))
            .unwrap_or(Point::default())
    }

    /// Uncommitted movement: pulled toward visible parcels, pushed away
    /// from visible peers, otherwise a persistent-heading random walk.
    fn wander(&mut self, world: &dyn WorldView, position: Point, visible: &[String]) -> Action {
        if !world.unserved_remain() {
            return Action::ReturnToDepot;
        }
        let step = 0.5 * self.comm_radius;
        let (min, max) = world.bounds();

        let mut pull = Point::default();
        for parcel_id in visible {
            if let Some(p) = world.parcel_position(parcel_id) {
                pull = pull + (p - position);
            }
        }
        for peer in world.visible_couriers(position, self.comm_radius, &self.id) {
            pull = pull - (peer - position);
        }

        if pull.length() > 1e-9 {
            let target = (position + pull.normalized() * step).clamp_to(min, max);
            return Action::Wander(target);
        }

        // Random walk: keep the heading, drift it a little, re-roll when
        // the walk would leave the world.
        self.heading += self.rng.random_range(-0.4..0.4);
        let target = position + Point::new(self.heading.cos(), self.heading.sin()) * step;
        if target.x < min.x || target.x > max.x || target.y < min.y || target.y > max.y {
            self.heading = self.rng.random_range(0.0..TAU);
            return Action::Idle;
        }
        Action::Wander(target)
    }
}

/// Baseline courier: no store, no gossip, nearest parcel wins.
#[derive(Debug)]
pub struct GreedyCourier {
    pub id: String,
    pub speed_kmh: f64,
    curr: Option<String>,
}

impl GreedyCourier {
    pub fn new(id: impl Into<String>, speed_kmh: f64) -> Self {
        Self {
            id: id.into(),
            speed_kmh,
            curr: None,
        }
    }

    pub fn commitment(&self) -> Option<&str> {
        self.curr.as_deref()
    }

    pub fn tick(&mut self, world: &dyn WorldView, budget_ms: i64) -> Action {
        if budget_ms <= 0 {
            return Action::Idle;
        }
        let Some(position) = world.courier_position(&self.id) else {
            return Action::Idle;
        };
        let cargo = world.cargo_of(&self.id);

        if let Some(curr) = &self.curr {
            let in_cargo = cargo.contains(curr);
            let on_road = world.parcel_state(curr).is_some_and(|s| s.on_road());
            if !in_cargo && !on_road {
                self.curr = None;
            }
        }

        if self.curr.is_none() {
            let nearest = world.nearest_parcels(position, 10);
            self.curr = nearest
                .iter()
                .find(|id| world.parcel_state(id.as_str()) == Some(haulier_core::ParcelState::Available))
                .or_else(|| nearest.first())
                .cloned();
        }

        match &self.curr {
            Some(parcel_id) => Action::Pursue(parcel_id.clone()),
            None if !world.unserved_remain() => Action::ReturnToDepot,
            None => Action::Idle,
        }
    }
}
