//! Plane-world simulation and tick driver.
//!
//! A simulation-friendly stand-in for the real road network and radio: a
//! square plane with straight-line travel, the parcel lifecycle state
//! machine, and a radius-limited broadcast that drops each hop with
//! configurable probability. The protocol under test never touches any of
//! this directly; it sees the world only through [`WorldView`] and acts only
//! through [`Action`] requests.
//!
//! Couriers run one decision cycle per tick, sequentially, in registration
//! order. Broadcasts emitted during a cycle reach in-range peers before the
//! next courier runs; nothing here is concurrent.

use crate::agent::{Action, Courier, CycleOutput, Envelope, GreedyCourier};
use crate::bid::mix_seed;
use crate::eval::EvalCollector;
use haulier_core::{Parcel, ParcelState, Point, WorldView, HOUR_MS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub width_km: f64,
    pub height_km: f64,
    pub depot: Point,
    pub tick_ms: i64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width_km: 10.0,
            height_km: 10.0,
            depot: Point::new(5.0, 5.0),
            tick_ms: 1_000,
        }
    }
}

/// Something observable happened to a parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    PickedUp {
        parcel_id: String,
        at_ms: i64,
        tardiness_ms: i64,
    },
    Delivered {
        parcel_id: String,
        at_ms: i64,
        tardiness_ms: i64,
    },
}

#[derive(Debug, Clone)]
struct SimParcel {
    parcel: Parcel,
    state: ParcelState,
    position: Point,
}

#[derive(Debug, Clone)]
struct Body {
    position: Point,
    speed_kmh: f64,
    cargo: Vec<String>,
}

/// The world model: parcels, courier bodies, time.
#[derive(Debug)]
pub struct PlaneWorld {
    cfg: SimConfig,
    now_ms: i64,
    parcels: BTreeMap<String, SimParcel>,
    pending: Vec<(i64, Parcel)>,
    couriers: BTreeMap<String, Body>,
}

impl PlaneWorld {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            now_ms: 0,
            parcels: BTreeMap::new(),
            pending: Vec::new(),
            couriers: BTreeMap::new(),
        }
    }

    pub fn tick_ms(&self) -> i64 {
        self.cfg.tick_ms
    }

    /// Announce a parcel right now.
    pub fn add_parcel(&mut self, parcel: Parcel) {
        let state = if parcel.pickup_window.is_before_start(self.now_ms) {
            ParcelState::Announced
        } else {
            ParcelState::Available
        };
        let position = parcel.origin;
        self.parcels.insert(
            parcel.id.clone(),
            SimParcel {
                parcel,
                state,
                position,
            },
        );
    }

    /// Announce a parcel once the clock reaches `announce_at_ms`.
    pub fn schedule_parcel(&mut self, parcel: Parcel, announce_at_ms: i64) {
        if announce_at_ms <= self.now_ms {
            self.add_parcel(parcel);
        } else {
            self.pending.push((announce_at_ms, parcel));
        }
    }

    pub fn add_courier(&mut self, id: &str, position: Point, speed_kmh: f64) {
        self.couriers.insert(
            id.to_string(),
            Body {
                position,
                speed_kmh,
                cargo: Vec::new(),
            },
        );
    }

    /// Place a parcel straight into a courier's cargo. Scenario setup only;
    /// the regular path goes through a [`Action::Pursue`] pickup.
    pub fn load_parcel(&mut self, courier_id: &str, parcel_id: &str) {
        let Some(sim) = self.parcels.get_mut(parcel_id) else {
            return;
        };
        let Some(body) = self.couriers.get_mut(courier_id) else {
            return;
        };
        if sim.state.on_road() {
            sim.state = ParcelState::InCargo;
            body.cargo.push(parcel_id.to_string());
        }
    }

    /// Advance the clock: release scheduled parcels and open pickup windows.
    pub fn advance(&mut self, dt_ms: i64) {
        self.now_ms += dt_ms;
        let now = self.now_ms;
        let mut due = Vec::new();
        self.pending.retain(|(at, parcel)| {
            if *at <= now {
                due.push(parcel.clone());
                false
            } else {
                true
            }
        });
        for parcel in due {
            debug!(parcel = %parcel.id, "announced");
            self.add_parcel(parcel);
        }
        for sim in self.parcels.values_mut() {
            if sim.state == ParcelState::Announced && !sim.parcel.pickup_window.is_before_start(now)
            {
                sim.state = ParcelState::Available;
            }
        }
    }

    /// Execute one courier's action for this tick.
    pub fn apply(&mut self, courier_id: &str, action: &Action, dt_ms: i64) -> Vec<SimEvent> {
        match action {
            Action::Idle => Vec::new(),
            Action::Wander(target) => {
                self.move_courier(courier_id, *target, dt_ms);
                Vec::new()
            }
            Action::ReturnToDepot => {
                let depot = self.cfg.depot;
                self.move_courier(courier_id, depot, dt_ms);
                Vec::new()
            }
            Action::Pursue(parcel_id) => self.pursue(courier_id, parcel_id, dt_ms),
        }
    }

    fn pursue(&mut self, courier_id: &str, parcel_id: &str, dt_ms: i64) -> Vec<SimEvent> {
        let carried = self
            .couriers
            .get(courier_id)
            .is_some_and(|b| b.cargo.iter().any(|p| p == parcel_id));

        if carried {
            let Some(destination) = self.parcels.get(parcel_id).map(|s| s.parcel.destination)
            else {
                return Vec::new();
            };
            let arrived = self.move_courier(courier_id, destination, dt_ms);
            if !arrived {
                return Vec::new();
            }
            let now = self.now_ms;
            let Some(sim) = self.parcels.get_mut(parcel_id) else {
                return Vec::new();
            };
            // Tardy deliveries are accepted; early ones must wait for the
            // window to open.
            if sim.parcel.delivery_window.is_before_start(now) {
                return Vec::new();
            }
            sim.state = ParcelState::Delivered;
            sim.position = destination;
            if let Some(body) = self.couriers.get_mut(courier_id) {
                body.cargo.retain(|p| p != parcel_id);
            }
            let tardiness = (now - sim.parcel.delivery_window.end).max(0);
            info!(parcel = %parcel_id, courier = %courier_id, tardiness, "delivered");
            vec![SimEvent::Delivered {
                parcel_id: parcel_id.to_string(),
                at_ms: now,
                tardiness_ms: tardiness,
            }]
        } else {
            let Some(target) = self
                .parcels
                .get(parcel_id)
                .filter(|s| s.state.on_road())
                .map(|s| s.position)
            else {
                // Gone already; the courier will notice next cycle.
                return Vec::new();
            };
            let arrived = self.move_courier(courier_id, target, dt_ms);
            if !arrived {
                return Vec::new();
            }
            let now = self.now_ms;
            let Some(sim) = self.parcels.get_mut(parcel_id) else {
                return Vec::new();
            };
            if sim.state != ParcelState::Available {
                return Vec::new();
            }
            sim.state = ParcelState::InCargo;
            if let Some(body) = self.couriers.get_mut(courier_id) {
                body.cargo.push(parcel_id.to_string());
            }
            let tardiness = (now - sim.parcel.pickup_window.end).max(0);
            info!(parcel = %parcel_id, courier = %courier_id, tardiness, "picked up");
            vec![SimEvent::PickedUp {
                parcel_id: parcel_id.to_string(),
                at_ms: now,
                tardiness_ms: tardiness,
            }]
        }
    }

    /// Move toward `target`, clamped by speed and tick length. Returns true
    /// when the courier ends the move exactly on the target.
    fn move_courier(&mut self, courier_id: &str, target: Point, dt_ms: i64) -> bool {
        let Some(body) = self.couriers.get_mut(courier_id) else {
            return false;
        };
        let step_km = body.speed_kmh * dt_ms as f64 / HOUR_MS;
        let distance = body.position.distance(target);
        if distance <= step_km {
            body.position = target;
            true
        } else {
            let direction = (target - body.position).normalized();
            body.position = body.position + direction * step_km;
            false
        }
    }
}

impl WorldView for PlaneWorld {
    fn now_ms(&self) -> i64 {
        self.now_ms
    }

    fn parcel(&self, id: &str) -> Option<&Parcel> {
        self.parcels.get(id).map(|s| &s.parcel)
    }

    fn parcel_state(&self, id: &str) -> Option<ParcelState> {
        self.parcels.get(id).map(|s| s.state)
    }

    fn parcel_position(&self, id: &str) -> Option<Point> {
        self.parcels
            .get(id)
            .filter(|s| s.state.on_road())
            .map(|s| s.position)
    }

    fn visible_parcels(&self, center: Point, radius: f64) -> Vec<String> {
        self.parcels
            .iter()
            .filter(|(_, s)| s.state.on_road() && center.distance(s.position) <= radius)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn visible_couriers(&self, center: Point, radius: f64, exclude: &str) -> Vec<Point> {
        self.couriers
            .iter()
            .filter(|(id, body)| {
                id.as_str() != exclude && center.distance(body.position) <= radius
            })
            .map(|(_, body)| body.position)
            .collect()
    }

    fn nearest_parcels(&self, center: Point, k: usize) -> Vec<String> {
        let mut on_road: Vec<(&String, f64)> = self
            .parcels
            .iter()
            .filter(|(_, s)| s.state.on_road())
            .map(|(id, s)| (id, center.distance(s.position)))
            .collect();
        on_road.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        on_road.into_iter().take(k).map(|(id, _)| id.clone()).collect()
    }

    fn courier_position(&self, id: &str) -> Option<Point> {
        self.couriers.get(id).map(|b| b.position)
    }

    fn cargo_of(&self, courier_id: &str) -> Vec<String> {
        self.couriers
            .get(courier_id)
            .map(|b| b.cargo.clone())
            .unwrap_or_default()
    }

    fn unserved_remain(&self) -> bool {
        !self.pending.is_empty()
            || self
                .parcels
                .values()
                .any(|s| s.state != ParcelState::Delivered)
    }

    fn bounds(&self) -> (Point, Point) {
        (
            Point::new(0.0, 0.0),
            Point::new(self.cfg.width_km, self.cfg.height_km),
        )
    }
}

/// A registered participant: protocol courier or greedy baseline.
#[derive(Debug)]
pub enum SimAgent {
    Smart(Courier),
    Greedy(GreedyCourier),
}

impl SimAgent {
    pub fn id(&self) -> &str {
        match self {
            SimAgent::Smart(c) => &c.id,
            SimAgent::Greedy(g) => &g.id,
        }
    }
}

/// Discrete-tick driver: runs every agent once per tick in registration
/// order and ferries broadcasts between in-range couriers.
pub struct Simulation {
    pub world: PlaneWorld,
    pub metrics: EvalCollector,
    agents: Vec<SimAgent>,
    rng: StdRng,
    seed: u64,
    ticks_run: u64,
}

impl Simulation {
    pub fn new(world: PlaneWorld, seed: u64) -> Self {
        Self {
            world,
            metrics: EvalCollector::default(),
            agents: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            ticks_run: 0,
        }
    }

    pub fn add_smart(&mut self, courier: Courier, position: Point) {
        self.world
            .add_courier(&courier.id, position, courier.speed_kmh);
        self.agents.push(SimAgent::Smart(courier));
    }

    pub fn add_greedy(&mut self, courier: GreedyCourier, position: Point) {
        self.world
            .add_courier(&courier.id, position, courier.speed_kmh);
        self.agents.push(SimAgent::Greedy(courier));
    }

    pub fn agents(&self) -> &[SimAgent] {
        &self.agents
    }

    pub fn smart(&self, id: &str) -> Option<&Courier> {
        self.agents.iter().find_map(|a| match a {
            SimAgent::Smart(c) if c.id == id => Some(c),
            _ => None,
        })
    }

    pub fn tick(&mut self) {
        let dt = self.world.tick_ms();
        for i in 0..self.agents.len() {
            let (id, radius, reliability, out) = match &mut self.agents[i] {
                SimAgent::Smart(courier) => {
                    let seed = mix_seed(self.seed, self.world.now_ms() as u64, i as u64);
                    let out = courier.tick(&self.world, dt, seed);
                    (
                        courier.id.clone(),
                        courier.comm_radius,
                        courier.comm_reliability,
                        out,
                    )
                }
                SimAgent::Greedy(courier) => {
                    let action = courier.tick(&self.world, dt);
                    (
                        courier.id.clone(),
                        0.0,
                        0.0,
                        CycleOutput {
                            broadcast: None,
                            action,
                        },
                    )
                }
            };
            for event in self.world.apply(&id, &out.action, dt) {
                self.metrics.record_event(&event);
            }
            if let Some(record) = out.broadcast {
                self.deliver_broadcast(i, &id, radius, reliability, record);
            }
        }
        self.record_divergence();
        self.world.advance(dt);
        self.ticks_run += 1;
    }

    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    pub fn ticks_run(&self) -> u64 {
        self.ticks_run
    }

    /// Copy one broadcast to every in-range protocol peer, with each hop
    /// surviving at the product of the two endpoints' reliabilities.
    fn deliver_broadcast(
        &mut self,
        sender_idx: usize,
        sender_id: &str,
        radius: f64,
        sender_reliability: f64,
        record: crate::bid::BidRecord,
    ) {
        let Some(sender_position) = self.world.courier_position(sender_id) else {
            return;
        };
        self.metrics.record_publish();
        for j in 0..self.agents.len() {
            if j == sender_idx {
                continue;
            }
            let SimAgent::Smart(peer) = &mut self.agents[j] else {
                continue;
            };
            let Some(peer_position) = self.world.courier_position(&peer.id) else {
                continue;
            };
            if sender_position.distance(peer_position) > radius {
                continue;
            }
            let p = sender_reliability * peer.comm_reliability;
            if self.rng.random::<f64>() < p {
                peer.receive(&Envelope::Bid(record.clone()));
                self.metrics.record_hop_delivered();
            } else {
                self.metrics.record_hop_dropped();
            }
        }
    }

    /// Cache divergence across protocol couriers: how many (courier, parcel)
    /// pairs are missing relative to the union of everything known.
    fn record_divergence(&mut self) {
        let mut union = BTreeSet::new();
        let mut known = Vec::new();
        for agent in &self.agents {
            if let SimAgent::Smart(courier) = agent {
                let parcels = courier.bids().parcels_known();
                known.push(parcels.len());
                union.extend(parcels);
            }
        }
        let divergence = union.len() * known.len() - known.iter().sum::<usize>();
        self.metrics.snapshot(self.world.now_ms(), divergence);
    }
}
