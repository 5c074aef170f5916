//! Commitment selectors: which parcel does this courier pursue right now?
//!
//! Both policies run once per decision cycle against the courier's own bid
//! store and may purge records they discover to be stale. The closed set:
//!
//! - [`EarlySelect`]: myopic, chases the soonest-closing window it has
//!   personally bid on.
//! - [`BestFutureSelect`]: scores a handful of candidate commitments by how
//!   well the courier could still serve a sampled set of its other bids
//!   afterwards, with hysteresis so near-equal options do not cause
//!   flip-flopping, and an abandonment guard against arriving absurdly
//!   early and idling at a closed window.

use crate::bid::{BidRecord, BidStore};
use crate::value::{Observer, ValuePolicy};
use haulier_core::{travel_time_ms, Point, WorldView};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

/// Per-cycle inputs shared by every selector.
pub struct SelectCx<'a> {
    pub world: &'a dyn WorldView,
    pub obs: Observer<'a>,
    pub value: &'a dyn ValuePolicy,
    /// The commitment carried over from the previous cycle, if any.
    pub curr: Option<&'a str>,
    /// Cycle-scoped seed for reproducible sampling.
    pub seed: u64,
}

pub trait SelectPolicy: Send + Sync + std::fmt::Debug {
    /// Returns the parcel to pursue this cycle, or `None` to stand down.
    fn select(&mut self, cx: &SelectCx<'_>, bids: &mut BidStore) -> Option<String>;
}

/// Shared last-resort fallback: the carried parcel whose delivery window
/// opens soonest.
fn soonest_delivery_in_cargo(cx: &SelectCx<'_>) -> Option<String> {
    let mut chosen = None;
    let mut soonest = i64::MAX;
    for parcel_id in cx.obs.cargo {
        if let Some(parcel) = cx.world.parcel(parcel_id) {
            if parcel.delivery_window.begin < soonest {
                soonest = parcel.delivery_window.begin;
                chosen = Some(parcel_id.clone());
            }
        }
    }
    chosen
}

/// Myopic selector: serve whatever closes first.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarlySelect;

impl SelectPolicy for EarlySelect {
    fn select(&mut self, cx: &SelectCx<'_>, bids: &mut BidStore) -> Option<String> {
        let mine = bids.records_from(cx.obs.courier_id);

        // Records for parcels that left the road without entering our cargo
        // were taken by someone else; drop them before choosing.
        for record in &mine {
            let in_cargo = cx.obs.carries(&record.parcel_id);
            let on_road = cx
                .world
                .parcel_state(&record.parcel_id)
                .is_some_and(|s| s.on_road());
            if !in_cargo && !on_road {
                debug!(parcel = %record.parcel_id, "own bid is stale, purging");
                bids.purge(&record.parcel_id);
            }
        }

        let mut chosen = None;
        let mut soonest_end = i64::MAX;
        for record in &mine {
            if !cx.obs.carries(&record.parcel_id) {
                continue;
            }
            if let Some(parcel) = cx.world.parcel(&record.parcel_id) {
                if parcel.delivery_window.end < soonest_end {
                    soonest_end = parcel.delivery_window.end;
                    chosen = Some(record.parcel_id.clone());
                }
            }
        }

        if chosen.is_none() {
            for record in &mine {
                if cx.obs.carries(&record.parcel_id) || bids.get(&record.parcel_id).is_none() {
                    continue;
                }
                if let Some(parcel) = cx.world.parcel(&record.parcel_id) {
                    if parcel.pickup_window.end < soonest_end {
                        soonest_end = parcel.pickup_window.end;
                        chosen = Some(record.parcel_id.clone());
                    }
                }
            }
        }

        chosen.or_else(|| soonest_delivery_in_cargo(cx))
    }
}

/// A commitment under evaluation: where serving it would leave the courier.
#[derive(Debug, Clone)]
struct Candidate {
    parcel_id: String,
    value: f64,
    position: Point,
}

/// Lookahead selector with hysteresis.
#[derive(Debug, Clone)]
pub struct BestFutureSelect {
    pub nr_considered_futures: usize,
    pub nr_future_backers: usize,
    /// Ratio a challenger must beat before the courier changes its mind.
    pub inertial_threshold: f64,
    /// Fraction of the travel time the courier tolerates waiting at a
    /// not-yet-open window.
    pub punctuality: f64,
    current_future_value: f64,
}

impl Default for BestFutureSelect {
    fn default() -> Self {
        Self {
            nr_considered_futures: 10,
            nr_future_backers: 42,
            inertial_threshold: 1.1,
            punctuality: 0.1,
            current_future_value: f64::MIN_POSITIVE,
        }
    }
}

impl BestFutureSelect {
    pub fn new(
        nr_considered_futures: usize,
        nr_future_backers: usize,
        inertial_threshold: f64,
        punctuality: f64,
    ) -> Self {
        Self {
            nr_considered_futures,
            nr_future_backers,
            inertial_threshold,
            punctuality,
            current_future_value: f64::MIN_POSITIVE,
        }
    }

    /// Sum of backer valuations from the hypothetical state reached by
    /// committing to `candidate`.
    fn future_value(
        &self,
        cx: &SelectCx<'_>,
        bids: &BidStore,
        backers: &[BidRecord],
        candidate: &Candidate,
    ) -> f64 {
        let carried = cx.obs.carries(&candidate.parcel_id);
        let (future_position, future_cargo): (Point, Vec<String>) = if carried {
            let destination = cx
                .world
                .parcel(&candidate.parcel_id)
                .map(|p| p.destination)
                .unwrap_or(candidate.position);
            (destination, cx.obs.cargo.to_vec())
        } else {
            let mut cargo = cx.obs.cargo.to_vec();
            cargo.push(candidate.parcel_id.clone());
            (candidate.position, cargo)
        };
        let hypothetical = Observer {
            position: future_position,
            cargo: &future_cargo,
            ..cx.obs
        };
        backers
            .iter()
            .map(|b| cx.value.value(cx.world, bids, &hypothetical, &b.parcel_id))
            .sum()
    }

    /// True when even a tolerance-stretched arrival would still land before
    /// the relevant window opens.
    fn hopelessly_early(&self, cx: &SelectCx<'_>, bids: &BidStore, parcel_id: &str) -> bool {
        let Some(parcel) = cx.world.parcel(parcel_id) else {
            return false;
        };
        let (target, window) = if cx.obs.carries(parcel_id) {
            (parcel.destination, parcel.delivery_window)
        } else {
            let position = bids
                .position_of(parcel_id)
                .or_else(|| cx.world.parcel_position(parcel_id))
                .unwrap_or(parcel.origin);
            (position, parcel.pickup_window)
        };
        let travel = travel_time_ms(cx.obs.position, target, cx.obs.speed_kmh);
        let latest_tolerable = cx.obs.now_ms as f64 + (1.0 + self.punctuality) * travel;
        window.is_before_start(latest_tolerable.round() as i64)
    }
}

impl SelectPolicy for BestFutureSelect {
    fn select(&mut self, cx: &SelectCx<'_>, bids: &mut BidStore) -> Option<String> {
        let mine = bids.records_from(cx.obs.courier_id);

        // Fixed backer sample: a shuffled slice of our own bids stands in
        // for the routing obligations any commitment must coexist with.
        let mut backers = mine.clone();
        let mut rng = StdRng::seed_from_u64(cx.seed);
        backers.shuffle(&mut rng);
        backers.truncate(self.nr_future_backers);

        let mut candidates: Vec<Candidate> = bids
            .top_k(self.nr_considered_futures)
            .into_iter()
            .map(|r| Candidate {
                parcel_id: r.parcel_id,
                value: r.value,
                position: r.position,
            })
            .collect();

        // Carried parcels have no live record any more, but committed work
        // must stay in the running: admit any that out-value the weakest
        // candidate.
        let weakest = candidates.last().map(|c| c.value);
        for parcel_id in cx.obs.cargo {
            let value = cx.value.value(cx.world, bids, &cx.obs, parcel_id);
            if weakest.is_none_or(|w| value > w) {
                candidates.push(Candidate {
                    parcel_id: parcel_id.clone(),
                    value,
                    position: cx.obs.position,
                });
            }
        }

        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in &candidates {
            let cumulative = self.future_value(cx, bids, &backers, candidate);
            if best.is_none_or(|(_, b)| cumulative > b) {
                best = Some((candidate, cumulative));
            }
        }

        // Fresh baseline for the standing commitment, from the same backer
        // sample, so the hysteresis ratio compares like with like.
        let mut chosen = None;
        if let Some(curr) = cx.curr {
            if let Some(record) = mine.iter().find(|r| r.parcel_id == curr) {
                let as_candidate = Candidate {
                    parcel_id: curr.to_string(),
                    value: record.value,
                    position: record.position,
                };
                self.current_future_value = self.future_value(cx, bids, &backers, &as_candidate);
                chosen = Some(curr.to_string());
            }
        }

        if let Some((candidate, cumulative)) = best {
            if cx.curr.is_none() || cumulative / self.current_future_value > self.inertial_threshold
            {
                self.current_future_value = cumulative;
                chosen = Some(candidate.parcel_id.clone());
            }
        }

        if chosen.is_none() && cx.obs.cargo.is_empty() {
            chosen = candidates
                .iter()
                .max_by(|a, b| a.value.total_cmp(&b.value))
                .map(|c| c.parcel_id.clone());
        }
        if chosen.is_none() {
            chosen = soonest_delivery_in_cargo(cx);
        }

        if let Some(parcel_id) = &chosen {
            if self.hopelessly_early(cx, bids, parcel_id) {
                debug!(parcel = %parcel_id, "arrival would be far ahead of the window, standing down");
                return None;
            }
        }
        chosen
    }
}
