//! Valuation policies: how attractive is a parcel from where I stand?
//!
//! A valuation is a pure function of the observer's state and the parcel;
//! it must never produce NaN or an unbounded float. The closed set of
//! implementations is [`TrivialValue`] (protocol-mechanics baseline) and
//! [`SimpleValue`] (time-window urgency weighted by cargo load).

use crate::bid::BidStore;
use haulier_core::{travel_time_ms, Point, WorldView};

/// Ceiling for any valuation: 2^53, the largest power of two whose integer
/// neighbourhood f64 represents exactly, so ratios against it stay clear of
/// rounding artifacts.
pub const MAX_VALUE: f64 = 9_007_199_254_740_992.0;

/// The observing courier's state for one valuation call.
#[derive(Debug, Clone, Copy)]
pub struct Observer<'a> {
    pub courier_id: &'a str,
    pub position: Point,
    pub cargo: &'a [String],
    pub speed_kmh: f64,
    pub now_ms: i64,
}

impl Observer<'_> {
    pub fn carries(&self, parcel_id: &str) -> bool {
        self.cargo.iter().any(|p| p == parcel_id)
    }
}

pub trait ValuePolicy: Send + Sync + std::fmt::Debug {
    fn value(
        &self,
        world: &dyn WorldView,
        bids: &BidStore,
        obs: &Observer<'_>,
        parcel_id: &str,
    ) -> f64;
}

/// Values every parcel the same. Useful for exercising the propagation
/// machinery with strategy quality taken out of the picture.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrivialValue;

impl ValuePolicy for TrivialValue {
    fn value(&self, _: &dyn WorldView, _: &BidStore, _: &Observer<'_>, _: &str) -> f64 {
        10.0
    }
}

/// `MAX_VALUE / (cargo-excluding-parcel x |window start - predicted arrival|)`.
///
/// Distance runs to the parcel's destination when carried, otherwise to its
/// last-known pickup position: the bid store's snapshot when one exists,
/// the live position as fallback. A zero denominator (arrival dead on the
/// window start, or an otherwise empty cargo) returns exactly `MAX_VALUE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleValue;

impl ValuePolicy for SimpleValue {
    fn value(
        &self,
        world: &dyn WorldView,
        bids: &BidStore,
        obs: &Observer<'_>,
        parcel_id: &str,
    ) -> f64 {
        let Some(parcel) = world.parcel(parcel_id) else {
            return 0.0;
        };
        let in_cargo = obs.carries(parcel_id);
        let other_cargo = obs.cargo.len() - usize::from(in_cargo);

        let target = if in_cargo {
            parcel.destination
        } else {
            bids.position_of(parcel_id)
                .or_else(|| world.parcel_position(parcel_id))
                .unwrap_or(parcel.origin)
        };
        let arrival = obs.now_ms as f64 + travel_time_ms(obs.position, target, obs.speed_kmh);
        let window_start = if in_cargo {
            parcel.delivery_window.begin
        } else {
            parcel.pickup_window.begin
        } as f64;
        let deviation = (window_start - arrival).abs();

        // Both factors checked separately: an empty cargo with an infinite
        // deviation would otherwise multiply into NaN.
        if other_cargo == 0 || deviation == 0.0 {
            return MAX_VALUE;
        }
        (MAX_VALUE / (other_cargo as f64 * deviation)).min(MAX_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bid::BidRecord;
    use crate::world::{PlaneWorld, SimConfig};
    use haulier_core::{Parcel, TimeWindow};

    fn world_with_parcel(origin: Point, begin: i64) -> PlaneWorld {
        let mut world = PlaneWorld::new(SimConfig::default());
        world.add_parcel(Parcel::new(
            "p",
            origin,
            Point::new(9.0, 0.0),
            TimeWindow::new(begin, begin + 60_000),
            TimeWindow::new(begin + 60_000, begin + 120_000),
        ));
        world
    }

    fn observer<'a>(cargo: &'a [String]) -> Observer<'a> {
        Observer {
            courier_id: "veh-1",
            position: Point::new(0.0, 0.0),
            cargo,
            speed_kmh: 60.0,
            now_ms: 0,
        }
    }

    #[test]
    fn test_trivial_is_constant() {
        let world = world_with_parcel(Point::new(1.0, 0.0), 0);
        let bids = BidStore::new();
        let cargo = vec![];
        let obs = observer(&cargo);
        assert_eq!(TrivialValue.value(&world, &bids, &obs, "p"), 10.0);
        assert_eq!(TrivialValue.value(&world, &bids, &obs, "missing"), 10.0);
    }

    #[test]
    fn test_zero_deviation_returns_max_not_nan() {
        // 1 km at 60 km/h = 60_000 ms; window starts exactly then.
        let world = world_with_parcel(Point::new(1.0, 0.0), 60_000);
        let bids = BidStore::new();
        let cargo = vec!["other".to_string()];
        let obs = observer(&cargo);
        let v = SimpleValue.value(&world, &bids, &obs, "p");
        assert_eq!(v, MAX_VALUE);
    }

    #[test]
    fn test_empty_cargo_also_hits_the_ceiling() {
        let world = world_with_parcel(Point::new(1.0, 0.0), 0);
        let bids = BidStore::new();
        let cargo = vec![];
        let obs = observer(&cargo);
        assert_eq!(SimpleValue.value(&world, &bids, &obs, "p"), MAX_VALUE);
    }

    #[test]
    fn test_sooner_reachable_window_is_worth_more() {
        let world = world_with_parcel(Point::new(1.0, 0.0), 60_000);
        let far = world_with_parcel(Point::new(30.0, 0.0), 60_000);
        let bids = BidStore::new();
        let cargo = vec!["other".to_string()];
        let obs = observer(&cargo);
        let near_value = SimpleValue.value(&world, &bids, &obs, "p");
        let far_value = SimpleValue.value(&far, &bids, &obs, "p");
        assert!(near_value > far_value);
    }

    #[test]
    fn test_store_snapshot_preferred_over_live_position() {
        let world = world_with_parcel(Point::new(1.0, 0.0), 0);
        let cargo = vec!["other".to_string()];
        let obs = observer(&cargo);

        let live = SimpleValue.value(&world, &BidStore::new(), &obs, "p");

        // A snapshot much farther away must change the estimate.
        let mut bids = BidStore::new();
        bids.ensconce(BidRecord::new("veh-2", "p", 1.0, 3, Point::new(25.0, 0.0)));
        let snapped = SimpleValue.value(&world, &bids, &obs, "p");
        assert_ne!(live, snapped);
    }
}
