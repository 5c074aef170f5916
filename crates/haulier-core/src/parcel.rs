use crate::geo::Point;
use serde::{Deserialize, Serialize};

/// Half-open time interval `[begin, end)` in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub begin: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(begin: i64, end: i64) -> Self {
        Self { begin, end }
    }

    pub fn contains(&self, t: i64) -> bool {
        self.begin <= t && t < self.end
    }

    pub fn is_before_start(&self, t: i64) -> bool {
        t < self.begin
    }

    pub fn is_after_end(&self, t: i64) -> bool {
        t >= self.end
    }
}

/// Parcel lifecycle, owned by the world model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParcelState {
    Announced,
    Available,
    InCargo,
    Delivered,
}

impl ParcelState {
    /// Announced or available: the parcel is still physically on the road
    /// and perceivable by couriers.
    pub fn on_road(&self) -> bool {
        matches!(self, ParcelState::Announced | ParcelState::Available)
    }
}

/// A pickup-and-delivery task with time windows on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: String,
    pub origin: Point,
    pub destination: Point,
    pub pickup_window: TimeWindow,
    pub delivery_window: TimeWindow,
}

impl Parcel {
    pub fn new(
        id: impl Into<String>,
        origin: Point,
        destination: Point,
        pickup_window: TimeWindow,
        delivery_window: TimeWindow,
    ) -> Self {
        Self {
            id: id.into(),
            origin,
            destination,
            pickup_window,
            delivery_window,
        }
    }
}
