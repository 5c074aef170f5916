pub mod geo;
pub mod parcel;

// Re-export common types
pub use geo::{travel_time_ms, Point, HOUR_MS};
pub use parcel::{Parcel, ParcelState, TimeWindow};

/// Read-only boundary to the world model.
///
/// Everything the allocation protocol is allowed to observe each cycle goes
/// through this trait: positions, visibility, parcel lifecycle, cargo, and
/// travel geometry. The protocol never mutates the world directly; it emits
/// action requests and lets the world model execute them.
pub trait WorldView {
    /// Current simulation time in milliseconds.
    fn now_ms(&self) -> i64;

    /// Static parcel data (locations and time windows).
    fn parcel(&self, id: &str) -> Option<&Parcel>;

    fn parcel_state(&self, id: &str) -> Option<ParcelState>;

    /// Live position of a parcel still on the road; `None` once it has been
    /// picked up or delivered.
    fn parcel_position(&self, id: &str) -> Option<Point>;

    /// On-road parcels within `radius` of `center`, in a stable order.
    fn visible_parcels(&self, center: Point, radius: f64) -> Vec<String>;

    /// Positions of other couriers within `radius` of `center`.
    fn visible_couriers(&self, center: Point, radius: f64, exclude: &str) -> Vec<Point>;

    /// The `k` on-road parcels closest to `center`, nearest first.
    fn nearest_parcels(&self, center: Point, k: usize) -> Vec<String>;

    fn courier_position(&self, id: &str) -> Option<Point>;

    /// Parcels currently held by the given courier.
    fn cargo_of(&self, courier_id: &str) -> Vec<String>;

    /// True while any parcel is still waiting to be delivered.
    fn unserved_remain(&self) -> bool;

    /// Axis-aligned world bounds as (min corner, max corner).
    fn bounds(&self) -> (Point, Point);
}
