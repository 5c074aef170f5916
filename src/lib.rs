//! Haulier: decentralized, auction-based parcel allocation for courier
//! swarms.
//!
//! Couriers cooperatively service pickup-and-delivery parcels under time
//! windows with no central coordinator, using only local, unreliable,
//! range-limited broadcast. Key pieces:
//!
//! - **Bid gossip**: each courier values the parcels it can see and relays
//!   the best known bid per parcel, round-robin, with a TTL bounding how
//!   long stale claims circulate.
//! - **Dominance**: competing bids for one parcel resolve by value, then by
//!   a deterministic tiebreaker, with self-refreshes always winning over
//!   stale copies of themselves.
//! - **Commitment selection**: a myopic soonest-window policy and a
//!   lookahead policy that scores candidate commitments against a sampled
//!   set of standing bids, with hysteresis against decision thrashing.
//!
//! The world model and broadcast transport are collaborators behind
//! [`WorldView`] and action requests; an in-memory plane world ships for
//! simulation and evaluation.

pub mod agent;
pub mod bid;
pub mod config;
pub mod eval;
pub mod select;
pub mod value;
pub mod world;

pub use haulier_core::{travel_time_ms, Parcel, ParcelState, Point, TimeWindow, WorldView, HOUR_MS};

pub use agent::{Action, Courier, CycleOutput, Envelope, GreedyCourier};
pub use bid::{mix_seed, tiebreak, BidRecord, BidStore};
pub use config::{LookaheadConfig, ProtocolConfig, SelectorKind, ValuationKind};
pub use eval::{EvalCollector, EvalRun, GossipStats, ServiceStats};
pub use select::{BestFutureSelect, EarlySelect, SelectCx, SelectPolicy};
pub use value::{Observer, SimpleValue, TrivialValue, ValuePolicy, MAX_VALUE};
pub use world::{PlaneWorld, SimAgent, SimConfig, SimEvent, Simulation};
