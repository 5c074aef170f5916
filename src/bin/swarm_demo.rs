//! Smart-vs-greedy demonstration run.
//!
//! Spawns the same random parcel scenario twice: once with protocol-speaking
//! couriers (bid gossip + lookahead selection), once with the greedy
//! baseline, and prints both evaluation runs as JSON.

use anyhow::Result;
use haulier::{
    Courier, GreedyCourier, Parcel, PlaneWorld, Point, ProtocolConfig, SimConfig, Simulation,
    TimeWindow,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const COURIERS: usize = 5;
const PARCELS: usize = 14;
const TICKS: usize = 2_400;
const SEED: u64 = 123;

fn scenario_world(rng: &mut StdRng) -> PlaneWorld {
    let cfg = SimConfig {
        width_km: 6.0,
        height_km: 6.0,
        depot: Point::new(3.0, 3.0),
        tick_ms: 1_000,
    };
    let mut world = PlaneWorld::new(cfg);
    for i in 0..PARCELS {
        let origin = Point::new(rng.random_range(0.5..5.5), rng.random_range(0.5..5.5));
        let destination = Point::new(rng.random_range(0.5..5.5), rng.random_range(0.5..5.5));
        let announce = rng.random_range(0..600_000);
        let pickup_begin = announce + rng.random_range(0..120_000);
        let parcel = Parcel::new(
            format!("parcel-{i}"),
            origin,
            destination,
            TimeWindow::new(pickup_begin, pickup_begin + 900_000),
            TimeWindow::new(pickup_begin + 300_000, pickup_begin + 1_800_000),
        );
        world.schedule_parcel(parcel, announce);
    }
    world
}

fn courier_positions(rng: &mut StdRng) -> Vec<Point> {
    (0..COURIERS)
        .map(|_| Point::new(rng.random_range(1.0..5.0), rng.random_range(1.0..5.0)))
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let protocol = ProtocolConfig {
        comm_radius: 2.0,
        ..ProtocolConfig::default()
    };

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut smart = Simulation::new(scenario_world(&mut rng), SEED);
    for (i, position) in courier_positions(&mut rng).into_iter().enumerate() {
        smart.add_smart(
            Courier::new(format!("smart-{i}"), 60.0, protocol.clone()),
            position,
        );
    }
    smart.run(TICKS);
    let smart_run = smart.metrics.finalize(smart.ticks_run());

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut greedy = Simulation::new(scenario_world(&mut rng), SEED);
    for (i, position) in courier_positions(&mut rng).into_iter().enumerate() {
        greedy.add_greedy(GreedyCourier::new(format!("greedy-{i}"), 60.0), position);
    }
    greedy.run(TICKS);
    let greedy_run = greedy.metrics.finalize(greedy.ticks_run());

    println!("smart fleet:");
    println!("{}", serde_json::to_string_pretty(&smart_run)?);
    println!("greedy fleet:");
    println!("{}", serde_json::to_string_pretty(&greedy_run)?);
    Ok(())
}
