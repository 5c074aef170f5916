use haulier::{
    Courier, GreedyCourier, Parcel, PlaneWorld, Point, ProtocolConfig, SelectorKind, SimConfig,
    Simulation, TimeWindow,
};

const PARCELS: [(&str, (f64, f64), (f64, f64)); 6] = [
    ("p0", (0.7, 1.2), (1.2, 0.8)),
    ("p1", (1.5, 1.5), (2.0, 1.0)),
    ("p2", (2.2, 1.8), (2.6, 2.3)),
    ("p3", (2.5, 2.5), (3.0, 2.0)),
    ("p4", (3.2, 2.7), (2.8, 3.2)),
    ("p5", (3.5, 3.4), (3.0, 3.6)),
];

fn cluster_world() -> PlaneWorld {
    let mut world = PlaneWorld::new(SimConfig {
        width_km: 4.0,
        height_km: 4.0,
        depot: Point::new(2.0, 2.0),
        tick_ms: 1_000,
    });
    for (id, (ox, oy), (dx, dy)) in PARCELS {
        world.add_parcel(Parcel::new(
            id,
            Point::new(ox, oy),
            Point::new(dx, dy),
            TimeWindow::new(0, 100_000_000),
            TimeWindow::new(0, 200_000_000),
        ));
    }
    world
}

fn fleet_protocol(selector: SelectorKind) -> ProtocolConfig {
    ProtocolConfig {
        comm_radius: 2.0,
        comm_reliability: 0.9,
        selector,
        ..ProtocolConfig::default()
    }
}

fn spawn_fleet(sim: &mut Simulation, selector: SelectorKind) {
    let positions = [Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0)];
    for (i, position) in positions.into_iter().enumerate() {
        sim.add_smart(
            Courier::new(format!("veh-{i}"), 60.0, fleet_protocol(selector)),
            position,
        );
    }
}

fn run_until_all_delivered(sim: &mut Simulation, max_ticks: usize) -> bool {
    for _ in 0..max_ticks {
        sim.tick();
        if sim.metrics.service().delivered as usize == PARCELS.len() {
            return true;
        }
    }
    false
}

#[test]
fn test_lookahead_fleet_delivers_everything() {
    let mut sim = Simulation::new(cluster_world(), 42);
    spawn_fleet(&mut sim, SelectorKind::BestFuture);
    assert!(
        run_until_all_delivered(&mut sim, 6_000),
        "fleet failed to deliver all parcels; delivered {}",
        sim.metrics.service().delivered
    );
    assert_eq!(sim.metrics.service().picked_up as usize, PARCELS.len());
    assert!(sim.metrics.gossip().published > 0, "protocol stayed silent");
}

#[test]
fn test_myopic_fleet_caches_drain_after_completion() {
    let mut sim = Simulation::new(cluster_world(), 42);
    spawn_fleet(&mut sim, SelectorKind::Early);
    assert!(run_until_all_delivered(&mut sim, 6_000));

    // TTL decay plus vanish detection must empty every cache once nothing
    // is left to haul.
    sim.run(200);
    for i in 0..3 {
        let courier = sim.smart(&format!("veh-{i}")).unwrap();
        assert!(
            courier.bids().is_empty(),
            "veh-{i} still holds {} stale records",
            courier.bids().len()
        );
    }
}

#[test]
fn test_identical_runs_are_identical() {
    let run = || {
        let mut sim = Simulation::new(cluster_world(), 42);
        spawn_fleet(&mut sim, SelectorKind::BestFuture);
        sim.run(300);
        let commitments: Vec<Option<String>> = (0..3)
            .map(|i| {
                sim.smart(&format!("veh-{i}"))
                    .unwrap()
                    .commitment()
                    .map(str::to_string)
            })
            .collect();
        let cache_sizes: Vec<usize> = (0..3)
            .map(|i| sim.smart(&format!("veh-{i}")).unwrap().bids().len())
            .collect();
        let run = sim.metrics.finalize(sim.ticks_run());
        (run.gossip, run.service, commitments, cache_sizes)
    };

    let a = run();
    let b = run();
    assert_eq!(a.0, b.0);
    assert_eq!(a.1, b.1);
    assert_eq!(a.2, b.2);
    assert_eq!(a.3, b.3);
}

#[test]
fn test_greedy_baseline_completes_without_gossip() {
    let mut sim = Simulation::new(cluster_world(), 42);
    let positions = [Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0)];
    for (i, position) in positions.into_iter().enumerate() {
        sim.add_greedy(GreedyCourier::new(format!("greedy-{i}"), 60.0), position);
    }
    assert!(run_until_all_delivered(&mut sim, 6_000));
    assert_eq!(sim.metrics.gossip().published, 0);
}

#[test]
fn test_message_loss_only_slows_propagation() {
    // A lossy fleet must still finish; unreliable broadcast delays
    // knowledge, it never corrupts it.
    let mut sim = Simulation::new(cluster_world(), 42);
    let positions = [Point::new(1.0, 1.0), Point::new(2.0, 2.0), Point::new(3.0, 3.0)];
    for (i, position) in positions.into_iter().enumerate() {
        let cfg = ProtocolConfig {
            comm_radius: 2.0,
            comm_reliability: 0.3,
            ..ProtocolConfig::default()
        };
        sim.add_smart(Courier::new(format!("veh-{i}"), 60.0, cfg), position);
    }
    assert!(run_until_all_delivered(&mut sim, 6_000));
    assert!(sim.metrics.gossip().hops_dropped > 0, "losses never sampled");
}
