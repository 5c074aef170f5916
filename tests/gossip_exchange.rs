use haulier::{
    Courier, Envelope, Parcel, PlaneWorld, Point, ProtocolConfig, SelectorKind, SimConfig,
    Simulation, TimeWindow,
};

fn open_parcel(id: &str, origin: Point) -> Parcel {
    Parcel::new(
        id,
        origin,
        Point::new(5.0, 1.0),
        TimeWindow::new(0, 3_600_000),
        TimeWindow::new(0, 7_200_000),
    )
}

fn exchange_protocol() -> ProtocolConfig {
    // Deterministic radio for the exchange scenarios.
    ProtocolConfig {
        comm_reliability: 1.0,
        selector: SelectorKind::Early,
        ..ProtocolConfig::default()
    }
}

/// Two couriers each start next to a distinct parcel, within radio range of
/// each other. One exchange later, both know both parcels.
#[test]
fn test_one_exchange_spreads_both_parcels() {
    let mut world = PlaneWorld::new(SimConfig::default());
    world.add_parcel(open_parcel("west", Point::new(1.5, 5.0)));
    world.add_parcel(open_parcel("east", Point::new(3.3, 5.0)));

    let cfg = exchange_protocol();
    let mut sim = Simulation::new(world, 7);
    sim.add_smart(Courier::new("veh-a", 60.0, cfg.clone()), Point::new(2.0, 5.0));
    sim.add_smart(Courier::new("veh-b", 60.0, cfg), Point::new(2.8, 5.0));

    sim.run(2);

    for id in ["veh-a", "veh-b"] {
        let known = sim.smart(id).unwrap().bids().parcels_known();
        assert!(known.contains(&"west".to_string()), "{id} missing west");
        assert!(known.contains(&"east".to_string()), "{id} missing east");
    }
}

/// A parcel both couriers can see is contested; the courier that values it
/// less must end up holding the other one's bid, in both caches.
#[test]
fn test_lower_bidder_does_not_win_a_contested_parcel() {
    let mut world = PlaneWorld::new(SimConfig::default());
    world.add_parcel(open_parcel("mid", Point::new(2.3, 5.0)));
    // Ballast parcels keep both cargos non-empty so the simple valuation
    // stays distance-sensitive instead of saturating.
    world.add_parcel(open_parcel("ballast-a", Point::new(0.5, 0.5)));
    world.add_parcel(open_parcel("ballast-b", Point::new(9.5, 9.5)));

    let cfg = exchange_protocol();
    let mut sim = Simulation::new(world, 7);
    // veh-a sits closer to the contested parcel and therefore values it
    // higher under the time-deviation valuation.
    sim.add_smart(Courier::new("veh-a", 60.0, cfg.clone()), Point::new(2.0, 5.0));
    sim.add_smart(Courier::new("veh-b", 60.0, cfg), Point::new(2.8, 5.0));
    sim.world.load_parcel("veh-a", "ballast-a");
    sim.world.load_parcel("veh-b", "ballast-b");

    sim.run(3);

    for id in ["veh-a", "veh-b"] {
        let record = sim
            .smart(id)
            .unwrap()
            .bids()
            .get("mid")
            .expect("both couriers must know the contested parcel");
        assert_eq!(
            record.original_bidder, "veh-a",
            "the lower bid must not displace the higher one in {id}'s cache"
        );
    }
}

/// Foreign broadcast kinds are dropped on the floor, not crashed on.
#[test]
fn test_foreign_broadcasts_are_ignored() {
    let mut courier = Courier::new("veh-a", 60.0, exchange_protocol());
    for i in 0..5 {
        courier.receive(&Envelope::Beacon {
            courier_id: format!("stranger-{i}"),
            position: Point::new(i as f64, 0.0),
        });
    }
    assert_eq!(courier.received_count(), 5);
    assert!(courier.bids().is_empty());
    assert_eq!(courier.contact_count(), 0);
}
