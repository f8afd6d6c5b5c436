use cityforge::{
    components::EntityKind,
    geometry::TilePos,
    grid::PlacementError,
    scenario::ScenarioLoader,
    world::{ReclassifyError, RemovalError, TaxRateError, UpgradeError},
    World,
};

fn new_town() -> World {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/new_town.yaml")
        .expect("scenario should load")
        .build_world()
        .expect("world should build")
}

#[test]
fn road_on_open_water_is_rejected_without_charge() {
    let mut world = new_town();
    let money = world.wallet().balance();
    let entities = world.grid().entity_count();
    let err = world
        .place_request(TilePos::new(36, 5), EntityKind::Road)
        .unwrap_err();
    assert!(matches!(err, PlacementError::Water { .. }));
    assert_eq!(world.wallet().balance(), money);
    assert_eq!(world.grid().entity_count(), entities);
}

#[test]
fn shore_takes_roads_but_not_buildings() {
    let mut world = new_town();
    assert!(world
        .place_request(TilePos::new(33, 10), EntityKind::Road)
        .is_ok());
    let err = world
        .place_request(TilePos::new(30, 20), EntityKind::ServiceZone)
        .unwrap_err();
    assert!(matches!(err, PlacementError::Water { .. }));
}

#[test]
fn overlapping_placement_collides() {
    let mut world = new_town();
    let err = world
        .place_request(TilePos::new(4, 4), EntityKind::Stadium)
        .unwrap_err();
    assert!(matches!(err, PlacementError::Collision { .. }));
}

#[test]
fn placement_may_overdraw_the_wallet() {
    let mut world = new_town();
    world.wallet_mut().charge(11_950.0);
    world
        .place_request(TilePos::new(25, 20), EntityKind::Stadium)
        .unwrap();
    assert!(world.wallet().balance() < 0.0);
}

#[test]
fn sole_connector_road_cannot_be_removed() {
    let mut world = new_town();
    let err = world
        .remove_request(TilePos::new(12, 6), EntityKind::Road)
        .unwrap_err();
    assert!(matches!(err, RemovalError::RoadRemovalDenied { .. }));
    assert!(world
        .grid()
        .find_at(TilePos::new(12, 6), EntityKind::Road)
        .is_some());
}

#[test]
fn dead_end_road_can_be_removed() {
    let mut world = new_town();
    world
        .remove_request(TilePos::new(22, 6), EntityKind::Road)
        .unwrap();
    assert!(world
        .grid()
        .find_at(TilePos::new(22, 6), EntityKind::Road)
        .is_none());
}

#[test]
fn occupied_zone_stays() {
    let mut world = new_town();
    let err = world
        .remove_request(TilePos::new(3, 3), EntityKind::ResidentialZone)
        .unwrap_err();
    assert!(matches!(err, RemovalError::ZoneOccupied { occupants: 12, .. }));
    let err = world.reclassify_zone(TilePos::new(3, 3)).unwrap_err();
    assert!(matches!(err, ReclassifyError::ZoneOccupied { .. }));
}

#[test]
fn empty_zone_is_reclassified() {
    let mut world = new_town();
    world.reclassify_zone(TilePos::new(8, 3)).unwrap();
    assert_eq!(
        world.reclassify_zone(TilePos::new(8, 3)),
        Err(ReclassifyError::NotFound(TilePos::new(8, 3)))
    );
}

#[test]
fn stadium_boosts_residents_below_the_ceiling() {
    let mut world = new_town();
    let before: Vec<f64> = world.citizens().iter().map(|c| c.satisfaction).collect();
    world
        .place_request(TilePos::new(2, 8), EntityKind::Stadium)
        .unwrap();
    let after: Vec<f64> = world.citizens().iter().map(|c| c.satisfaction).collect();
    for (old, new) in before.iter().zip(&after) {
        let boosted = old * 1.2;
        if boosted <= 100.0 {
            assert!((new - boosted).abs() < 1e-9);
        } else {
            assert_eq!(new, old);
        }
    }
}

#[test]
fn removing_a_police_station_withdraws_its_boost() {
    let mut world = new_town();
    let before = world.population().average_satisfaction();
    world
        .remove_request(TilePos::new(7, 8), EntityKind::PoliceDepartment)
        .unwrap();
    assert!(world.population().average_satisfaction() < before);
}

#[test]
fn disasters_cannot_be_bulldozed() {
    let mut world = new_town();
    world
        .place_request(TilePos::new(25, 20), EntityKind::Disaster)
        .unwrap();
    let err = world
        .remove_request(TilePos::new(26, 21), EntityKind::Disaster)
        .unwrap_err();
    assert_eq!(err, RemovalError::NotRemovable(EntityKind::Disaster));
}

#[test]
fn zones_upgrade_to_level_three() {
    let mut world = new_town();
    let money = world.wallet().balance();
    assert_eq!(world.upgrade_zone(TilePos::new(14, 2)), Ok(2));
    assert_eq!(world.upgrade_zone(TilePos::new(14, 2)), Ok(3));
    assert!(matches!(
        world.upgrade_zone(TilePos::new(14, 2)),
        Err(UpgradeError::MaxLevel(_))
    ));
    assert_eq!(world.wallet().balance(), money - 600.0);
    let factory = world
        .grid()
        .entity_at(TilePos::new(14, 2))
        .and_then(|entity| entity.zone())
        .unwrap();
    assert_eq!(factory.capacity, 60);
}

#[test]
fn tax_rate_stays_in_unit_range() {
    let mut world = new_town();
    assert_eq!(world.set_tax_rate(1.5), Err(TaxRateError(1.5)));
    world.set_tax_rate(0.4).unwrap();
    assert_eq!(world.tax_rate(), 0.4);
}
