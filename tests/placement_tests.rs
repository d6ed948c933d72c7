use battleship_coordinator::{
    random_fleet, validate_fleet, ConfigError, Coord, GameError, Orientation, Ruleset,
    ShipPlacement,
};
use rand::{rngs::SmallRng, SeedableRng};

fn horizontal(length: u8, x: u8, y: u8) -> ShipPlacement {
    ShipPlacement::new(length, Coord::new(x, y), Orientation::Horizontal)
}

fn standard_fleet() -> Vec<ShipPlacement> {
    vec![
        horizontal(5, 0, 0),
        horizontal(4, 0, 2),
        horizontal(3, 0, 4),
        horizontal(3, 0, 6),
        horizontal(2, 0, 8),
    ]
}

#[test]
fn standard_fleet_is_accepted() {
    let fleet = validate_fleet(&Ruleset::standard(), &standard_fleet()).unwrap();
    assert_eq!(fleet.ships().len(), 5);
    assert_eq!(fleet.ships()[0].len(), 5);
}

#[test]
fn missing_ship_is_a_size_mismatch() {
    let mut fleet = standard_fleet();
    fleet.pop();
    match validate_fleet(&Ruleset::standard(), &fleet) {
        Err(GameError::FleetSizeMismatch { expected, actual }) => {
            assert_eq!(expected, vec![2, 3, 3, 4, 5]);
            assert_eq!(actual, vec![3, 3, 4, 5]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn wrong_length_is_a_size_mismatch() {
    let mut fleet = standard_fleet();
    fleet[4] = horizontal(3, 0, 8);
    assert!(matches!(
        validate_fleet(&Ruleset::standard(), &fleet),
        Err(GameError::FleetSizeMismatch { .. })
    ));
}

#[test]
fn ship_running_off_the_board_is_out_of_bounds() {
    let mut fleet = standard_fleet();
    fleet[0] = horizontal(5, 7, 0);
    assert_eq!(
        validate_fleet(&Ruleset::standard(), &fleet),
        Err(GameError::OutOfBounds(Coord::new(10, 0)))
    );
}

#[test]
fn ships_sharing_a_cell_overlap() {
    let mut fleet = standard_fleet();
    fleet[1] = ShipPlacement::new(4, Coord::new(2, 0), Orientation::Vertical);
    assert_eq!(
        validate_fleet(&Ruleset::standard(), &fleet),
        Err(GameError::Overlap(Coord::new(2, 0)))
    );
}

#[test]
fn gapped_or_bent_coordinates_are_non_contiguous() {
    let ruleset = Ruleset::from_lengths(&[3]).unwrap();
    let gapped = ShipPlacement {
        length: 3,
        coords: vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(3, 0)],
        orientation: Orientation::Horizontal,
    };
    assert_eq!(
        validate_fleet(&ruleset, &[gapped]),
        Err(GameError::NonContiguous { ship: 0 })
    );

    let bent = ShipPlacement {
        length: 3,
        coords: vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(1, 1)],
        orientation: Orientation::Horizontal,
    };
    assert_eq!(
        validate_fleet(&ruleset, &[bent]),
        Err(GameError::NonContiguous { ship: 0 })
    );
}

#[test]
fn orientation_must_match_coordinates() {
    let ruleset = Ruleset::from_lengths(&[2]).unwrap();
    let ship = ShipPlacement {
        length: 2,
        coords: vec![Coord::new(0, 0), Coord::new(0, 1)],
        orientation: Orientation::Horizontal,
    };
    assert_eq!(
        validate_fleet(&ruleset, &[ship]),
        Err(GameError::NonContiguous { ship: 0 })
    );
}

#[test]
fn unordered_coordinates_are_accepted() {
    let ruleset = Ruleset::from_lengths(&[3]).unwrap();
    let ship = ShipPlacement {
        length: 3,
        coords: vec![Coord::new(4, 2), Coord::new(4, 0), Coord::new(4, 1)],
        orientation: Orientation::Vertical,
    };
    assert!(validate_fleet(&ruleset, &[ship]).is_ok());
}

#[test]
fn random_fleets_are_valid_for_custom_rulesets() {
    let ruleset: Ruleset = "4,4,3,2,2,1".parse().unwrap();
    for seed in 0..50 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let fleet = random_fleet(&mut rng, &ruleset).unwrap();
        validate_fleet(&ruleset, &fleet).unwrap();
    }
}

#[test]
fn ruleset_parsing() {
    let ruleset: Ruleset = "5, 4,3,3,2".parse().unwrap();
    assert_eq!(ruleset, Ruleset::standard());
    assert_eq!(ruleset.ship_name(0), Some("Carrier"));
    assert_eq!(ruleset.ship_name(3), Some("Submarine"));
    assert_eq!(ruleset.total_cells(), 17);

    assert_eq!("".parse::<Ruleset>(), Err(ConfigError::EmptyRuleset));
    assert_eq!("5,11".parse::<Ruleset>(), Err(ConfigError::InvalidLength(11)));
    assert!(matches!("5,x".parse::<Ruleset>(), Err(ConfigError::Parse(_))));
}
