use std::sync::Arc;
use std::thread;

use battleship_coordinator::{
    Coord, FinishReason, FirstTurn, GameError, GameEvent, GameRules, Notice, Orientation, Phase,
    PlayerInfo, PlayerStatus, Registry, RoomCommand, Ruleset, ShipPlacement, Slot, MAX_NAME_LEN,
};

fn tiny_registry() -> Registry {
    Registry::with_seed(
        GameRules::with_ruleset(Ruleset::from_lengths(&[2]).unwrap()),
        Some(42),
    )
}

fn destroyer_at(x: u8, y: u8) -> RoomCommand {
    RoomCommand::PlaceFleet(vec![ShipPlacement::new(
        2,
        Coord::new(x, y),
        Orientation::Horizontal,
    )])
}

fn events_for(notices: &[Notice], to: u64) -> Vec<GameEvent> {
    notices
        .iter()
        .filter(|n| n.to == to)
        .map(|n| n.event.clone())
        .collect()
}

/// Two joined sessions with fleets placed; `a` moves first.
fn started_pair(registry: &Registry) -> (u64, u64) {
    let a = registry.open_session();
    let b = registry.open_session();
    registry.join(a, "alice").unwrap();
    registry.join(b, "bob").unwrap();
    registry.route(a, destroyer_at(0, 0)).unwrap();
    registry.route(b, destroyer_at(0, 0)).unwrap();
    (a, b)
}

#[test]
fn two_joins_pair_and_a_third_waits() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    let c = registry.open_session();

    let notices = registry.join(a, "alice").unwrap();
    let room = registry.room_of(a).unwrap();
    assert_eq!(notices, vec![Notice::new(a, GameEvent::Waiting { room })]);
    assert_eq!(registry.snapshot(a).unwrap().phase, Phase::WaitingForOpponent);

    let notices = registry.join(b, "bob").unwrap();
    assert_eq!(registry.room_of(b), Some(room));
    assert_eq!(
        events_for(&notices, a),
        vec![GameEvent::Matched {
            room,
            slot: Slot::One,
            opponent: "bob".into()
        }]
    );
    assert_eq!(
        events_for(&notices, b),
        vec![GameEvent::Matched {
            room,
            slot: Slot::Two,
            opponent: "alice".into()
        }]
    );
    assert_eq!(registry.snapshot(b).unwrap().phase, Phase::PlacingShips);

    let notices = registry.join(c, "carol").unwrap();
    let third_room = registry.room_of(c).unwrap();
    assert_ne!(third_room, room);
    assert_eq!(events_for(&notices, c), vec![GameEvent::Waiting { room: third_room }]);
    assert_eq!(registry.stats().waiting, Some(third_room));
    assert_eq!(registry.stats().rooms, 2);
}

#[test]
fn commands_without_a_room_are_rejected() {
    let registry = tiny_registry();
    let a = registry.open_session();
    assert_eq!(
        registry.route(a, RoomCommand::Attack(Coord::new(0, 0))),
        Err(GameError::NoActiveRoom)
    );
    assert_eq!(registry.snapshot(a), Err(GameError::NoActiveRoom));
    assert_eq!(
        registry.route(999, RoomCommand::Surrender),
        Err(GameError::UnknownSession(999))
    );
}

#[test]
fn joining_twice_is_rejected() {
    let registry = tiny_registry();
    let a = registry.open_session();
    registry.join(a, "alice").unwrap();
    assert_eq!(registry.join(a, "alice"), Err(GameError::AlreadyInRoom));
}

#[test]
fn overlong_names_are_rejected() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let name = "n".repeat(MAX_NAME_LEN + 1);
    assert_eq!(
        registry.join(a, &name),
        Err(GameError::MessageTooLong { max: MAX_NAME_LEN })
    );
    assert_eq!(registry.room_of(a), None);
}

#[test]
fn full_game_through_the_registry() {
    let registry = tiny_registry();
    let (a, b) = started_pair(&registry);

    registry.route(a, RoomCommand::Attack(Coord::new(0, 0))).unwrap();
    assert_eq!(
        registry.route(a, RoomCommand::Attack(Coord::new(1, 0))),
        Err(GameError::NotYourTurn)
    );
    registry.route(b, RoomCommand::Attack(Coord::new(9, 9))).unwrap();
    let notices = registry
        .route(a, RoomCommand::Attack(Coord::new(1, 0)))
        .unwrap();

    assert!(matches!(
        events_for(&notices, a).last(),
        Some(GameEvent::GameOver { you_won: true, .. })
    ));
    assert!(matches!(
        events_for(&notices, b).last(),
        Some(GameEvent::GameOver { you_won: false, .. })
    ));
    assert_eq!(
        registry.route(b, RoomCommand::Surrender),
        Err(GameError::WrongPhase)
    );
}

#[test]
fn disconnect_mid_game_awards_the_opponent() {
    let registry = tiny_registry();
    let (a, b) = started_pair(&registry);
    let room = registry.room_of(a).unwrap();

    let notices = registry.on_disconnect(a);
    assert!(notices.iter().all(|n| n.to == b));
    match events_for(&notices, b).as_slice() {
        [GameEvent::GameOver { you_won, summary }] => {
            assert!(*you_won);
            assert_eq!(summary.reason, FinishReason::Disconnect);
            assert_eq!(summary.room, room);
        }
        other => panic!("unexpected notices: {other:?}"),
    }
    assert!(registry.session(a).is_none());

    // the room survives until the opponent is gone too
    assert_eq!(registry.snapshot(b).unwrap().phase, Phase::Finished);
    assert!(registry.on_disconnect(b).is_empty());
    assert_eq!(registry.stats().rooms, 0);
    assert_eq!(registry.stats().sessions, 0);
}

#[test]
fn disconnect_while_waiting_frees_the_queue() {
    let registry = tiny_registry();
    let a = registry.open_session();
    registry.join(a, "alice").unwrap();
    assert!(registry.on_disconnect(a).is_empty());
    assert_eq!(registry.stats().waiting, None);
    assert_eq!(registry.stats().rooms, 0);

    let b = registry.open_session();
    let notices = registry.join(b, "bob").unwrap();
    assert!(matches!(notices.as_slice(), [Notice { event: GameEvent::Waiting { .. }, .. }]));
}

#[test]
fn rejoin_after_game_over_starts_a_new_room() {
    let registry = tiny_registry();
    let (a, b) = started_pair(&registry);
    let old_room = registry.room_of(a).unwrap();
    registry.route(b, RoomCommand::Surrender).unwrap();

    let notices = registry.join(a, "alice").unwrap();
    let new_room = registry.room_of(a).unwrap();
    assert_ne!(old_room, new_room);
    assert_eq!(notices, vec![Notice::new(a, GameEvent::Waiting { room: new_room })]);
    // b still sees the finished room
    assert_eq!(registry.room_of(b), Some(old_room));

    registry.join(b, "bob").unwrap();
    assert_eq!(registry.room_of(b), Some(new_room));
    assert_eq!(registry.stats().rooms, 1);
}

#[test]
fn leave_forfeits_and_detaches() {
    let registry = tiny_registry();
    let (a, b) = started_pair(&registry);
    let notices = registry.leave(a).unwrap();
    assert!(matches!(
        events_for(&notices, b).as_slice(),
        [GameEvent::GameOver { you_won: true, summary }] if summary.reason == FinishReason::Left
    ));
    assert_eq!(registry.room_of(a), None);
    assert!(registry.session(a).is_some());
    assert_eq!(registry.leave(a), Err(GameError::NoActiveRoom));
}

#[test]
fn chat_is_relayed_to_both_players() {
    let registry = tiny_registry();
    let (a, b) = started_pair(&registry);
    let notices = registry
        .route(b, RoomCommand::Chat("hello".into()))
        .unwrap();
    let chat = GameEvent::Chat {
        from: Slot::Two,
        text: "hello".into(),
    };
    assert_eq!(events_for(&notices, a), vec![chat.clone()]);
    assert_eq!(events_for(&notices, b), vec![chat]);
}

#[test]
fn coin_flip_is_reproducible_with_a_seed() {
    let rules = GameRules {
        first_turn: FirstTurn::CoinFlip,
        ..GameRules::with_ruleset(Ruleset::from_lengths(&[2]).unwrap())
    };
    let first_movers = |seed| {
        let registry = Registry::with_seed(rules.clone(), Some(seed));
        (0..8)
            .map(|_| {
                let (a, _) = started_pair(&registry);
                registry.with_room(a, |room| Ok(room.first_mover())).unwrap()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(first_movers(7), first_movers(7));
}

#[test]
fn concurrent_rooms_play_independently() {
    let registry = Arc::new(tiny_registry());
    let pairs: Vec<(u64, u64)> = (0..8).map(|_| started_pair(&registry)).collect();

    let handles: Vec<_> = pairs
        .into_iter()
        .map(|(a, b)| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry.route(a, RoomCommand::Attack(Coord::new(0, 0))).unwrap();
                registry.route(b, RoomCommand::Attack(Coord::new(5, 5))).unwrap();
                registry.route(a, RoomCommand::Attack(Coord::new(1, 0))).unwrap();
                registry.snapshot(a).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let view = handle.join().unwrap();
        assert_eq!(view.phase, Phase::Finished);
        assert_eq!(view.winner, Some(Slot::One));
        assert_eq!(view.moves, 3);
    }
}

#[test]
fn racing_attacks_on_one_room_respect_the_turn() {
    let registry = Arc::new(tiny_registry());
    let (a, b) = started_pair(&registry);

    let shots: Vec<_> = [(a, 4u8), (b, 4u8), (a, 5u8), (b, 5u8)]
        .into_iter()
        .map(|(session, x)| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .route(session, RoomCommand::Attack(Coord::new(x, 9)))
                    .is_ok()
            })
        })
        .collect();
    let accepted = shots.into_iter().map(|h| h.join().unwrap()).filter(|&ok| ok).count();

    let view = registry.snapshot(a).unwrap();
    assert_eq!(view.moves as usize, accepted);
    assert!(accepted >= 1);
}

#[test]
fn join_racing_a_host_disconnect_never_pairs_with_a_ghost() {
    for _ in 0..64 {
        let registry = Arc::new(tiny_registry());
        let a = registry.open_session();
        let b = registry.open_session();
        registry.join(a, "alice").unwrap();

        let leaving = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.on_disconnect(a))
        };
        let joining = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.join(b, "bob").unwrap())
        };
        let forfeits = leaving.join().unwrap();
        let joined = joining.join().unwrap();

        match events_for(&joined, b).as_slice() {
            // b joined after the disconnect: it hosts a fresh room
            [GameEvent::Waiting { room }] => {
                assert!(forfeits.is_empty());
                assert_eq!(registry.stats().waiting, Some(*room));
                assert_eq!(registry.snapshot(b).unwrap().phase, Phase::WaitingForOpponent);
            }
            // b was paired while alice was still connected and wins by forfeit
            [GameEvent::Matched { room, .. }] => {
                assert!(matches!(
                    events_for(&forfeits, b).as_slice(),
                    [GameEvent::GameOver { you_won: true, summary }]
                        if summary.reason == FinishReason::Disconnect && summary.room == *room
                ));
                assert_eq!(registry.stats().waiting, None);
            }
            other => panic!("unexpected notices: {other:?}"),
        }
        assert_eq!(registry.stats().sessions, 1);
    }
}

#[test]
fn accepted_challenge_pairs_outside_the_queue() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    let c = registry.open_session();
    registry.join(c, "carol").unwrap();
    let queued = registry.room_of(c).unwrap();

    let notices = registry.challenge(a, b).unwrap();
    assert_eq!(events_for(&notices, a), vec![GameEvent::ChallengeSent { to: b }]);
    assert_eq!(
        events_for(&notices, b),
        vec![GameEvent::ChallengeReceived {
            from: a,
            name: format!("player-{a}")
        }]
    );

    let notices = registry.respond_challenge(b, a, true).unwrap();
    let room = registry.room_of(a).unwrap();
    assert_eq!(registry.room_of(b), Some(room));
    assert_ne!(room, queued);
    assert!(matches!(
        events_for(&notices, a).as_slice(),
        [GameEvent::Matched { slot: Slot::One, .. }]
    ));
    assert!(matches!(
        events_for(&notices, b).as_slice(),
        [GameEvent::Matched { slot: Slot::Two, .. }]
    ));
    assert_eq!(registry.stats().waiting, Some(queued));
    assert_eq!(registry.snapshot(a).unwrap().phase, Phase::PlacingShips);

    registry.route(a, destroyer_at(0, 0)).unwrap();
    registry.route(b, destroyer_at(0, 0)).unwrap();
    assert_eq!(registry.snapshot(b).unwrap().phase, Phase::InProgress);
}

#[test]
fn declined_challenge_notifies_the_challenger() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    registry.challenge(a, b).unwrap();

    let notices = registry.respond_challenge(b, a, false).unwrap();
    assert_eq!(notices, vec![Notice::new(a, GameEvent::ChallengeDeclined { by: b })]);
    assert_eq!(registry.room_of(a), None);
    assert_eq!(registry.room_of(b), None);
    assert_eq!(
        registry.respond_challenge(b, a, true),
        Err(GameError::NoSuchChallenge)
    );
}

#[test]
fn challenges_are_checked_against_the_lobby() {
    let registry = tiny_registry();
    let (x, y) = started_pair(&registry);
    let a = registry.open_session();

    assert_eq!(registry.challenge(a, a), Err(GameError::SelfChallenge));
    assert_eq!(registry.challenge(a, 999), Err(GameError::UnknownSession(999)));
    assert_eq!(registry.challenge(a, x), Err(GameError::OpponentBusy));
    assert_eq!(registry.challenge(y, a), Err(GameError::AlreadyInRoom));
    assert_eq!(
        registry.respond_challenge(a, x, true),
        Err(GameError::NoSuchChallenge)
    );
}

#[test]
fn stale_challenge_cannot_start_a_second_game() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    registry.challenge(a, b).unwrap();
    registry.join(a, "alice").unwrap();
    registry.join(b, "bob").unwrap();

    assert_eq!(
        registry.respond_challenge(b, a, true),
        Err(GameError::AlreadyInRoom)
    );
    assert_eq!(registry.stats().rooms, 1);
}

#[test]
fn waiting_host_can_accept_a_challenge() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    registry.join(a, "alice").unwrap();

    registry.challenge(b, a).unwrap();
    registry.respond_challenge(a, b, true).unwrap();
    assert_eq!(registry.stats().waiting, None);
    assert_eq!(registry.stats().rooms, 1);
    assert_eq!(registry.room_of(a), registry.room_of(b));
}

#[test]
fn disconnect_drops_pending_challenges() {
    let registry = tiny_registry();
    let a = registry.open_session();
    let b = registry.open_session();
    registry.challenge(a, b).unwrap();
    registry.on_disconnect(a);
    assert_eq!(
        registry.respond_challenge(b, a, true),
        Err(GameError::NoSuchChallenge)
    );
}

#[test]
fn player_list_reports_lobby_status() {
    let registry = tiny_registry();
    let (x, y) = started_pair(&registry);
    let idle = registry.open_session();
    let host = registry.open_session();
    registry.join(host, "hana").unwrap();

    assert_eq!(
        registry.players(),
        vec![
            PlayerInfo {
                session: x,
                name: "alice".into(),
                status: PlayerStatus::Playing
            },
            PlayerInfo {
                session: y,
                name: "bob".into(),
                status: PlayerStatus::Playing
            },
            PlayerInfo {
                session: idle,
                name: format!("player-{idle}"),
                status: PlayerStatus::Idle
            },
            PlayerInfo {
                session: host,
                name: "hana".into(),
                status: PlayerStatus::Waiting
            },
        ]
    );

    registry.route(y, RoomCommand::Surrender).unwrap();
    registry.on_disconnect(idle);
    let statuses: Vec<_> = registry.players().iter().map(|p| p.status).collect();
    assert_eq!(
        statuses,
        vec![PlayerStatus::Idle, PlayerStatus::Idle, PlayerStatus::Waiting]
    );
}
