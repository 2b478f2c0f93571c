//! Integration tests for the room store: invariants under random event
//! sequences, routing, reset, the backend bulk transitions, and the actor.

use std::collections::HashSet;
use std::time::Duration;

use proxchat_protocol::{
    BackendEvent, BackendModel, BackendParams, ClientId, ClientRecord, ImpostorParams, Pose,
    RoomEvent, RoomGroup,
};
use proxchat_room::{
    RoomError, RoomNotification, RoomState, RoomStore, StoreConfig, spawn_store,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// =========================================================================
// Helpers
// =========================================================================

fn record(uuid: &str, name: &str, group: RoomGroup) -> ClientRecord {
    ClientRecord::new(uuid, name).with_group(group)
}

/// A store whose local client is `me`/"red" with three peers.
fn store_with(peers: Vec<ClientRecord>) -> RoomStore {
    let mut store = RoomStore::new();
    store.dispatch(RoomEvent::SetUuid { uuid: "me".into() }).unwrap();
    store
        .dispatch(RoomEvent::SetNameAndBackendModel {
            name: "red".into(),
            backend_model: BackendModel::new("ABCDEF", BackendParams::NoOp),
        })
        .unwrap();
    store
        .dispatch(RoomEvent::SetAllClients { clients: peers })
        .unwrap();
    store
}

fn groups(state: &RoomState) -> Vec<(String, RoomGroup)> {
    state
        .clients
        .iter()
        .map(|c| (c.uuid.to_string(), c.group))
        .collect()
}

fn assert_roster_invariants(state: &RoomState) {
    let mut seen = HashSet::new();
    for c in &state.clients {
        assert_ne!(c.uuid, state.me.uuid, "local uuid found among peers");
        assert!(seen.insert(c.uuid.clone()), "duplicate peer uuid {}", c.uuid);
    }
}

// =========================================================================
// Uniqueness invariant
// =========================================================================

#[test]
fn test_roster_stays_unique_under_random_membership_events() {
    // A small uuid pool forces plenty of collisions.
    let pool: Vec<ClientId> = (0..6).map(|i| ClientId::new(format!("u{i}"))).collect();

    for seed in 0..32u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut store = RoomStore::new();

        for _ in 0..200 {
            let uuid = pool[rng.random_range(0..pool.len())].clone();
            let event = match rng.random_range(0..10) {
                0..=4 => RoomEvent::AddClient(ClientRecord::new(uuid, "p")),
                5..=7 => RoomEvent::RemoveClient { uuid },
                8 => RoomEvent::SetUuid { uuid },
                _ => {
                    let n = rng.random_range(0..8);
                    let clients = (0..n)
                        .map(|_| {
                            ClientRecord::new(pool[rng.random_range(0..pool.len())].clone(), "q")
                        })
                        .collect();
                    RoomEvent::SetAllClients { clients }
                }
            };
            // Rejections are expected; the state must hold either way.
            let _ = store.dispatch(event);
            assert_roster_invariants(store.state());
        }
    }
}

// =========================================================================
// Routing
// =========================================================================

#[test]
fn test_pose_and_group_route_to_me_iff_uuid_matches() {
    let uuids = ["me", "a", "b", "ghost"];

    for target in uuids {
        let mut store = store_with(vec![
            record("a", "blue", RoomGroup::Main),
            record("b", "green", RoomGroup::Main),
        ]);
        let before = store.state().clone();
        let pose = Pose::new(4.0, -4.0);

        let pose_result = store.dispatch(RoomEvent::SetPose {
            uuid: target.into(),
            pose,
        });
        let group_result = store.dispatch(RoomEvent::SetGroup {
            uuid: target.into(),
            group: RoomGroup::Muted,
        });
        let after = store.state();

        let mutated_me = after.me.pose == pose && after.me.group == RoomGroup::Muted;
        assert_eq!(mutated_me, target == "me", "target {target}");

        for (old, new) in before.clients.iter().zip(&after.clients) {
            let hit = new.uuid.as_str() == target;
            assert_eq!(new.pose == pose, hit, "peer {} for target {target}", new.uuid);
            assert_eq!(new.group == RoomGroup::Muted, hit);
            if !hit {
                assert_eq!(old, new);
            }
        }

        if target == "ghost" {
            assert!(matches!(pose_result, Err(RoomError::UnknownClient(_))));
            assert!(matches!(group_result, Err(RoomError::UnknownClient(_))));
            assert_eq!(after, &before);
        } else {
            assert!(pose_result.is_ok() && group_result.is_ok());
        }
    }
}

// =========================================================================
// Reset
// =========================================================================

#[test]
fn test_reset_twice_equals_reset_once() {
    let mut store = store_with(vec![record("a", "blue", RoomGroup::Main)]);
    store.dispatch(RoomEvent::SetJoinedRoom { joined: true }).unwrap();

    store.reset();
    let once = store.state().clone();
    store.reset();
    let twice = store.state().clone();

    assert_eq!(once, twice);
    assert!(once.me.uuid.is_empty());
    assert!(!once.joined_room);
    assert!(once.me.name.is_empty());
    assert_eq!(once.backend_model, BackendModel::default());
}

// =========================================================================
// Backend bulk transitions
// =========================================================================

#[test]
fn test_comms_sabotage_moves_main_to_muted_and_back() {
    let mut store = store_with(vec![
        record("A", "a", RoomGroup::Main),
        record("B", "b", RoomGroup::Muted),
        record("C", "c", RoomGroup::Spectator),
    ]);

    store
        .apply_backend(BackendEvent::PlayersFromGroup {
            from: RoomGroup::Main,
            to: RoomGroup::Muted,
        })
        .unwrap();
    assert_eq!(
        groups(store.state()),
        vec![
            ("A".into(), RoomGroup::Muted),
            ("B".into(), RoomGroup::Muted),
            ("C".into(), RoomGroup::Spectator),
        ]
    );

    store
        .apply_backend(BackendEvent::PlayersFromGroup {
            from: RoomGroup::Muted,
            to: RoomGroup::Main,
        })
        .unwrap();
    assert_eq!(
        groups(store.state()),
        vec![
            ("A".into(), RoomGroup::Main),
            ("B".into(), RoomGroup::Main),
            ("C".into(), RoomGroup::Spectator),
        ]
    );
    // The local client started in Spectator and was never touched.
    assert_eq!(store.state().me.group, RoomGroup::Spectator);
}

#[test]
fn test_meeting_collapses_every_pose_to_origin() {
    let mut rng = StdRng::seed_from_u64(7);
    let peers = (0..10)
        .map(|i| {
            ClientRecord::new(format!("p{i}"), format!("n{i}")).with_pose(Pose::new(
                rng.random_range(-50.0..50.0),
                rng.random_range(-50.0..50.0),
            ))
        })
        .collect();
    let mut store = store_with(peers);
    store
        .dispatch(RoomEvent::SetPose {
            uuid: "me".into(),
            pose: Pose::new(12.0, 3.0),
        })
        .unwrap();

    store
        .apply_backend(BackendEvent::AllPlayerPoses(Pose::ORIGIN))
        .unwrap();

    assert!(store.state().everyone().all(|c| c.pose == Pose::ORIGIN));
}

#[test]
fn test_game_start_exile_and_end() {
    let mut store = store_with(vec![
        record("x", "xavier", RoomGroup::Spectator),
        record("y", "yara", RoomGroup::Spectator),
        record("z", "zed", RoomGroup::Muted),
    ]);

    store
        .apply_backend(BackendEvent::AllPlayersJoinGroup(RoomGroup::Main))
        .unwrap();
    assert!(store.state().everyone().all(|c| c.group == RoomGroup::Main));

    store
        .apply_backend(BackendEvent::PlayerJoinGroup {
            name: "xavier".into(),
            group: RoomGroup::Spectator,
        })
        .unwrap();
    let state = store.state();
    assert_eq!(state.group_of(&"x".into()), Some(RoomGroup::Spectator));
    assert_eq!(state.group_of(&"y".into()), Some(RoomGroup::Main));
    assert_eq!(state.group_of(&"z".into()), Some(RoomGroup::Main));
    assert_eq!(state.me.group, RoomGroup::Main);

    store
        .apply_backend(BackendEvent::AllPlayersJoinGroup(RoomGroup::Spectator))
        .unwrap();
    assert!(store.state().everyone().all(|c| c.group == RoomGroup::Spectator));
}

// =========================================================================
// Store actor
// =========================================================================

#[tokio::test]
async fn test_actor_publishes_snapshot_then_notifications() {
    let handle = spawn_store(StoreConfig::default());
    let mut notes = handle.subscribe();
    let mut watch = handle.watch();

    handle.dispatch(RoomEvent::SetUuid { uuid: "me".into() }).await.unwrap();
    handle
        .dispatch(RoomEvent::AddClient(record("a", "blue", RoomGroup::Main)))
        .await
        .unwrap();

    watch.changed().await.unwrap();
    assert_eq!(handle.snapshot().clients.len(), 1);
    assert_eq!(handle.snapshot().me.uuid.as_str(), "me");

    let first = notes.recv().await.unwrap();
    assert!(matches!(first, RoomNotification::MetadataChanged(_)));
    let second = notes.recv().await.unwrap();
    assert_eq!(second, RoomNotification::MembershipChanged { peers: 1 });
}

#[tokio::test]
async fn test_actor_reset_is_observed_whole() {
    let handle = spawn_store(StoreConfig::default());
    handle.dispatch(RoomEvent::SetUuid { uuid: "me".into() }).await.unwrap();
    handle
        .dispatch(RoomEvent::SetNameAndBackendModel {
            name: "red".into(),
            backend_model: BackendModel::new(
                "ABCDEF",
                BackendParams::Impostor(ImpostorParams::new("127.0.0.1")),
            ),
        })
        .await
        .unwrap();
    handle.dispatch(RoomEvent::SetJoinedRoom { joined: true }).await.unwrap();

    let mut watch = handle.watch();
    watch.borrow_and_update();
    handle.reset().await.unwrap();
    watch.changed().await.unwrap();

    // One publish covers all three reset transitions.
    let state = watch.borrow_and_update().clone();
    assert!(state.me.uuid.is_empty());
    assert!(!state.joined_room);
    assert!(state.me.name.is_empty());
    assert_eq!(state.backend_model, BackendModel::default());
    assert!(!watch.has_changed().unwrap());

    handle.reset().await.unwrap();
    assert_eq!(handle.snapshot(), state);
}

#[tokio::test]
async fn test_actor_drops_unknown_client_updates() {
    let handle = spawn_store(StoreConfig::default());
    handle.dispatch(RoomEvent::SetUuid { uuid: "me".into() }).await.unwrap();
    let before = handle.snapshot();

    let err = handle
        .dispatch(RoomEvent::SetGroup {
            uuid: "ghost".into(),
            group: RoomGroup::Main,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::UnknownClient(_)));

    let err = handle
        .apply_backend(BackendEvent::PlayerPose {
            name: "ghost".into(),
            pose: Pose::new(1.0, 1.0),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::UnknownPlayer(_)));

    assert_eq!(handle.snapshot(), before);
}

#[tokio::test]
async fn test_push_backend_is_applied_in_order() {
    let handle = spawn_store(StoreConfig::default());
    handle.dispatch(RoomEvent::SetUuid { uuid: "me".into() }).await.unwrap();
    handle
        .dispatch(RoomEvent::SetNameAndBackendModel {
            name: "red".into(),
            backend_model: BackendModel::default(),
        })
        .await
        .unwrap();

    for i in 0..20 {
        handle
            .push_backend(BackendEvent::PlayerPose {
                name: "red".into(),
                pose: Pose::new(f64::from(i), 0.0),
            })
            .await
            .unwrap();
    }
    // A round-trip command queued after the pushes sees all of them.
    handle.reset().await.unwrap();
    assert_eq!(handle.snapshot().me.pose, Pose::new(19.0, 0.0));
}

#[tokio::test]
async fn test_handle_unavailable_after_shutdown() {
    let handle = spawn_store(StoreConfig {
        command_buffer: 0,
        notification_capacity: 0,
    });
    handle.shutdown().await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), async {
        while !handle.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("actor should stop");

    let err = handle.reset().await.unwrap_err();
    assert!(matches!(err, RoomError::Unavailable));
}
