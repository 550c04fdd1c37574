// The serialized dispatcher seen from a transport: handles, broadcasts, saves.

mod common;

use gloomhold::game::events::{Delivery, EventKind};
use gloomhold::game::persistence::StatePersistence;
use gloomhold::game::{WorldHandle, WorldServer};
use gloomhold::WorldError;
use tokio::sync::mpsc;

async fn next_for(rx: &mut mpsc::UnboundedReceiver<Delivery>, session: &str) -> Delivery {
    loop {
        let delivery = rx.recv().await.expect("outbound open");
        if delivery.session_id == session {
            return delivery;
        }
    }
}

#[tokio::test]
async fn two_players_hear_each_other_and_state_is_saved() {
    let dir = tempfile::tempdir().unwrap();
    let store = StatePersistence::new(dir.path());
    let config = common::quiet_config();
    let (engine, _clock) = common::scenario_engine(&config);
    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let (server, handle) = WorldServer::new(engine, Some(store.clone()), out_tx);
    let task = tokio::spawn(server.run());

    let (ada, bob) = (WorldHandle::new_session_id(), WorldHandle::new_session_id());
    assert_ne!(ada, bob);
    let welcome = handle.select_character(&ada, "ada", "char_1").await.unwrap();
    assert!(welcome.contains("Gatehouse"));
    handle.select_character(&bob, "bob", "char_2").await.unwrap();
    let arrival = next_for(&mut out_rx, &ada).await;
    assert_eq!(arrival.kind, EventKind::Arrival);

    handle.command(&bob, "wave").await.unwrap();
    let wave = next_for(&mut out_rx, &ada).await;
    assert!(wave.text.ends_with("waves."));
    assert!(matches!(
        handle.command(&bob, "xyzzy").await,
        Err(WorldError::InvalidText(_))
    ));

    handle.command(&ada, "n").await.unwrap();
    let departure = next_for(&mut out_rx, &bob).await;
    assert_eq!(departure.kind, EventKind::Departure);
    assert!(departure.text.contains("north"));

    let err = handle.command(&ada, "e").await.unwrap_err();
    assert!(matches!(err, WorldError::LockedPath { .. }));

    handle.command(&ada, "collect").await.unwrap();
    handle.save_now().await.unwrap();
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.players[&ada].inventory.gold, 5);

    handle.leave(&bob).await.unwrap();
    let (_, free) = handle.login("carol").await.unwrap();
    assert!(free.iter().any(|c| c.id == "char_2"));
    assert!(matches!(
        handle.login("x").await,
        Err(WorldError::InvalidUsername(_))
    ));

    handle.disconnect(&ada).await.unwrap();
    assert!(matches!(
        handle.command(&ada, "look").await,
        Err(WorldError::UnknownSession(_))
    ));
    let back = handle.reconnect(&ada).await.unwrap();
    assert!(back.contains("Long Hall"));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.players.len(), 1);
    handle.shutdown().await;
    task.await.unwrap();
    assert!(store.load().unwrap().unwrap().last_saved.is_some());
}
