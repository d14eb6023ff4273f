/// END-TO-END: the server refuses writes a peer is not allowed to make
///
/// A refused write leaves the server's record untouched and answers the
/// offending peer with a Sync{PermissionDenied} re-asserting its view.

use std::time::Instant;

use roster_server::RegistryServer;
use roster_shared::{
    EntityId, NetworkIdentity, Record, RegistryEvent, RegistryPhase, SyncReason,
};
use roster_test::{connect_client, listen, run_ticks, LocalHub, Nickname, Score, TestClient};

fn two_players() -> (LocalHub, RegistryServer, TestClient, TestClient, Instant) {
    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);
    let mut b = connect_client(&hub);

    a.client
        .add(
            Record::with_identity("p1")
                .with(Score::new(10))
                .with(Nickname("Ann".to_string())),
        )
        .unwrap();
    b.client.add(Record::with_identity("p2")).unwrap();

    let now = run_ticks(&mut server, &mut [&mut a, &mut b], Instant::now(), 4);
    assert_eq!(a.client.phase(), RegistryPhase::InUse);
    assert_eq!(b.client.phase(), RegistryPhase::InUse);
    a.client.take_events();
    b.client.take_events();
    (hub, server, a, b, now)
}

fn permission_denied(events: &[RegistryEvent]) -> bool {
    events.contains(&RegistryEvent::Synced {
        reason: SyncReason::PermissionDenied,
    })
}

#[test]
fn non_owner_update_is_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    b.client.set_facet(&p1, Score::new(9999)).unwrap();
    b.client.tick(now);
    server.tick();

    assert_eq!(server.get(&p1).unwrap().get::<Score>(), &Score::new(10));
    assert_eq!(hub.pending_for(&a.peer), 0);
    assert_eq!(hub.pending_for(&b.peer), 1);

    run_ticks(&mut server, &mut [&mut a, &mut b], now, 1);
    assert!(permission_denied(&b.client.take_events()));
    assert!(!b.client.get(&p1).unwrap().has::<Score>());
    assert!(a.client.take_events().is_empty());
}

#[test]
fn anyone_may_write_an_open_facet() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    b.client
        .set_facet(&p1, Nickname("Annie".to_string()))
        .unwrap();
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    let renamed = Nickname("Annie".to_string());
    assert_eq!(server.get(&p1).unwrap().get::<Nickname>(), &renamed);
    assert_eq!(a.client.get(&p1).unwrap().get::<Nickname>(), &renamed);
    assert_eq!(b.client.get(&p1).unwrap().get::<Nickname>(), &renamed);
    assert!(!permission_denied(&b.client.take_events()));
}

#[test]
fn ownership_cannot_be_claimed_remotely() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    b.client
        .set_facet(&p1, NetworkIdentity::owned_by(b.peer))
        .unwrap();
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    assert!(server
        .get(&p1)
        .unwrap()
        .network_identity()
        .unwrap()
        .is_owned_by(&a.peer));
    assert!(permission_denied(&b.client.take_events()));
}

#[test]
fn even_the_owner_cannot_rewrite_network_identity() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    a.client
        .set_facet(&p1, NetworkIdentity::server_owned())
        .unwrap();
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    assert!(!server
        .get(&p1)
        .unwrap()
        .network_identity()
        .unwrap()
        .is_server_owned());
    assert!(permission_denied(&a.client.take_events()));
}

#[test]
fn non_owner_remove_is_rejected() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    b.client.remove(&p1).unwrap();
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    assert!(server.get(&p1).is_some());
    assert!(b.client.get(&p1).is_some());
    assert!(permission_denied(&b.client.take_events()));
}

#[test]
fn owner_remove_propagates() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let p1 = EntityId::from("p1");

    a.client.remove(&p1).unwrap();
    assert!(!a.client.is_local(&p1));
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    assert!(server.get(&p1).is_none());
    assert!(a.client.get(&p1).is_none());
    assert!(b.client.get(&p1).is_none());
    assert!(b.client.get(&EntityId::from("p2")).is_some());
}

#[test]
fn racing_add_is_refused_for_the_later_peer() {
    let (_hub, mut server, mut a, mut b, now) = two_players();
    let contested = EntityId::from("contested");

    a.client.add(Record::with_identity("contested")).unwrap();
    b.client.add(Record::with_identity("contested")).unwrap();
    run_ticks(&mut server, &mut [&mut a, &mut b], now, 2);

    assert!(server
        .get(&contested)
        .unwrap()
        .network_identity()
        .unwrap()
        .is_owned_by(&a.peer));
    assert!(a.client.is_local(&contested));
    assert!(!b.client.is_local(&contested));
    assert!(b.client.get(&contested).is_some());
    assert!(permission_denied(&b.client.take_events()));
}
