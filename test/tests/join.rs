/// END-TO-END: a client joins the server's registry
///
/// The client submits its local records in a Join broadcast, the server
/// admits them with a NetworkIdentity naming the client's connection and
/// replies with a Sync. The client reaches IN_USE once every local record
/// came back networked.

use std::time::Instant;

use roster_shared::{
    Authenticator, DatabaseToken, EntityId, Identity, Record, RegistryEvent,
    RegistryPhase, SyncReason,
};
use roster_test::{connect_client, listen, run_ticks, LocalHub, MemoryAuthenticator, Nickname};

#[test]
fn client_join_is_admitted_by_server() {
    let _ = env_logger::builder().is_test(true).try_init();

    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);
    let p1 = EntityId::from("p1");

    a.client.add(Record::with_identity("p1")).unwrap();
    run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);

    assert_eq!(a.client.phase(), RegistryPhase::InUse);
    assert!(a.client.is_local(&p1));

    let stored = server.get(&p1).expect("server should hold p1");
    assert!(stored.network_identity().unwrap().is_owned_by(&a.peer));
    assert!(!server.is_local(&p1));

    let mirrored = a.client.get(&p1).expect("client should hold p1");
    assert_eq!(mirrored.get::<Identity>().entity_id(), &p1);
    assert_eq!(mirrored.network_identity().unwrap().owner(), Some(a.peer));
    assert_eq!(mirrored.len(), 2);
}

#[test]
fn join_emits_phase_and_sync_events() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);

    a.client.add(Record::with_identity("p1")).unwrap();
    run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);

    let events = a.client.take_events();
    assert!(events.contains(&RegistryEvent::PhaseChanged {
        previous: RegistryPhase::Disabled,
        current: RegistryPhase::Joining,
    }));
    assert!(events.contains(&RegistryEvent::Synced {
        reason: SyncReason::RosterChanged,
    }));
    assert_eq!(
        events.last(),
        Some(&RegistryEvent::PhaseChanged {
            previous: RegistryPhase::Joining,
            current: RegistryPhase::InUse,
        })
    );
}

#[test]
fn records_joined_together_list_each_other() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);

    a.client.add(Record::with_identity("p1")).unwrap();
    a.client.add(Record::with_identity("p2")).unwrap();
    run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);

    assert_eq!(a.client.phase(), RegistryPhase::InUse);
    let p1 = server.get(&EntityId::from("p1")).unwrap();
    assert_eq!(
        p1.network_identity().unwrap().peer_entities(),
        &[EntityId::from("p2")]
    );
}

#[test]
fn client_sees_server_local_records() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);

    server
        .add(Record::with_identity("host").with(Nickname("Host".to_string())))
        .unwrap();
    a.client.add(Record::with_identity("p1")).unwrap();
    run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);

    assert_eq!(server.phase(), RegistryPhase::InUse);
    let host = a.client.get(&EntityId::from("host")).expect("host is replicated");
    assert!(host.network_identity().unwrap().is_server_owned());
    assert_eq!(host.get::<Nickname>(), &Nickname("Host".to_string()));
    assert!(!a.client.is_local(&EntityId::from("host")));
}

#[test]
fn record_added_while_in_use_round_trips_through_server() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);

    a.client.add(Record::with_identity("p1")).unwrap();
    let now = run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);
    assert_eq!(a.client.phase(), RegistryPhase::InUse);

    let p2 = a.client.add(Record::with_identity("p2")).unwrap();
    // nothing lands locally until the server answers
    assert!(a.client.get(&p2).is_none());

    run_ticks(&mut server, &mut [&mut a], now, 2);
    assert!(server.get(&p2).is_some());
    assert_eq!(
        a.client.get(&p2).unwrap().network_identity().unwrap().owner(),
        Some(a.peer)
    );
}

#[test]
fn logged_in_player_joins_with_database_token() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "hunter2").unwrap();
    let ticket = auth.log_in("alice", "hunter2").unwrap();
    let entity_id = ticket.entity_id.clone();
    let token = ticket.token.clone();

    let hub = LocalHub::new();
    let mut server = listen(&hub);
    let mut a = connect_client(&hub);
    a.client.add(ticket.into_record()).unwrap();
    run_ticks(&mut server, &mut [&mut a], Instant::now(), 4);

    assert_eq!(a.client.phase(), RegistryPhase::InUse);
    let mirrored = a.client.get(&entity_id).unwrap();
    assert_eq!(mirrored.get::<DatabaseToken>().token(), token);
}
