/// Phase machine transitions for both roles without a full join

use std::time::{Duration, Instant};

use roster_client::{ClientConfig, RegistryClient};
use roster_server::transport::{PacketReceiver, ServerEvent};
use roster_shared::{EntityId, Record, RegistryPhase};
use roster_test::{connect_client, listen, protocol, LocalHub, Score};

#[test]
fn client_without_local_records_stays_disabled() {
    let hub = LocalHub::new();
    let _server = listen(&hub);
    let mut a = connect_client(&hub);

    a.client.tick(Instant::now());
    a.client.tick(Instant::now());

    assert_eq!(a.client.phase(), RegistryPhase::Disabled);
}

#[test]
fn server_without_local_records_stays_disabled() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);

    server.tick();
    server.tick();

    assert_eq!(server.phase(), RegistryPhase::Disabled);
}

#[test]
fn client_reaches_joining_within_one_tick() {
    let hub = LocalHub::new();
    let _server = listen(&hub);
    let mut a = connect_client(&hub);

    a.client.add(Record::with_identity("p1")).unwrap();
    a.client.tick(Instant::now());

    assert_eq!(a.client.phase(), RegistryPhase::Joining);
}

#[test]
fn server_admits_itself_on_the_next_tick() {
    let hub = LocalHub::new();
    let mut server = listen(&hub);

    server.add(Record::with_identity("host")).unwrap();
    server.tick();
    assert_eq!(server.phase(), RegistryPhase::Joining);

    server.tick();
    assert_eq!(server.phase(), RegistryPhase::InUse);
    assert!(server
        .get(&EntityId::from("host"))
        .unwrap()
        .network_identity()
        .unwrap()
        .is_server_owned());
}

#[test]
fn unanswered_join_is_resent_after_timeout() {
    let hub = LocalHub::new();
    // no server ticks, so joins go unanswered
    let _server = listen(&hub);
    let socket = hub.connect_client();
    let config = ClientConfig {
        join_broadcast_timeout: Duration::from_secs(5),
    };
    let mut client = RegistryClient::new(config, protocol());
    client.io_load(socket.sender, socket.receiver);
    client.add(Record::with_identity("p1")).unwrap();

    let start = Instant::now();
    client.tick(start);
    client.tick(start);
    client.tick(start + Duration::from_secs(4));
    client.tick(start + Duration::from_secs(5));

    assert_eq!(client.phase(), RegistryPhase::Joining);
    // Connected event, then two Join payloads
    let (_, mut receiver) = hub.server_socket();
    let mut joins = 0;
    while let Ok(Some(event)) = receiver.receive() {
        if matches!(event, ServerEvent::Payload(..)) {
            joins += 1;
        }
    }
    assert_eq!(joins, 2);
}

#[test]
fn local_mode_writes_apply_immediately() {
    let mut client = RegistryClient::new(ClientConfig::default(), protocol());
    let p1 = client
        .add(Record::with_identity("p1").with(Score::new(1)))
        .unwrap();

    client.set_facet(&p1, Score::new(2)).unwrap();
    assert_eq!(client.get(&p1).unwrap().get::<Score>(), &Score::new(2));

    let cleared: Score = client.clear_facet(&p1).unwrap();
    assert_eq!(cleared, Score::new(2));
    assert!(!client.get(&p1).unwrap().has::<Score>());

    client.remove(&p1).unwrap();
    assert!(client.registry().is_empty());
    assert!(!client.is_local(&p1));
}
