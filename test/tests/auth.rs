/// Authentication glue: an Authenticator hands out tickets that become
/// admissible records

use roster_shared::{AuthError, Authenticator, DatabaseToken, Identity};
use roster_test::MemoryAuthenticator;

#[test]
fn ticket_carries_identity_and_token() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "pw").unwrap();

    let ticket = auth.log_in("alice", "pw").unwrap();
    let entity_id = ticket.entity_id.clone();
    let token = ticket.token.clone();
    let record = ticket.into_record();

    assert_eq!(record.get::<Identity>().entity_id(), &entity_id);
    assert_eq!(record.get::<DatabaseToken>().token(), token);
}

#[test]
fn log_in_keeps_the_same_entity_id() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "pw").unwrap();

    let first = auth.log_in("alice", "pw").unwrap();
    let second = auth.log_in("alice", "pw").unwrap();

    assert_eq!(first.entity_id, second.entity_id);
    assert_ne!(first.token, second.token);
}

#[test]
fn duplicate_registration_fails() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "pw").unwrap();

    let result = auth.register("alice", "other");
    match result {
        Err(AuthError::UserExists { username }) => assert_eq!(username, "alice"),
        _ => panic!("Expected UserExists error"),
    }
}

#[test]
fn wrong_password_fails() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "pw").unwrap();

    let result = auth.log_in("alice", "nope");
    match result {
        Err(AuthError::InvalidCredentials { .. }) => {}
        _ => panic!("Expected InvalidCredentials error"),
    }
}

#[test]
fn refresh_token_is_single_use() {
    let mut auth = MemoryAuthenticator::new();
    auth.register("alice", "pw").unwrap();
    let ticket = auth.log_in("alice", "pw").unwrap();

    let refreshed = auth.refresh_log_in(&ticket.refresh_token).unwrap();
    assert_eq!(refreshed.entity_id, ticket.entity_id);

    let result = auth.refresh_log_in(&ticket.refresh_token);
    match result {
        Err(AuthError::InvalidRefreshToken) => {}
        _ => panic!("Expected InvalidRefreshToken error"),
    }
}
