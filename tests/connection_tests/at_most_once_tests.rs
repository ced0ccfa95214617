//! At-most-once dispatch tests
//!
//! These tests verify:
//! - Commands execute exactly once on the happy path
//! - An encode failure sends nothing and does not disturb its neighbours
//! - A transport torn down mid-encode fails the command without sending it
//! - A decode failure is reported, never retried
//! - A disconnected connection rejects new commands

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use crossbeam::channel::bounded;
use kvpipe::command::output;
use kvpipe::protocol::encode_request;
use kvpipe::{commands, ClientError, CommandPhase, ConnectionState};

use common::{connect, start_server, wait_until, KEY};

const WAIT: Duration = Duration::from_secs(2);

// =============================================================================
// Connection Basics
// =============================================================================

#[test]
fn test_connection_is_connected_after_connect() {
    let server = start_server();
    let connection = connect(&server);

    assert_eq!(connection.state(), ConnectionState::Connected);
    assert!(connection.is_open());

    connection.close();
    assert_eq!(connection.state(), ConnectionState::Closed);
}

#[test]
fn test_no_watchdog_without_auto_reconnect() {
    let server = start_server();
    let connection = connect(&server);

    assert!(!connection.has_watchdog());
}

#[test]
fn test_basic_operations() {
    let server = start_server();
    let connection = connect(&server);

    assert_eq!(connection.execute(commands::set(KEY, "1")).unwrap(), "OK");
    assert_eq!(
        connection.execute(commands::get(KEY)).unwrap(),
        Some("1".to_string())
    );
}

#[test]
fn test_no_buffered_commands_after_execute() {
    let server = start_server();
    let connection = connect(&server);

    connection.execute(commands::set(KEY, "1")).unwrap();

    assert_eq!(connection.buffered_len(), 0);
    assert_eq!(connection.in_flight_len(), 0);
}

#[test]
fn test_command_is_executed_once() {
    let server = start_server();
    let connection = connect(&server);

    connection.execute(commands::set(KEY, "1")).unwrap();

    for expected in 2..=4 {
        assert_eq!(connection.execute(commands::incr(KEY)).unwrap(), expected);
        assert_eq!(
            connection.execute(commands::get(KEY)).unwrap(),
            Some(expected.to_string())
        );
    }
}

// =============================================================================
// Encode Failures
// =============================================================================

#[test]
fn test_encode_failure_is_isolated() {
    let server = start_server();
    let connection = connect(&server);
    connection.execute(commands::set(KEY, "1")).unwrap();

    let a = connection.submit(commands::incr(KEY)).unwrap();
    let b = connection
        .submit(commands::incr(KEY).with_encoder(|_, _| {
            Err(ClientError::Encode("I want to break free".to_string()))
        }))
        .unwrap();
    let c = connection.submit(commands::incr(KEY)).unwrap();

    assert_eq!(a.await_result().unwrap(), 2);
    assert_eq!(c.await_result().unwrap(), 3);

    assert!(b.await_done(WAIT));
    assert!(!b.is_cancelled());
    assert!(matches!(b.try_result(), Some(Err(ClientError::Encode(_)))));
    // Never reached the ledger
    assert_eq!(b.phase(), CommandPhase::Encoding);

    assert_eq!(
        connection.execute(commands::get(KEY)).unwrap(),
        Some("3".to_string())
    );
    assert_eq!(connection.buffered_len(), 0);
    assert_eq!(connection.in_flight_len(), 0);
}

#[test]
fn test_encode_error_of_other_kind_is_reported_as_encode() {
    let server = start_server();
    let connection = connect(&server);

    let handle = connection
        .submit(commands::ping().with_encoder(|_, _| Err(ClientError::Protocol("bad".to_string()))))
        .unwrap();

    assert!(matches!(handle.await_result(), Err(ClientError::Encode(_))));
    assert!(connection.is_open());
}

// =============================================================================
// Transport Torn Down During Encode
// =============================================================================

#[test]
fn test_command_not_sent_when_transport_closes_during_encode() {
    let server = start_server();
    let connection = connect(&server);
    let verification = connect(&server);

    connection.execute(commands::set(KEY, "1")).unwrap();
    assert_eq!(
        verification.execute(commands::get(KEY)).unwrap(),
        Some("1".to_string())
    );

    let (entered_tx, entered_rx) = bounded::<()>(1);
    let (release_tx, release_rx) = bounded::<()>(1);
    let blocked = commands::incr(KEY).with_encoder(move |request, buf| {
        let _ = entered_tx.send(());
        let _ = release_rx.recv();
        encode_request(request, buf)
    });

    let handle = connection.submit(blocked).unwrap();
    entered_rx.recv_timeout(WAIT).unwrap();

    connection.disconnect();

    assert!(!handle.is_cancelled());
    assert!(!handle.is_done());
    release_tx.send(()).unwrap();

    assert!(handle.await_done(WAIT));
    assert!(!handle.is_cancelled());
    let err = handle.try_result().unwrap().unwrap_err();
    assert!(err.is_connection_closed(), "unexpected error: {err}");
    assert_ne!(handle.phase(), CommandPhase::InFlight);

    // The increment never reached the server
    assert_eq!(
        verification.execute(commands::get(KEY)).unwrap(),
        Some("1".to_string())
    );

    assert!(wait_until(WAIT, || connection.state() == ConnectionState::Disconnected));
    assert_eq!(connection.buffered_len(), 0);
    assert_eq!(connection.in_flight_len(), 0);
}

// =============================================================================
// Decode Failures
// =============================================================================

#[test]
fn test_decode_failure_is_not_retried() {
    let server = start_server();
    let connection = connect(&server);
    let verification = connect(&server);

    connection.execute(commands::set(KEY, "1")).unwrap();

    // INCR answers with an integer; decoding it as a status must fail
    let handle = connection
        .submit(commands::incr(KEY).with_decoder(output::status))
        .unwrap();

    assert!(handle.await_done(WAIT));
    assert!(!handle.is_cancelled());
    assert!(matches!(handle.await_result(), Err(ClientError::Decode(_))));

    // Applied once server-side, not rolled back, not resent
    assert_eq!(
        verification.execute(commands::get(KEY)).unwrap(),
        Some("2".to_string())
    );
    assert_eq!(
        connection.execute(commands::get(KEY)).unwrap(),
        Some("2".to_string())
    );
    assert!(connection.is_open());
}

// =============================================================================
// After Disconnect
// =============================================================================

#[test]
fn test_no_commands_executed_after_quit() {
    let server = start_server();
    let connection = connect(&server);

    assert_eq!(connection.execute(commands::quit()).unwrap(), "OK");
    assert!(wait_until(WAIT, || !connection.is_open()));
    assert_eq!(connection.state(), ConnectionState::Disconnected);

    let err = connection.submit(commands::incr(KEY)).unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
    assert!(err.to_string().contains("not connected"));
    assert_eq!(connection.buffered_len(), 0);

    connection.close();
    assert!(server.store().get(KEY.as_bytes()).is_none());
}

#[test]
fn test_no_commands_executed_after_async_quit() {
    let server = start_server();
    let connection = connect(&server);

    let quit = connection.submit(commands::quit()).unwrap();
    assert!(wait_until(WAIT, || !connection.is_open()));

    assert!(matches!(
        connection.submit(commands::incr(KEY)),
        Err(ClientError::NotConnected)
    ));
    assert_eq!(quit.await_result().unwrap(), "OK");
    assert!(server.store().get(KEY.as_bytes()).is_none());
}
