//! Output Decoder & Builder Tests
//!
//! Tests for reply decoding and typed command construction.

use bytes::{Bytes, BytesMut};
use kvpipe::command::output;
use kvpipe::protocol::{ReplyKind, Request, Response};
use kvpipe::{commands, ClientError, Command};

// =============================================================================
// Output Decoders
// =============================================================================

#[test]
fn test_status_output() {
    assert_eq!(output::status(Response::status("OK")).unwrap(), "OK");
}

#[test]
fn test_status_output_rejects_integer() {
    let result = output::status(Response::integer(2));

    match result {
        Err(ClientError::Decode(msg)) => assert!(msg.contains("status")),
        other => panic!("Expected decode error, got {:?}", other),
    }
}

#[test]
fn test_integer_output() {
    assert_eq!(output::integer(Response::integer(i64::MIN)).unwrap(), i64::MIN);
}

#[test]
fn test_integer_output_bad_width() {
    let response = Response {
        kind: ReplyKind::Integer,
        payload: Bytes::from_static(&[1, 2, 3]),
    };

    assert!(matches!(output::integer(response), Err(ClientError::Decode(_))));
}

#[test]
fn test_error_reply_maps_to_server_error() {
    let result = output::integer(Response::error("ERR value is not an integer"));

    match result {
        Err(ClientError::Server(msg)) => assert_eq!(msg, "ERR value is not an integer"),
        other => panic!("Expected server error, got {:?}", other),
    }
}

#[test]
fn test_bulk_and_text_outputs() {
    assert_eq!(
        output::bulk(Response::bulk(Bytes::from_static(b"\x00\xff"))).unwrap(),
        Some(Bytes::from_static(b"\x00\xff"))
    );
    assert_eq!(output::bulk(Response::nil()).unwrap(), None);
    assert_eq!(
        output::text(Response::bulk(Bytes::from_static(b"hi"))).unwrap(),
        Some("hi".to_string())
    );
    assert_eq!(output::text(Response::nil()).unwrap(), None);
}

#[test]
fn test_text_output_rejects_invalid_utf8() {
    let result = output::text(Response::bulk(Bytes::from_static(b"\xff\xfe")));

    assert!(matches!(result, Err(ClientError::Decode(_))));
}

// =============================================================================
// Builders
// =============================================================================

#[test]
fn test_builders_carry_requests() {
    assert_eq!(
        commands::incr("n").request(),
        &Request::Incr {
            key: Bytes::from_static(b"n")
        }
    );
    assert_eq!(
        commands::set("k", "v").request(),
        &Request::Set {
            key: Bytes::from_static(b"k"),
            value: Bytes::from_static(b"v"),
        }
    );
    assert_eq!(commands::quit().request(), &Request::Quit);
    assert_eq!(commands::get("k").name(), "GET");
    assert_eq!(commands::flushall().name(), "FLUSHALL");
}

#[test]
fn test_custom_command_keeps_request() {
    let command: Command<i64> = Command::new(Request::Ping, output::integer)
        .with_encoder(|_, buf: &mut BytesMut| {
            buf.extend_from_slice(b"custom");
            Ok(())
        })
        .with_decoder(|_| Ok(5i64));

    assert_eq!(command.request(), &Request::Ping);
    assert_eq!(command.name(), "PING");
}
