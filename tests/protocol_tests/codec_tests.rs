//! Codec Tests
//!
//! Tests for request and response encoding/decoding.

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use kvpipe::protocol::{
    decode_request, encode_request, encode_response, parse_response, read_request,
    write_response, ReplyKind, Request, Response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use kvpipe::ClientError;

fn encode(request: &Request) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_request(request, &mut buf).unwrap();
    buf.to_vec()
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let request = Request::Get {
        key: Bytes::from_static(b"hello"),
    };
    let decoded = decode_request(&encode(&request)).unwrap();

    assert_eq!(decoded, request);
}

#[test]
fn test_encode_decode_set() {
    let request = Request::Set {
        key: Bytes::from_static(b"mykey"),
        value: Bytes::from_static(b"myvalue"),
    };
    let decoded = decode_request(&encode(&request)).unwrap();

    match decoded {
        Request::Set { key, value } => {
            assert_eq!(&key[..], b"mykey");
            assert_eq!(&value[..], b"myvalue");
        }
        _ => panic!("Expected SET request"),
    }
}

#[test]
fn test_encode_decode_incr() {
    let request = Request::Incr {
        key: Bytes::from_static(b"counter"),
    };
    let decoded = decode_request(&encode(&request)).unwrap();

    assert_eq!(decoded, request);
}

#[test]
fn test_encode_decode_empty_payload_requests() {
    for request in [Request::Ping, Request::Quit, Request::FlushAll] {
        let encoded = encode(&request);
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode_request(&encoded).unwrap(), request);
    }
}

#[test]
fn test_encode_decode_empty_value() {
    let request = Request::Set {
        key: Bytes::from_static(b"key"),
        value: Bytes::new(),
    };
    let decoded = decode_request(&encode(&request)).unwrap();

    match decoded {
        Request::Set { key, value } => {
            assert_eq!(&key[..], b"key");
            assert!(value.is_empty());
        }
        _ => panic!("Expected SET request"),
    }
}

#[test]
fn test_encode_decode_binary_data() {
    // Test with binary data containing null bytes and high bytes
    let binary_key = Bytes::from(vec![0x00, 0x01, 0xFF, 0xFE, 0x80]);
    let binary_value: Bytes = (0..=255).collect::<Vec<u8>>().into();

    let request = Request::Set {
        key: binary_key.clone(),
        value: binary_value.clone(),
    };
    let decoded = decode_request(&encode(&request)).unwrap();

    match decoded {
        Request::Set { key, value } => {
            assert_eq!(key, binary_key);
            assert_eq!(value, binary_value);
        }
        _ => panic!("Expected SET request"),
    }
}

#[test]
fn test_encode_request_wire_layout() {
    let encoded = encode(&Request::Get {
        key: Bytes::from_static(b"ab"),
    });

    assert_eq!(encoded, vec![0x01, 0, 0, 0, 6, 0, 0, 0, 2, b'a', b'b']);
}

#[test]
fn test_encode_appends_to_existing_buffer() {
    let mut buf = BytesMut::new();
    encode_request(&Request::Ping, &mut buf).unwrap();
    encode_request(&Request::Ping, &mut buf).unwrap();

    assert_eq!(buf.len(), 2 * HEADER_SIZE);
}

#[test]
fn test_encode_oversized_payload_fails_cleanly() {
    let request = Request::Set {
        key: Bytes::from_static(b"big"),
        value: Bytes::from(vec![0u8; MAX_PAYLOAD_SIZE as usize]),
    };
    let mut buf = BytesMut::new();

    let result = encode_request(&request, &mut buf);

    assert!(matches!(result, Err(ClientError::Encode(_))));
    assert!(buf.is_empty());
}

// =============================================================================
// Request Error Handling Tests
// =============================================================================

#[test]
fn test_decode_incomplete_header() {
    let result = decode_request(&[0x01, 0x00]);

    assert!(matches!(result, Err(ClientError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut encoded = encode(&Request::Get {
        key: Bytes::from_static(b"hello"),
    });
    encoded.truncate(encoded.len() - 2);

    assert!(matches!(decode_request(&encoded), Err(ClientError::Protocol(_))));
}

#[test]
fn test_decode_unknown_command() {
    let result = decode_request(&[0x7F, 0, 0, 0, 0]);

    match result {
        Err(ClientError::Protocol(msg)) => assert!(msg.contains("0x7f")),
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_decode_ping_with_payload_rejected() {
    let result = decode_request(&[0x04, 0, 0, 0, 1, 0xAA]);

    assert!(matches!(result, Err(ClientError::Protocol(_))));
}

#[test]
fn test_decode_key_length_exceeds_payload() {
    // GET with key_len = 10 but only 2 key bytes
    let bytes = [0x01, 0, 0, 0, 6, 0, 0, 0, 10, b'a', b'b'];

    assert!(matches!(decode_request(&bytes), Err(ClientError::Protocol(_))));
}

// =============================================================================
// Response Parsing Tests
// =============================================================================

#[test]
fn test_parse_response_kinds() {
    let responses = [
        Response::status("OK"),
        Response::nil(),
        Response::error("ERR boom"),
        Response::integer(-42),
        Response::bulk(Bytes::from_static(b"value")),
    ];

    let mut buf = BytesMut::new();
    for response in &responses {
        buf.extend_from_slice(&encode_response(response));
    }

    for expected in &responses {
        let parsed = parse_response(&mut buf).unwrap().unwrap();
        assert_eq!(&parsed, expected);
    }
    assert!(buf.is_empty());
    assert_eq!(parse_response(&mut buf).unwrap(), None);
}

#[test]
fn test_parse_response_waits_for_complete_frame() {
    let encoded = encode_response(&Response::bulk(Bytes::from_static(b"abcdef")));
    let mut buf = BytesMut::new();

    buf.extend_from_slice(&encoded[..3]);
    assert_eq!(parse_response(&mut buf).unwrap(), None);

    buf.extend_from_slice(&encoded[3..8]);
    assert_eq!(parse_response(&mut buf).unwrap(), None);
    assert_eq!(buf.len(), 8);

    buf.extend_from_slice(&encoded[8..]);
    let parsed = parse_response(&mut buf).unwrap().unwrap();
    assert_eq!(parsed.kind, ReplyKind::Bulk);
    assert_eq!(&parsed.payload[..], b"abcdef");
}

#[test]
fn test_parse_response_unknown_kind() {
    let mut buf = BytesMut::from(&[0x09, 0, 0, 0, 0][..]);

    assert!(matches!(parse_response(&mut buf), Err(ClientError::Protocol(_))));
}

#[test]
fn test_parse_response_oversized_length() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0x04]);
    buf.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    assert!(matches!(parse_response(&mut buf), Err(ClientError::Protocol(_))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_read_request_from_stream() {
    let mut stream = Vec::new();
    stream.extend_from_slice(&encode(&Request::Incr {
        key: Bytes::from_static(b"a"),
    }));
    stream.extend_from_slice(&encode(&Request::Quit));

    let mut cursor = Cursor::new(stream);
    assert_eq!(
        read_request(&mut cursor).unwrap(),
        Request::Incr {
            key: Bytes::from_static(b"a")
        }
    );
    assert_eq!(read_request(&mut cursor).unwrap(), Request::Quit);
    assert!(matches!(read_request(&mut cursor), Err(ClientError::Io(_))));
}

#[test]
fn test_write_response_to_stream() {
    let mut out = Vec::new();
    write_response(&mut out, &Response::integer(7)).unwrap();

    let mut buf = BytesMut::from(&out[..]);
    assert_eq!(parse_response(&mut buf).unwrap(), Some(Response::integer(7)));
}
