use crate::base::neterror::NetError;

#[test]
fn test_net_error_roundtrip() {
    let original = NetError::ConnectionRefused;
    let code = original.as_i32();
    assert_eq!(code, -102);
    let converted = NetError::from(code);
    assert!(matches!(converted, NetError::ConnectionRefused));

    let timeout = NetError::ConnectionTimedOut;
    assert_eq!(NetError::from(timeout.as_i32()), timeout);
}

#[test]
fn test_unknown_error() {
    let err = NetError::from(-9999);
    assert!(matches!(err, NetError::Unknown(-9999)));
    assert_eq!(err.as_i32(), -9999);
}

#[test]
fn test_connect_error_range() {
    assert!(NetError::ConnectionRefused.is_connect_error());
    assert!(NetError::NameNotResolved.is_connect_error());
    assert!(!NetError::ConnectionClosed.is_connect_error());
    assert!(!NetError::EmptyResponse.is_connect_error());
    assert!(!NetError::Aborted.is_connect_error());
}

#[test]
fn test_from_io_kinds() {
    use std::io::{Error, ErrorKind};

    let refused = Error::new(ErrorKind::ConnectionRefused, "x");
    assert_eq!(NetError::from_io(&refused), NetError::ConnectionRefused);

    let eof = Error::new(ErrorKind::UnexpectedEof, "x");
    assert_eq!(NetError::from_io(&eof), NetError::EmptyResponse);

    let other = Error::new(ErrorKind::Other, "x");
    assert_eq!(NetError::from_io(&other), NetError::ConnectionFailed);
}
