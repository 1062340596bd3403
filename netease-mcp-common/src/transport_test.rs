//! Unit tests for transport configuration.

use super::transport::{Transport, TransportArgs, TransportMode};
use clap::Parser;

#[derive(Parser, Debug)]
struct TestArgs {
    #[command(flatten)]
    transport: TransportArgs,
}

#[test]
fn test_transport_default_is_sse_on_3000() {
    let transport = Transport::default();
    assert!(transport.is_sse());
    assert!(!transport.is_stdio());
    assert_eq!(transport.port(), Some(3000));
}

#[test]
fn test_transport_stdio_constructor() {
    let transport = Transport::stdio();
    assert!(transport.is_stdio());
    assert_eq!(transport.port(), None);
    assert_eq!(transport.to_string(), "stdio");
}

#[test]
fn test_transport_sse_constructor() {
    let transport = Transport::sse(8080);
    assert!(transport.is_sse());
    assert_eq!(transport.port(), Some(8080));
    assert_eq!(transport.to_string(), "sse (port 8080)");
}

#[test]
fn test_transport_args_default() {
    let args = TransportArgs::default();
    assert_eq!(args.transport, TransportMode::Sse);
    assert_eq!(args.port, 3000);
    assert!(args.into_transport().is_sse());
}

#[test]
fn test_transport_args_into_transport_stdio_ignores_port() {
    let args = TransportArgs {
        transport: TransportMode::Stdio,
        port: 9000,
    };
    let transport = args.into_transport();
    assert!(transport.is_stdio());
    assert_eq!(transport.port(), None);
}

#[test]
fn test_transport_args_into_transport_sse() {
    let args = TransportArgs {
        transport: TransportMode::Sse,
        port: 4000,
    };
    assert_eq!(args.into_transport(), Transport::Sse { port: 4000 });
}

#[test]
fn test_cli_parses_transport_case_insensitively() {
    let args = TestArgs::try_parse_from(["netease-mcp", "--transport", "STDIO", "--port", "4100"])
        .unwrap();
    assert_eq!(args.transport.transport, TransportMode::Stdio);
    assert_eq!(args.transport.port, 4100);
}

#[test]
fn test_cli_rejects_unknown_transport() {
    let err = TestArgs::try_parse_from(["netease-mcp", "--transport", "http"]).unwrap_err();
    assert!(err.to_string().contains("sse, stdio"));
}

#[test]
fn test_transport_equality() {
    assert_eq!(Transport::Stdio, Transport::Stdio);
    assert_eq!(Transport::Sse { port: 8080 }, Transport::Sse { port: 8080 });
    assert_ne!(Transport::Stdio, Transport::Sse { port: 8080 });
    assert_ne!(Transport::Sse { port: 8080 }, Transport::Sse { port: 9000 });
}
