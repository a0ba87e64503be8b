mod common;

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::time::{Duration, Instant};

use reelsync_net::{ConnectError, ConnectionState, NetConfig, Session};
use reelsync_types::Viewer;

/// A loopback address nothing is listening on.
fn refused_endpoint() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// A non-routable address: SYNs sent there are never answered, so only the
/// per-attempt timeout ends the attempt. Hosts without a route to it fail
/// the attempt immediately instead, which the tests also accept.
fn unanswered_endpoint() -> SocketAddr {
    "10.255.255.1:9".parse().unwrap()
}

const ATTEMPT_TIMEOUT: Duration = Duration::from_millis(300);

fn quick_config() -> NetConfig {
    NetConfig {
        connect_timeout: Duration::from_secs(2),
        ..NetConfig::default()
    }
}

#[test]
fn test_last_endpoint_wins_after_refusals() {
    let (server, addr) = common::serve(Viewer::new());
    let client = Session::new(Viewer::new(), quick_config());

    let mut endpoints: Vec<SocketAddr> = (0..3).map(|_| refused_endpoint()).collect();
    endpoints.push(addr);

    let mut connector = client.connector();
    let conn = connector.connect_endpoints(&endpoints).unwrap();

    assert_eq!(connector.state(), ConnectionState::Open);
    assert_eq!(connector.attempts(), endpoints.as_slice());
    assert_eq!(conn.peer(), addr);
    common::wait_for_peers(&server, 1);
}

#[test]
fn test_first_success_stops_the_search() {
    let (server, addr) = common::serve(Viewer::new());
    let client = Session::new(Viewer::new(), quick_config());

    let endpoints = vec![addr, refused_endpoint(), refused_endpoint()];
    let mut connector = client.connector();
    connector.connect_endpoints(&endpoints).unwrap();

    assert_eq!(connector.attempts(), &endpoints[..1]);
    common::wait_for_peers(&server, 1);
    assert_eq!(client.connections().len(), 1);
}

#[test]
fn test_exhausted_endpoints_never_open() {
    let client = Session::new(Viewer::new(), quick_config());
    let endpoints: Vec<SocketAddr> = (0..2).map(|_| refused_endpoint()).collect();

    let mut connector = client.connector();
    match connector.connect_endpoints(&endpoints) {
        Err(ConnectError::Exhausted { attempts }) => {
            let tried: Vec<SocketAddr> = attempts.iter().map(|(a, _)| *a).collect();
            assert_eq!(tried, endpoints);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("connected to a closed port"),
    }
    assert_eq!(connector.state(), ConnectionState::Closed);
    assert!(client.connections().is_empty());
}

#[test]
fn test_connect_by_host_and_port() {
    let (server, addr) = common::serve(Viewer::new());
    let client = Session::new(Viewer::new(), quick_config());

    let conn = client.connect("127.0.0.1", addr.port()).unwrap();
    assert!(conn.is_open());
    common::wait_for_peers(&server, 1);
}

#[test]
fn test_silent_endpoint_times_out_then_next_is_tried() {
    let (server, addr) = common::serve(Viewer::new());
    let config = NetConfig {
        connect_timeout: ATTEMPT_TIMEOUT,
        ..NetConfig::default()
    };
    let client = Session::new(Viewer::new(), config);

    let endpoints = vec![unanswered_endpoint(), addr];
    let mut connector = client.connector();
    let started = Instant::now();
    let conn = connector.connect_endpoints(&endpoints).unwrap();
    let elapsed = started.elapsed();

    assert_eq!(conn.peer(), addr);
    assert_eq!(connector.attempts(), endpoints.as_slice());
    assert!(
        elapsed < ATTEMPT_TIMEOUT + Duration::from_secs(2),
        "silent endpoint held the connector for {:?}",
        elapsed
    );
    common::wait_for_peers(&server, 1);
}

#[test]
fn test_silent_endpoint_alone_is_exhausted() {
    let config = NetConfig {
        connect_timeout: ATTEMPT_TIMEOUT,
        ..NetConfig::default()
    };
    let client = Session::new(Viewer::new(), config);
    let silent = unanswered_endpoint();

    let mut connector = client.connector();
    let started = Instant::now();
    let result = connector.connect_endpoints(&[silent]);
    let elapsed = started.elapsed();

    match result {
        Err(ConnectError::Exhausted { attempts }) => {
            assert_eq!(attempts.len(), 1);
            let (tried, error) = &attempts[0];
            assert_eq!(*tried, silent);
            if error.kind() == io::ErrorKind::TimedOut {
                assert!(elapsed >= ATTEMPT_TIMEOUT, "gave up after {:?}", elapsed);
            }
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("connected to a non-routable address"),
    }
    assert!(elapsed < ATTEMPT_TIMEOUT + Duration::from_secs(2));
    assert_eq!(connector.state(), ConnectionState::Closed);
}
