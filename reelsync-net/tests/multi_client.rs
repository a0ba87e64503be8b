mod common;

use std::thread;
use std::time::Duration;

use common::RawClient;
use reelsync_net::{parse_command_line, ConnectionState, NetConfig, Session};
use reelsync_types::{Command, Viewer, ViewerState};

#[test]
fn test_concurrent_gain_updates_settle_on_one_sent_value() {
    let (session, addr) = common::serve(Viewer::new());
    let gains: Vec<f32> = (1..=8).map(|i| i as f32 * 0.5).collect();

    let handles: Vec<_> = gains
        .iter()
        .map(|&gain| {
            thread::spawn(move || {
                let mut client = RawClient::connect(addr).unwrap();
                client.send(&format!("Gain {}", gain)).unwrap();
                // Other peers' relays may arrive before our own OK
                loop {
                    let line = client.recv().unwrap();
                    if line == "OK" {
                        return;
                    }
                    assert!(line.starts_with("Gain "), "unexpected line {:?}", line);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let gain = session.snapshot().display.gain;
    assert!(gains.contains(&gain), "final gain {} was never sent", gain);
}

#[test]
fn test_sync_reply_and_relays_arrive_in_apply_order() {
    let (session, addr) = common::serve(common::populated_viewer());

    let mut editor = RawClient::connect(addr).unwrap();
    let mut watcher = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    let edits = thread::spawn(move || {
        for i in 0..200 {
            editor.send(&format!("Gain {}", 1.0 + i as f32 / 64.0)).unwrap();
        }
        for _ in 0..200 {
            assert_eq!(editor.recv().unwrap(), "OK");
        }
    });
    // Ask for state several times while the edits are landing
    for _ in 0..5 {
        watcher.send("sync_image").unwrap();
        thread::sleep(Duration::from_millis(2));
    }
    edits.join().unwrap();

    // Relays, scripts and later relays, replayed in arrival order
    let mut replica = Viewer::new();
    while let Some(line) = watcher.recv_timeout(Duration::from_millis(300)).unwrap() {
        let command = parse_command_line(&line).unwrap();
        replica
            .apply(&command)
            .unwrap_or_else(|e| panic!("{:?} rejected: {}", line, e));
    }
    assert_eq!(replica.snapshot(), session.snapshot());
}

#[test]
fn test_disconnect_unregisters_peer() {
    let (session, addr) = common::serve(Viewer::new());

    let alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    drop(alice);
    common::wait_for_peers(&session, 1);

    session.publish(&Command::Seek(5)).unwrap();
    assert_eq!(bob.recv().unwrap(), "seek 5");
}

#[test]
fn test_shutdown_closes_every_peer() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    session.shutdown();
    assert!(session.connections().is_empty());
    assert!(alice.recv().is_err());
    assert!(bob.recv().is_err());
}

#[test]
fn test_idle_peer_is_dropped_when_configured() {
    let config = NetConfig {
        idle_timeout: Some(Duration::from_millis(150)),
        ..NetConfig::default()
    };
    let (session, addr) = common::serve_with(Viewer::new(), config);

    let mut quiet = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 1);

    assert!(common::wait_until(Duration::from_secs(3), || session
        .connections()
        .is_empty()));
    assert!(quiet.recv().is_err());
}

#[test]
fn test_connections_report_role_and_state() {
    let (server, addr) = common::serve(Viewer::new());
    let client = Session::new(Viewer::new(), NetConfig::default());
    client.connect("127.0.0.1", addr.port()).unwrap();
    common::wait_for_peers(&server, 1);

    let info = &client.connections()[0];
    assert_eq!(info.role, reelsync_net::Role::Client);
    assert_eq!(info.state, ConnectionState::Open);
    assert_eq!(info.peer, addr);

    let info = &server.connections()[0];
    assert_eq!(info.role, reelsync_net::Role::Server);
}
