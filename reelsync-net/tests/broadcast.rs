mod common;

use std::time::Duration;

use common::RawClient;
use reelsync_types::{Command, MediaRef, Viewer};

#[test]
fn test_seek_is_acked_and_relayed_to_others() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    let mut carol = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 3);

    alice.send("seek 120").unwrap();

    assert_eq!(alice.recv().unwrap(), "OK");
    assert_eq!(bob.recv().unwrap(), "seek 120");
    assert_eq!(carol.recv().unwrap(), "seek 120");
    assert!(alice.is_silent_for(Duration::from_millis(200)));
    assert_eq!(session.snapshot().frame, 120);

    // A latecomer's sync reflects the relayed seek
    let mut dave = RawClient::connect(addr).unwrap();
    dave.send("sync_image").unwrap();
    let script = dave.recv_sync_script().unwrap();
    assert!(script.contains(&"seek 120".to_string()), "script was {:?}", script);
    assert!(bob.is_silent_for(Duration::from_millis(200)));
}

#[test]
fn test_unknown_command_is_refused_without_relay() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    alice.send("Bogus 1 2 3").unwrap();
    assert_eq!(alice.recv().unwrap(), format!("Not OK {}", alice.local_addr));
    assert!(bob.is_silent_for(Duration::from_millis(200)));

    // Connection stays usable
    alice.send("Gain 2").unwrap();
    assert_eq!(alice.recv().unwrap(), "OK");
    assert_eq!(bob.recv().unwrap(), "Gain 2");
    assert_eq!(session.connections().len(), 2);
}

#[test]
fn test_application_error_is_refused() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    alice.send("ChangeImage 3").unwrap();
    assert_eq!(alice.recv().unwrap(), format!("Not OK {}", alice.local_addr));
    alice.send("Image \"/no/reel.exr\" 1 10").unwrap();
    assert_eq!(alice.recv().unwrap(), format!("Not OK {}", alice.local_addr));
    assert!(bob.is_silent_for(Duration::from_millis(200)));
}

#[test]
fn test_acknowledgements_are_not_relayed() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    alice.send("OK").unwrap();
    alice.send("Not OK 10.0.0.1:5000").unwrap();
    alice.send("").unwrap();
    assert!(alice.is_silent_for(Duration::from_millis(200)));
    assert!(bob.is_silent_for(Duration::from_millis(100)));
}

#[test]
fn test_relay_uses_canonical_form() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    alice.send("Reel dailies").unwrap();
    assert_eq!(alice.recv().unwrap(), "OK");
    assert_eq!(bob.recv().unwrap(), "CurrentReel \"dailies\"");

    alice.send("Channel 1 \"diffuse\"").unwrap();
    assert_eq!(alice.recv().unwrap(), "OK");
    assert_eq!(bob.recv().unwrap(), "Channel 1");
}

#[test]
fn test_local_publish_reaches_every_peer() {
    let (session, addr) = common::serve(Viewer::new());

    let mut alice = RawClient::connect(addr).unwrap();
    let mut bob = RawClient::connect(addr).unwrap();
    common::wait_for_peers(&session, 2);

    session
        .publish(&Command::CurrentReel("review".into()))
        .unwrap();
    session
        .publish(&Command::Image(MediaRef::new("/a b.exr", 1, 24)))
        .unwrap();

    for peer in [&mut alice, &mut bob] {
        assert_eq!(peer.recv().unwrap(), "CurrentReel \"review\"");
        assert_eq!(peer.recv().unwrap(), "Image \"/a b.exr\" 1 24");
    }

    assert!(session.publish(&Command::ChangeImage(9)).is_err());
    assert!(alice.is_silent_for(Duration::from_millis(200)));
}
