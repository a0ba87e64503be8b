#![allow(dead_code)]
//! Test harness utilities for reelsync-net integration tests.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use reelsync_net::{NetConfig, Session};
use reelsync_types::{Command, LoopMode, MediaRef, Playback, Viewer, Wipe};

/// Start a listening session on an ephemeral loopback port.
pub fn serve(viewer: Viewer) -> (Session<Viewer>, SocketAddr) {
    serve_with(viewer, NetConfig::default())
}

pub fn serve_with(viewer: Viewer, config: NetConfig) -> (Session<Viewer>, SocketAddr) {
    let session = Session::new(viewer, config);
    let addr = session.listen("127.0.0.1:0").unwrap();
    (session, addr)
}

/// A viewer with two reels, media, and non-default display settings.
pub fn populated_viewer() -> Viewer {
    use reelsync_types::ViewerState;

    let mut viewer = Viewer::new();
    for cmd in [
        Command::CurrentReel("dailies".into()),
        Command::Image(MediaRef::new("/shots/010/plate.%04d.exr", 1001, 1100)),
        Command::Image(MediaRef::new("/shots/020/comp v2.mov", 1, 480)),
        Command::CurrentReel("edit".into()),
        Command::Image(MediaRef::new("/cut/review_v9.mov", 1, 2400)),
        Command::Edl(true),
        Command::CurrentReel("dailies".into()),
        Command::ChangeImage(0),
        Command::Ics("ARRI LogC".into()),
        Command::ShowBg(true),
        Command::Wipe(Wipe::Vertical(0.5)),
        Command::Seek(1042),
        Command::Gain(1.5),
        Command::Gamma(2.2),
        Command::Channel(2),
        Command::UseLut(true),
        Command::Looping(LoopMode::PingPong),
        Command::Fps(25.0),
        Command::Playback(Playback::Forwards),
    ] {
        viewer.apply(&cmd).unwrap();
    }
    viewer
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn wait_for_peers(session: &Session<Viewer>, expected: usize) {
    assert!(
        wait_until(Duration::from_secs(3), || session.connections().len() == expected),
        "timed out waiting for {} peers (have {})",
        expected,
        session.connections().len()
    );
}

/// A raw line-oriented TCP peer for protocol-level tests.
pub struct RawClient {
    pub reader: BufReader<TcpStream>,
    pub writer: BufWriter<TcpStream>,
    pub local_addr: SocketAddr,
}

impl RawClient {
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        let local_addr = stream.local_addr()?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            local_addr,
        })
    }

    pub fn send(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }

    /// Next line without its `\n`.
    pub fn recv(&mut self) -> io::Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        if line.ends_with('\n') {
            line.pop();
        }
        Ok(line)
    }

    /// Read lines up to and including the playback command that ends a
    /// sync script.
    pub fn recv_sync_script(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        loop {
            let line = self.recv()?;
            let done = matches!(line.as_str(), "stop" | "playfwd" | "playback");
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Next line, or `None` if nothing arrives within `wait`.
    pub fn recv_timeout(&mut self, wait: Duration) -> io::Result<Option<String>> {
        self.reader.get_ref().set_read_timeout(Some(wait))?;
        let line = match self.recv() {
            Ok(line) => Ok(Some(line)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        };
        let _ = self
            .reader
            .get_ref()
            .set_read_timeout(Some(Duration::from_secs(5)));
        line
    }

    /// True if nothing arrives within `wait`.
    pub fn is_silent_for(&mut self, wait: Duration) -> bool {
        matches!(self.recv_timeout(wait), Ok(None))
    }
}
