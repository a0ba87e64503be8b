//! Server and client modes, and the stdin console both of them run.

use std::io::{self, BufRead, Write};

use reelsync_net::{parse_command_line, ConnectionInfo, Role, Session};
use reelsync_types::Viewer;

pub type ViewerSession = Session<Viewer>;

// =============================================================================
// Server Mode
// =============================================================================

pub fn run_server(session: &ViewerSession, port: u16) -> io::Result<()> {
    let addr = session.listen(("0.0.0.0", port))?;
    log::info!("Server listening on {}", addr);
    println!("reelsync: listening on {}", addr);
    run_console(session)
}

// =============================================================================
// Client Mode
// =============================================================================

pub fn run_client(session: &ViewerSession, host: &str, port: u16) -> io::Result<()> {
    let conn = session
        .connect(host, port)
        .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e))?;
    log::info!("Connected to {}:{} via {}", host, port, conn.peer());
    println!("reelsync: connected to {}", conn.peer());
    run_console(session)
}

// =============================================================================
// Console
// =============================================================================

#[derive(Debug, PartialEq)]
pub enum ConsoleReply {
    Print(String),
    Quit,
    Nothing,
}

/// Read commands from stdin until EOF or `:quit`, then close the session.
fn run_console(session: &ViewerSession) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        match execute(session, &line?) {
            ConsoleReply::Quit => break,
            ConsoleReply::Print(text) => {
                writeln!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            ConsoleReply::Nothing => {}
        }
    }

    session.shutdown();
    Ok(())
}

/// Handle one console line. Lines starting with `:` are console commands;
/// anything else is a protocol command published as a local edit.
pub fn execute(session: &ViewerSession, input: &str) -> ConsoleReply {
    let input = input.trim();
    match input {
        "" => ConsoleReply::Nothing,
        ":quit" | ":q" => ConsoleReply::Quit,
        ":state" => match serde_json::to_string_pretty(&session.snapshot()) {
            Ok(json) => ConsoleReply::Print(json),
            Err(e) => ConsoleReply::Print(format!("error: {}", e)),
        },
        ":peers" => {
            let peers = session.connections();
            if peers.is_empty() {
                ConsoleReply::Print("no peers".into())
            } else {
                let lines: Vec<String> = peers.iter().map(describe).collect();
                ConsoleReply::Print(lines.join("\n"))
            }
        }
        _ if input.starts_with(':') => {
            ConsoleReply::Print(format!("unknown console command {}", input))
        }
        _ => match parse_command_line(input) {
            Ok(command) => match session.publish(&command) {
                Ok(n) => {
                    log::debug!("published {} to {} peers", command.name(), n);
                    ConsoleReply::Nothing
                }
                Err(e) => ConsoleReply::Print(format!("rejected: {}", e)),
            },
            Err(e) => ConsoleReply::Print(format!("error: {}", e)),
        },
    }
}

fn describe(info: &ConnectionInfo) -> String {
    let role = match info.role {
        Role::Server => "incoming",
        Role::Client => "outgoing",
    };
    format!("{} {} {} {:?}", info.id, role, info.peer, info.state)
}
