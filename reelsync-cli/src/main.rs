mod config;
mod network;

use std::fs::File;
use std::path::PathBuf;

use reelsync_net::Session;
use reelsync_types::Viewer;

const USAGE: &str = "usage: reelsync-cli [--port N] [--host H] [--config PATH] [--verbose|-v]";

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelsync")
        .join("reelsync.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path)
        .or_else(|_| File::create(std::env::temp_dir().join("reelsync.log")))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("reelsync: cannot create log file: {}", e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(log_level, Config::default(), log_file) {
        eprintln!("reelsync: failed to initialize logger: {}", e);
        return;
    }

    log::info!("reelsync starting (log level: {:?})", log_level);
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    port: Option<u16>,
    host: Option<String>,
    config: Option<PathBuf>,
    verbose: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--verbose" | "-v" => parsed.verbose = true,
            "--port" => {
                let value = iter.next().ok_or("--port needs a value")?;
                parsed.port = Some(value.parse().map_err(|_| format!("invalid port {:?}", value))?);
            }
            "--host" => {
                parsed.host = Some(iter.next().ok_or("--host needs a value")?.clone());
            }
            "--config" => {
                parsed.config = Some(PathBuf::from(iter.next().ok_or("--config needs a value")?));
            }
            other => return Err(format!("unknown argument {:?}", other)),
        }
    }
    Ok(parsed)
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("reelsync: {}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => config::Config::load_from(Some(path)),
        None => config::Config::load(),
    };
    let session = Session::new(Viewer::new(), config.net_config());
    let port = args.port.unwrap_or_else(|| config.port());

    // An explicit --port without --host always means server mode
    let host = match (&args.host, args.port) {
        (Some(host), _) => Some(host.as_str()),
        (None, Some(_)) => None,
        (None, None) => config.host(),
    };

    match host {
        Some(host) => network::run_client(&session, host, port),
        None => network::run_server(&session, port),
    }
}
