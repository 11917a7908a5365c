use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use smugmug_backup::{AppConfig, Worker};

fn print_usage() {
    eprintln!("Usage: smugmug-backup [OPTIONS] [config.toml]");
    eprintln!();
    eprintln!("Backs up every album of the configured SmugMug account.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --version           Print version number");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("$SMUGMUG_BACKUP_CONFIG, when set, takes precedence over the path argument;");
    eprintln!("without either, the user config directory is used.");
    eprintln!("Set DEBUG=1 for debug logging; RUST_LOG overrides the level.");
}

fn init_logging() {
    let level = if env::var("DEBUG").is_ok_and(|v| v == "1") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut config_path = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--version" => {
                println!("Version: {}", env!("CARGO_PKG_VERSION"));
                return ExitCode::SUCCESS;
            }
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            flag if flag.starts_with('-') => {
                eprintln!("Error: unknown option {flag}");
                print_usage();
                return ExitCode::FAILURE;
            }
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    init_logging();

    let config_path = AppConfig::resolve_path(config_path, |key| env::var(key).ok());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let worker = match Worker::new(config) {
        Ok(worker) => worker,
        Err(e) => {
            log::error!("Can't initialize the worker: {e}");
            return ExitCode::FAILURE;
        }
    };

    let token = worker.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Received SIGINT, finishing in-flight downloads");
            token.cancel();
        }
    });

    match worker.run().await {
        Ok(summary) if summary.is_clean() => ExitCode::SUCCESS,
        Ok(_) => {
            log::warn!("Backup finished with skipped or failed items");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
