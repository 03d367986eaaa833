use clap::Parser;
use log::{error, LevelFilter};
use std::process::ExitCode;
use tcpbreak::config::{Args, Config};
use tcpbreak::errors::BreakerError;
use tcpbreak::observer::LogObserver;

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.debug { LevelFilter::Debug } else { LevelFilter::Info })
        .format_target(false)
        .init();

    let config = match Config::try_from(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match tcpbreak::run(&config, &LogObserver) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            if let BreakerError::MultipleConnectionsMatched(candidates) = &e {
                for conn in candidates {
                    error!("  {}", conn);
                }
            }
            ExitCode::FAILURE
        }
    }
}
