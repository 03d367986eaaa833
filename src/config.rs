use crate::breaker::BreakOptions;
use crate::capture::CaptureDriver;
use crate::conntable::{Criterion, Side};
use clap::{ArgGroup, Parser};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid interval: {0} (expected a positive number of seconds)")]
    BadInterval(f64),

    #[error("One of --pid or --port is required")]
    MissingCriterion,
}

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "tcpbreak")]
#[command(version)]
#[command(about = "Break an established TCP connection by forging a reset from its own traffic")]
#[command(group(ArgGroup::new("criterion").required(true).args(["pid", "port"])))]
pub struct Args {
    /// ipset to add the local endpoint to while intercepting
    ///
    /// Firewall rules matching this set should drop the connection's traffic
    /// so neither side answers while the sequence numbers are captured.
    pub ipset_name: Option<String>,

    /// Break the connection owned by this process
    #[arg(long)]
    pub pid: Option<u32>,

    /// Break the connection using this local port
    #[arg(long)]
    pub port: Option<u16>,

    /// Match `--port` against the remote port instead
    #[arg(short = 'd', long = "remote-port", requires = "port")]
    pub remote_port: bool,

    /// Capture driver; defaults to nflog when an ipset is given, raw otherwise
    #[arg(short, long, value_enum)]
    pub capture: Option<CaptureDriver>,

    /// NFLOG group to listen on
    #[arg(long, default_value_t = 0)]
    pub nflog_group: u16,

    /// Seconds between timer ticks
    #[arg(long, default_value_t = 1.0)]
    pub interval: f64,

    /// Send the reset on the first matching packet instead of waiting for the timer
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub once: bool,

    /// Log every state transition and packet
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub debug: bool,
}

/// A validated run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub criterion: Criterion,
    pub ipset_name: Option<String>,
    pub capture: CaptureDriver,
    pub nflog_group: u16,
    pub options: BreakOptions,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let criterion = match (args.pid, args.port) {
            (Some(pid), _) => Criterion::Pid(pid),
            (None, Some(port)) => Criterion::Port {
                port,
                side: if args.remote_port { Side::Remote } else { Side::Local },
            },
            (None, None) => return Err(ConfigError::MissingCriterion),
        };

        let interval = Duration::try_from_secs_f64(args.interval)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or(ConfigError::BadInterval(args.interval))?;

        let capture = args.capture.unwrap_or(match args.ipset_name {
            Some(_) => CaptureDriver::Nflog,
            None => CaptureDriver::Raw,
        });

        Ok(Config {
            criterion,
            ipset_name: args.ipset_name,
            capture,
            nflog_group: args.nflog_group,
            options: BreakOptions {
                interval,
                persist: !args.once,
            },
        })
    }
}

// -- Unit tests --
