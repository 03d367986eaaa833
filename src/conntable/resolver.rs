use crate::conntable::row::{read_table, ConnectionTableRow};
use crate::conntable::{Connection, Criterion, Side};
use crate::errors::BreakerError;
use crate::observer::Observer;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub const PROC_NET_TCP: &str = "/proc/net/tcp";
pub const PROC_ROOT: &str = "/proc";

/// Looks up live connections in the kernel connection table.
#[derive(Debug, Clone)]
pub struct Resolver {
    table: PathBuf,
    proc_root: PathBuf,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(PROC_NET_TCP, PROC_ROOT)
    }
}

impl Resolver {
    pub fn new(table: impl Into<PathBuf>, proc_root: impl Into<PathBuf>) -> Self {
        Resolver {
            table: table.into(),
            proc_root: proc_root.into(),
        }
    }

    /// Find the single connection matching `criterion`. Zero or several
    /// matches are errors; the tool never guesses between candidates.
    pub fn resolve(&self, criterion: &Criterion, observer: &dyn Observer) -> Result<Connection, BreakerError> {
        let matches = match *criterion {
            Criterion::Port { port, side: Side::Local } => self.by_port(Some(port), None)?,
            Criterion::Port { port, side: Side::Remote } => self.by_port(None, Some(port))?,
            Criterion::Pid(pid) => self.by_pid(pid)?,
        };

        for conn in &matches {
            observer.connection_candidate(conn);
        }

        pick_one(matches)
    }

    /// Every row whose local port equals `local` or whose remote port equals `remote`.
    pub fn by_port(&self, local: Option<u16>, remote: Option<u16>) -> Result<Vec<Connection>, BreakerError> {
        let mut matches = Vec::new();
        for (line_no, row) in read_table(&self.table)? {
            let conn = Connection::from_row(&row, line_no)?;
            if Some(conn.local.port()) == local || Some(conn.remote.port()) == remote {
                matches.push(conn);
            }
        }
        Ok(matches)
    }

    /// Every connection whose socket inode is held open by process `pid`.
    pub fn by_pid(&self, pid: u32) -> Result<Vec<Connection>, BreakerError> {
        let socket_link = Regex::new(r"^socket:\[(\d+)\]$").expect("valid socket link pattern");

        let rows: HashMap<String, (usize, ConnectionTableRow)> = read_table(&self.table)?
            .into_iter()
            .map(|(line_no, row)| (row.inode.clone(), (line_no, row)))
            .collect();

        let fd_dir = self.proc_root.join(pid.to_string()).join("fd");
        let mut matches = Vec::new();

        for entry in fs::read_dir(&fd_dir)? {
            let entry = entry?;
            let target = match fs::read_link(entry.path()) {
                Ok(target) => target,
                // Descriptor closed while we were listing
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };

            let Some(inode) = target.to_str().and_then(|t| socket_link.captures(t)).map(|c| c[1].to_string()) else {
                continue;
            };

            if let Some((line_no, row)) = rows.get(&inode) {
                matches.push(Connection::from_row(row, *line_no)?);
            }
        }

        Ok(matches)
    }
}

fn pick_one(mut matches: Vec<Connection>) -> Result<Connection, BreakerError> {
    match matches.len() {
        0 => Err(BreakerError::ConnectionNotFound),
        1 => Ok(matches.remove(0)),
        _ => Err(BreakerError::MultipleConnectionsMatched(matches)),
    }
}

// -- Unit tests --
