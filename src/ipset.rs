use crate::errors::BreakerError;
use std::fmt;
use std::net::SocketAddrV4;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionOp {
    Add,
    Remove,
}

impl ExclusionOp {
    /// The ipset sub-command for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionOp::Add => "add",
            ExclusionOp::Remove => "del",
        }
    }
}

impl fmt::Display for ExclusionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named set of `ip,port` entries that firewall rules consult to block traffic.
pub trait ExclusionSet {
    fn add(&self, endpoint: SocketAddrV4) -> Result<(), BreakerError>;
    fn remove(&self, endpoint: SocketAddrV4) -> Result<(), BreakerError>;
}

/// Used when no set name is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExclusion;

impl ExclusionSet for NoExclusion {
    fn add(&self, _endpoint: SocketAddrV4) -> Result<(), BreakerError> {
        Ok(())
    }

    fn remove(&self, _endpoint: SocketAddrV4) -> Result<(), BreakerError> {
        Ok(())
    }
}

/// Updates a kernel ipset through the `ipset` command line tool.
#[derive(Debug, Clone)]
pub struct Ipset {
    name: String,
    program: PathBuf,
}

impl Ipset {
    pub fn new(name: impl Into<String>) -> Self {
        Ipset::with_program(name, "ipset")
    }

    pub fn with_program(name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Ipset {
            name: name.into(),
            program: program.into(),
        }
    }

    /// Arguments for `ipset`; `-!` makes re-adding or deleting a missing entry a no-op.
    pub fn args(&self, op: ExclusionOp, endpoint: SocketAddrV4) -> Vec<String> {
        vec![
            "-!".to_string(),
            op.as_str().to_string(),
            self.name.clone(),
            format!("{},{}", endpoint.ip(), endpoint.port()),
        ]
    }

    fn update(&self, op: ExclusionOp, endpoint: SocketAddrV4) -> Result<(), BreakerError> {
        let failure = |reason: String| BreakerError::ExclusionHookFailure { op, endpoint, reason };

        let status = Command::new(&self.program)
            .args(self.args(op, endpoint))
            .status()
            .map_err(|err| failure(format!("cannot run {}: {}", self.program.display(), err)))?;

        if !status.success() {
            return Err(failure(format!("{} exited with {}", self.program.display(), status)));
        }
        Ok(())
    }
}

impl ExclusionSet for Ipset {
    fn add(&self, endpoint: SocketAddrV4) -> Result<(), BreakerError> {
        self.update(ExclusionOp::Add, endpoint)
    }

    fn remove(&self, endpoint: SocketAddrV4) -> Result<(), BreakerError> {
        self.update(ExclusionOp::Remove, endpoint)
    }
}

// -- Unit tests --
