use core::fmt;

use crate::firmware::{BlockFault, DirectoryFault};

/// Everything that can end a probe run early.
///
/// Scanning-phase capability misses are not represented here; the enumerator
/// swallows those and moves to the next handle. Every variant below is fatal
/// for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// The firmware handle directory failed, or had no PCI handles at all.
    Discovery,
    /// Every enumerated handle was scanned without a match.
    NotFound,
    /// The selected handle does not expose block storage.
    Capability,
    /// The block read failed.
    Io(BlockFault),
    /// The transfer buffer could not be allocated.
    OutOfResources,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Discovery => write!(f, "Failed to locate PCI I/O handles"),
            ProbeError::NotFound => write!(f, "No PCI IDE controller found"),
            ProbeError::Capability => write!(f, "Failed to locate Block I/O protocol"),
            ProbeError::Io(fault) => write!(f, "Failed to read sector: {}", fault),
            ProbeError::OutOfResources => write!(f, "Failed to allocate buffer"),
        }
    }
}

impl From<DirectoryFault> for ProbeError {
    fn from(_: DirectoryFault) -> Self {
        ProbeError::Discovery
    }
}

impl From<BlockFault> for ProbeError {
    fn from(fault: BlockFault) -> Self {
        ProbeError::Io(fault)
    }
}

/// Final status of a run, surfaced as the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ExitStatus {
    Success = 0,
    NotFound = 1,
    Io = 2,
    OutOfResources = 3,
    Discovery = 4,
    Capability = 5,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self == ExitStatus::Success
    }
}

impl From<ProbeError> for ExitStatus {
    fn from(error: ProbeError) -> Self {
        match error {
            ProbeError::Discovery => ExitStatus::Discovery,
            ProbeError::NotFound => ExitStatus::NotFound,
            ProbeError::Capability => ExitStatus::Capability,
            ProbeError::Io(_) => ExitStatus::Io,
            ProbeError::OutOfResources => ExitStatus::OutOfResources,
        }
    }
}
