//! The firmware-facing surface: opaque handles, capability identifiers and
//! the registry trait that binds the two together.
//!
//! Firmware exposes devices as a flat directory of handles, each tagged with
//! the capabilities (protocols) it implements. Rather than talking to a live
//! global directory, everything downstream goes through [`HandleDirectory`],
//! which a test harness or simulator can implement just as well as a real
//! firmware shim.

use core::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;

/// Opaque firmware-issued device identifier. Not owned by this code;
/// only ever compared and passed back to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    pub const fn new(raw: u32) -> Self {
        Handle(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle {:#06x}", self.0)
    }
}

/// GUID-style identifier naming a capability a handle may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId([u8; 16]);

impl CapabilityId {
    pub const fn new(bytes: [u8; 16]) -> Self {
        CapabilityId(bytes)
    }
}

/// The two capabilities this diagnostic cares about, carrying the firmware's
/// wire-format identifier bytes.
pub mod capability {
    use super::CapabilityId;

    /// PCI configuration-space access (EFI_PCI_IO_PROTOCOL).
    pub const PCI_IO: CapabilityId = CapabilityId::new([
        0x00, 0xb2, 0xf5, 0x4c, 0xb8, 0x68, 0xa5, 0x4c, 0x9e, 0xec, 0xb2, 0x3e, 0x3f, 0x50, 0x02,
        0x9a,
    ]);

    /// Block-storage access (EFI_BLOCK_IO_PROTOCOL).
    pub const BLOCK_IO: CapabilityId = CapabilityId::new([
        0x21, 0x5b, 0x4e, 0x96, 0x59, 0x64, 0xd2, 0x11, 0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72,
        0x3b,
    ]);
}

/// Handle sequence as returned by a directory query. Order is
/// firmware-defined and not stable across runs.
pub type HandleList = SmallVec<[Handle; 8]>;

/// Zero-based logical block address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Lba(u64);

impl Lba {
    pub const fn new(value: u64) -> Self {
        Lba(value)
    }

    pub const fn zero() -> Self {
        Lba(0)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Lba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The handle directory itself failed to answer a query. Distinct from a
/// handle merely lacking a capability, which shows up as a `None` binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryFault;

impl fmt::Display for DirectoryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle directory unavailable")
    }
}

/// A configuration-space read was refused by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFault;

impl fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration space read failed")
    }
}

/// Failure modes of a block transfer, mirroring what the firmware reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFault {
    /// The device reported a hard error.
    Device,
    /// The supplied media identifier no longer matches the inserted media.
    MediaChanged,
    /// No media in the device.
    NoMedia,
    /// Byte count was not a whole number of sectors.
    BadBufferSize,
}

impl fmt::Display for BlockFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockFault::Device => write!(f, "device error"),
            BlockFault::MediaChanged => write!(f, "media changed"),
            BlockFault::NoMedia => write!(f, "no media"),
            BlockFault::BadBufferSize => write!(f, "transfer size not a multiple of the sector size"),
        }
    }
}

bitflags! {
    /// Media characteristics reported alongside the media descriptor.
    pub struct MediaFlags: u8 {
        const MEDIA_PRESENT     = 1 << 0;
        const REMOVABLE         = 1 << 1;
        const READ_ONLY         = 1 << 2;
        const LOGICAL_PARTITION = 1 << 3;
    }
}

/// Snapshot of a block device's media descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    /// Identifier of the currently inserted media; handed back on every
    /// transfer so the device can reject stale requests.
    pub media_id: u32,
    /// Sector size in bytes.
    pub block_size: u32,
    /// Last addressable logical block.
    pub last_block: u64,
    pub flags: MediaFlags,
}

/// PCI configuration-space access bound to one handle.
pub trait PciConfig {
    /// Read `buf.len()` bytes of configuration space starting at `offset`.
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<(), ConfigFault>;
}

/// Block-storage access bound to one handle. All transfers are synchronous;
/// the call returns only once the device has completed or failed the request.
pub trait BlockIo {
    fn media(&self) -> MediaInfo;

    /// Read whole sectors starting at `lba` into `buf`. `buf.len()` must be
    /// a multiple of the media's sector size.
    fn read_blocks(&self, media_id: u32, lba: Lba, buf: &mut [u8]) -> Result<(), BlockFault>;
}

/// The capability registry: who exists, and what each handle can do.
///
/// Bindings are looked up on demand and are only as durable as the directory
/// behind them; nothing here is cached across calls.
pub trait HandleDirectory {
    /// All handles currently advertising `capability`, in firmware order.
    fn locate(&self, capability: CapabilityId) -> Result<HandleList, DirectoryFault>;

    /// Bind configuration-space access on `handle`, if it exposes any.
    fn pci_config(&self, handle: Handle) -> Option<&dyn PciConfig>;

    /// Bind block-storage access on `handle`, if it exposes any.
    fn block_io(&self, handle: Handle) -> Option<&dyn BlockIo>;
}
