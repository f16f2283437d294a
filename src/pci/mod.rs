//! The handle enumerator: scan the directory's PCI handles and pick the
//! first IDE-class mass-storage controller.

use core::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::ProbeError;
use crate::firmware::{capability, Handle, HandleDirectory, PciConfig};

pub mod vendor;

/// Config-space offset of the 16-bit vendor / 16-bit device ID pair.
pub const VENDOR_ID_OFFSET: u8 = 0x00;
/// Config-space offset of the 3-byte class-code signature.
pub const CLASS_CODE_OFFSET: u8 = 0x09;

/// Mass-storage base class.
pub const CLASS_MASS_STORAGE: u8 = 0x01;
/// IDE controller subclass.
pub const SUBCLASS_IDE: u8 = 0x01;

/// The 3-byte class signature from configuration space. In config-space
/// order the bytes read at 0x09 are interface, subclass, base class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassCode {
    pub base: u8,
    pub sub: u8,
    pub interface: u8,
}

impl ClassCode {
    pub fn from_config_bytes(raw: [u8; 3]) -> Self {
        ClassCode {
            base: raw[2],
            sub: raw[1],
            interface: raw[0],
        }
    }

    /// Exact match on (base, subclass); the interface byte is ignored,
    /// so both native and compatibility-mode IDE controllers qualify.
    pub fn is_ide_controller(&self) -> bool {
        self.base == CLASS_MASS_STORAGE && self.sub == SUBCLASS_IDE
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}.{:02x}.{:02x}", self.base, self.sub, self.interface)
    }
}

/// 16-bit vendor and device identifiers, as read from offset 0x00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceId {
    pub vendor: u16,
    pub device: u16,
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match vendor::vendor_name(self.vendor) {
            Some(name) => write!(f, "{} {:04x}:{:04x}", name, self.vendor, self.device),
            None => write!(f, "{:04x}:{:04x}", self.vendor, self.device),
        }
    }
}

/// The enumerator's verdict: the committed handle plus what was learned
/// about it along the way.
#[derive(Debug, Clone, Copy)]
pub struct IdeController {
    pub handle: Handle,
    pub class: ClassCode,
    /// Absent when the vendor-ID read failed; the selection still stands.
    pub id: Option<DeviceId>,
}

/// Scan every handle advertising PCI access and return the first whose
/// class signature is mass-storage/IDE.
///
/// Handles that refuse a configuration binding or a class-code read are
/// skipped; an empty or failed directory query is fatal. The scan stops at
/// the first match.
pub fn find_ide_controller(
    directory: &dyn HandleDirectory,
) -> Result<IdeController, ProbeError> {
    let handles = directory.locate(capability::PCI_IO)?;
    if handles.is_empty() {
        return Err(ProbeError::Discovery);
    }
    debug!("scanning {} PCI handles", handles.len());

    for handle in handles {
        let config = match directory.pci_config(handle) {
            Some(config) => config,
            None => {
                debug!("{}: no configuration access, skipping", handle);
                continue;
            }
        };

        let mut raw = [0u8; 3];
        if config.read(CLASS_CODE_OFFSET, &mut raw).is_err() {
            debug!("{}: class code read failed, skipping", handle);
            continue;
        }

        let class = ClassCode::from_config_bytes(raw);
        trace!("{}: class {}", handle, class);
        if class.is_ide_controller() {
            return Ok(IdeController {
                handle,
                class,
                id: read_device_id(config),
            });
        }
    }

    Err(ProbeError::NotFound)
}

fn read_device_id(config: &dyn PciConfig) -> Option<DeviceId> {
    let mut raw = [0u8; 4];
    config.read(VENDOR_ID_OFFSET, &mut raw).ok()?;
    Some(DeviceId {
        vendor: LittleEndian::read_u16(&raw[0..2]),
        device: LittleEndian::read_u16(&raw[2..4]),
    })
}
