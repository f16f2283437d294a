//! In-memory handle directory with fault injection.
//!
//! Stands in for live firmware: the demo binary probes it, and the tests use
//! it to drive every success and failure path deterministically. Devices are
//! registered in order; that order is exactly what `locate` reports.

use std::sync::atomic::{AtomicUsize, Ordering};

use byteorder::{ByteOrder, LittleEndian};

use crate::firmware::{
    capability, BlockFault, BlockIo, CapabilityId, ConfigFault, DirectoryFault, Handle,
    HandleDirectory, HandleList, Lba, MediaFlags, MediaInfo, PciConfig,
};
use crate::pci::{ClassCode, CLASS_CODE_OFFSET, VENDOR_ID_OFFSET};

const CONFIG_SPACE_LEN: usize = 64;

/// One simulated device: a handle plus whichever capabilities it exposes.
pub struct SimDevice {
    advertise_pci: bool,
    config: Option<SimConfig>,
    block: Option<SimBlock>,
}

struct SimConfig {
    space: [u8; CONFIG_SPACE_LEN],
    fail_reads: bool,
    fail_id_reads: bool,
    reads: AtomicUsize,
}

struct SimBlock {
    media: MediaInfo,
    content: Vec<u8>,
    failure: Option<BlockFault>,
}

impl SimDevice {
    /// A device advertising PCI access with the given class signature.
    pub fn pci(class: ClassCode) -> Self {
        let mut space = [0u8; CONFIG_SPACE_LEN];
        space[CLASS_CODE_OFFSET as usize] = class.interface;
        space[CLASS_CODE_OFFSET as usize + 1] = class.sub;
        space[CLASS_CODE_OFFSET as usize + 2] = class.base;
        SimDevice {
            advertise_pci: true,
            config: Some(SimConfig {
                space,
                fail_reads: false,
                fail_id_reads: false,
                reads: AtomicUsize::new(0),
            }),
            block: None,
        }
    }

    /// An IDE-class controller backed by `content` on 512-byte sectors.
    pub fn ide(content: Vec<u8>) -> Self {
        SimDevice::pci(ClassCode {
            base: 0x01,
            sub: 0x01,
            interface: 0x80,
        })
        .with_block(content)
    }

    /// Advertises PCI access but refuses the configuration binding, like a
    /// device behind a bridge that never publishes its config space.
    pub fn unbindable() -> Self {
        SimDevice {
            advertise_pci: true,
            config: None,
            block: None,
        }
    }

    /// Set the vendor/device ID words at offset 0x00.
    pub fn with_ids(mut self, vendor: u16, device: u16) -> Self {
        let config = self.config.as_mut().expect("device has no config space");
        let base = VENDOR_ID_OFFSET as usize;
        LittleEndian::write_u16(&mut config.space[base..base + 2], vendor);
        LittleEndian::write_u16(&mut config.space[base + 2..base + 4], device);
        self
    }

    /// Keep the configuration binding but fail every read through it.
    pub fn broken_config(mut self) -> Self {
        self.config
            .as_mut()
            .expect("device has no config space")
            .fail_reads = true;
        self
    }

    /// Fail only reads touching the vendor/device ID word; the class code
    /// at 0x09 stays readable.
    pub fn broken_id_read(mut self) -> Self {
        self.config
            .as_mut()
            .expect("device has no config space")
            .fail_id_reads = true;
        self
    }

    /// Attach a block backend with 512-byte sectors holding `content` from
    /// LBA 0 upward; reads past the content come back zero-filled.
    pub fn with_block(mut self, content: Vec<u8>) -> Self {
        let last_block = (content.len().max(crate::disk::SECTOR_SIZE)
            / crate::disk::SECTOR_SIZE) as u64
            - 1;
        self.block = Some(SimBlock {
            media: MediaInfo {
                media_id: 1,
                block_size: crate::disk::SECTOR_SIZE as u32,
                last_block,
                flags: MediaFlags::MEDIA_PRESENT,
            },
            content,
            failure: None,
        });
        self
    }

    /// Override the media descriptor reported by the block backend.
    pub fn with_media(mut self, media: MediaInfo) -> Self {
        self.block
            .as_mut()
            .expect("device has no block backend")
            .media = media;
        self
    }

    /// Inject `fault` into every block read.
    pub fn failing_block(mut self, fault: BlockFault) -> Self {
        self.block
            .as_mut()
            .expect("device has no block backend")
            .failure = Some(fault);
        self
    }
}

/// The registry: an ordered list of simulated devices.
pub struct SimDirectory {
    devices: Vec<(Handle, SimDevice)>,
    next_handle: u32,
    fail_locate: bool,
}

impl SimDirectory {
    pub fn new() -> Self {
        SimDirectory {
            devices: Vec::new(),
            next_handle: 0x10,
            fail_locate: false,
        }
    }

    /// Register a device; its handle reflects registration order.
    pub fn add(&mut self, device: SimDevice) -> Handle {
        let handle = Handle::new(self.next_handle);
        self.next_handle += 1;
        self.devices.push((handle, device));
        handle
    }

    /// Make every `locate` query fail, as if the directory itself is broken.
    pub fn fail_locate(&mut self) {
        self.fail_locate = true;
    }

    /// How many configuration-space reads `handle` has served. Lets tests
    /// prove a handle past the first match was never inspected.
    pub fn config_reads(&self, handle: Handle) -> usize {
        self.device(handle)
            .and_then(|d| d.config.as_ref())
            .map(|c| c.reads.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    fn device(&self, handle: Handle) -> Option<&SimDevice> {
        self.devices
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, d)| d)
    }
}

impl Default for SimDirectory {
    fn default() -> Self {
        SimDirectory::new()
    }
}

impl HandleDirectory for SimDirectory {
    fn locate(&self, cap: CapabilityId) -> Result<HandleList, DirectoryFault> {
        if self.fail_locate {
            return Err(DirectoryFault);
        }
        Ok(self
            .devices
            .iter()
            .filter(|(_, d)| match cap {
                c if c == capability::PCI_IO => d.advertise_pci,
                c if c == capability::BLOCK_IO => d.block.is_some(),
                _ => false,
            })
            .map(|(h, _)| *h)
            .collect())
    }

    fn pci_config(&self, handle: Handle) -> Option<&dyn PciConfig> {
        self.device(handle)?
            .config
            .as_ref()
            .map(|c| c as &dyn PciConfig)
    }

    fn block_io(&self, handle: Handle) -> Option<&dyn BlockIo> {
        self.device(handle)?
            .block
            .as_ref()
            .map(|b| b as &dyn BlockIo)
    }
}

impl PciConfig for SimConfig {
    fn read(&self, offset: u8, buf: &mut [u8]) -> Result<(), ConfigFault> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(ConfigFault);
        }
        let start = offset as usize;
        if self.fail_id_reads && start < VENDOR_ID_OFFSET as usize + 4 {
            return Err(ConfigFault);
        }
        let end = start.checked_add(buf.len()).ok_or(ConfigFault)?;
        if end > self.space.len() {
            return Err(ConfigFault);
        }
        buf.copy_from_slice(&self.space[start..end]);
        Ok(())
    }
}

impl BlockIo for SimBlock {
    fn media(&self) -> MediaInfo {
        self.media
    }

    fn read_blocks(&self, media_id: u32, lba: Lba, buf: &mut [u8]) -> Result<(), BlockFault> {
        if let Some(fault) = self.failure {
            return Err(fault);
        }
        if !self.media.flags.contains(MediaFlags::MEDIA_PRESENT) {
            return Err(BlockFault::NoMedia);
        }
        if media_id != self.media.media_id {
            return Err(BlockFault::MediaChanged);
        }
        let block_size = self.media.block_size as usize;
        if block_size == 0 || buf.len() % block_size != 0 {
            return Err(BlockFault::BadBufferSize);
        }

        let start = (lba.get() as usize).saturating_mul(block_size);
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = self.content.get(start + i).copied().unwrap_or(0);
        }
        Ok(())
    }
}
