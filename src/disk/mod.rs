//! The block transfer verifier: bind block storage on the committed handle,
//! read exactly one sector, and hand the payload back.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ProbeError;
use crate::firmware::{BlockFault, Handle, HandleDirectory, Lba, MediaFlags};

/// Sector size exercised by this diagnostic. Real transfers size the buffer
/// from the media descriptor; 512 is what the simulated media reports.
pub const SECTOR_SIZE: usize = 512;

/// Largest single-sector allocation this tool will attempt.
const MAX_SECTOR_ALLOC: usize = 1 << 20;

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

/// Owned, zero-filled buffer for exactly one sector.
///
/// Allocation and release are paired 1:1 per read; the outstanding-buffer
/// gauge exists so tests can prove no path leaks one.
#[derive(Debug)]
pub struct TransferBuffer {
    data: Vec<u8>,
}

impl TransferBuffer {
    fn allocate(len: usize) -> Result<Self, ProbeError> {
        if len > MAX_SECTOR_ALLOC {
            return Err(ProbeError::OutOfResources);
        }
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ProbeError::OutOfResources)?;
        data.resize(len, 0);
        OUTSTANDING.fetch_add(1, Ordering::SeqCst);
        Ok(TransferBuffer { data })
    }

    /// Number of transfer buffers currently alive in the process.
    pub fn outstanding() -> usize {
        OUTSTANDING.load(Ordering::SeqCst)
    }
}

impl Drop for TransferBuffer {
    fn drop(&mut self) {
        OUTSTANDING.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsRef<[u8]> for TransferBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for TransferBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl core::ops::Deref for TransferBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// Read one sector at `lba` from the block capability of `handle`.
///
/// The handle is committed by this point: a missing block binding is fatal
/// rather than a reason to try another device. The buffer is sized from the
/// media descriptor, zeroed before the transfer, and released on every
/// failure path before the error propagates.
pub fn read_sector(
    directory: &dyn HandleDirectory,
    handle: Handle,
    lba: Lba,
) -> Result<TransferBuffer, ProbeError> {
    let block = directory.block_io(handle).ok_or(ProbeError::Capability)?;

    let media = block.media();
    if !media.flags.contains(MediaFlags::MEDIA_PRESENT) {
        return Err(ProbeError::Io(BlockFault::NoMedia));
    }
    debug!(
        "{}: media id {}, {} byte sectors, last block {}",
        handle, media.media_id, media.block_size, media.last_block
    );

    let mut buffer = TransferBuffer::allocate(media.block_size as usize)?;
    block.read_blocks(media.media_id, lba, buffer.as_mut())?;
    Ok(buffer)
}
