//! Top-level run: enumerate, verify, report, and map the outcome to a
//! process exit status.

use std::io::Write;

use crate::disk;
use crate::error::{ExitStatus, ProbeError};
use crate::firmware::{HandleDirectory, Lba};
use crate::hexdump::HexDump;
use crate::pci;

/// Run the whole diagnostic against `directory`, writing the report to
/// `out`. Exactly one status line is emitted before returning; console
/// write failures are ignored, there is nowhere left to report them.
pub fn run(directory: &dyn HandleDirectory, out: &mut dyn Write) -> ExitStatus {
    match probe(directory, out) {
        Ok(()) => {
            writeln!(out, "ok").ok();
            ExitStatus::Success
        }
        Err(error) => {
            writeln!(out, "{}", error).ok();
            error!("probe failed: {}", error);
            ExitStatus::from(error)
        }
    }
}

fn probe(directory: &dyn HandleDirectory, out: &mut dyn Write) -> Result<(), ProbeError> {
    let controller = pci::find_ide_controller(directory)?;
    match controller.id {
        Some(id) => {
            writeln!(
                out,
                "Found PCI IDE controller [{}] ({})",
                controller.class, id
            )
            .ok();
        }
        None => {
            writeln!(out, "Found PCI IDE controller [{}]", controller.class).ok();
        }
    }
    info!("selected {}", controller.handle);

    let sector = disk::read_sector(directory, controller.handle, Lba::zero())?;
    writeln!(out, "Sector content:").ok();
    write!(out, "{}", HexDump(&sector)).ok();
    Ok(())
}
