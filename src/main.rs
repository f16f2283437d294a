// src/main.rs

#[macro_use]
extern crate log;

use std::io;
use std::process::ExitCode;

use diskprobe::disk::SECTOR_SIZE;
use diskprobe::pci::ClassCode;
use diskprobe::probe;
use diskprobe::sim::{SimDevice, SimDirectory};

fn main() -> ExitCode {
    pretty_env_logger::init();

    let directory = demo_directory();
    trace!("simulated directory populated");

    let stdout = io::stdout();
    let status = probe::run(&directory, &mut stdout.lock());
    if !status.is_success() {
        warn!("exiting with code {}", status.code());
    }
    ExitCode::from(status.code())
}

/// A plausible little machine: a host bridge, an AHCI controller that must
/// be passed over, and a PIIX3-style IDE controller carrying a boot sector.
fn demo_directory() -> SimDirectory {
    let mut directory = SimDirectory::new();
    directory.add(SimDevice::pci(ClassCode {
        base: 0x06,
        sub: 0x00,
        interface: 0x00,
    })
    .with_ids(0x8086, 0x1237));
    directory.add(SimDevice::pci(ClassCode {
        base: 0x01,
        sub: 0x06,
        interface: 0x01,
    })
    .with_ids(0x8086, 0x2922));
    directory.add(SimDevice::ide(demo_sector()).with_ids(0x8086, 0x7010));
    directory
}

fn demo_sector() -> Vec<u8> {
    let mut sector = vec![0u8; SECTOR_SIZE];
    // x86 relative jump plus an OEM label, so the dump looks like a real
    // boot sector.
    sector[0] = 0xeb;
    sector[1] = 0x3c;
    sector[2] = 0x90;
    sector[3..11].copy_from_slice(b"DISKPROB");
    sector[510] = 0x55;
    sector[511] = 0xaa;
    sector
}
