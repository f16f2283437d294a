// tests/probe.rs
//
// End-to-end scenarios over the simulated handle directory: selection
// policy, fault propagation, buffer accounting, and the rendered report.

use serial_test::serial;

use diskprobe::disk::{self, TransferBuffer, SECTOR_SIZE};
use diskprobe::error::{ExitStatus, ProbeError};
use diskprobe::firmware::{BlockFault, Lba, MediaFlags, MediaInfo};
use diskprobe::hexdump::HexDump;
use diskprobe::pci::{self, ClassCode};
use diskprobe::probe;
use diskprobe::sim::{SimDevice, SimDirectory};

fn sata() -> SimDevice {
    SimDevice::pci(ClassCode {
        base: 0x01,
        sub: 0x06,
        interface: 0x01,
    })
}

fn patterned_sector(seed: u8) -> Vec<u8> {
    (0..SECTOR_SIZE)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

#[test]
fn selects_first_match_and_stops_scanning() {
    let mut dir = SimDirectory::new();
    dir.add(sata());
    let first = dir.add(SimDevice::ide(patterned_sector(1)));
    let second = dir.add(SimDevice::ide(patterned_sector(2)));

    let controller = pci::find_ide_controller(&dir).unwrap();
    assert_eq!(controller.handle, first);
    assert_eq!(dir.config_reads(second), 0, "scan continued past the match");
}

#[test]
fn interface_byte_is_ignored() {
    let mut dir = SimDirectory::new();
    let native = dir.add(SimDevice::pci(ClassCode {
        base: 0x01,
        sub: 0x01,
        interface: 0x00,
    }));
    assert_eq!(pci::find_ide_controller(&dir).unwrap().handle, native);
}

#[test]
fn sata_alone_is_not_found() {
    let mut dir = SimDirectory::new();
    dir.add(sata());
    assert_eq!(
        pci::find_ide_controller(&dir).unwrap_err(),
        ProbeError::NotFound
    );
}

#[test]
fn empty_directory_is_discovery_error() {
    let dir = SimDirectory::new();
    assert_eq!(
        pci::find_ide_controller(&dir).unwrap_err(),
        ProbeError::Discovery
    );
}

#[test]
fn broken_directory_is_discovery_error() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::ide(patterned_sector(0)));
    dir.fail_locate();
    assert_eq!(
        pci::find_ide_controller(&dir).unwrap_err(),
        ProbeError::Discovery
    );
}

#[test]
fn unbindable_handle_is_skipped() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::unbindable());
    let ide = dir.add(SimDevice::ide(patterned_sector(3)));
    assert_eq!(pci::find_ide_controller(&dir).unwrap().handle, ide);
}

#[test]
fn broken_config_read_is_skipped() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::ide(patterned_sector(4)).broken_config());
    let ide = dir.add(SimDevice::ide(patterned_sector(5)));
    assert_eq!(pci::find_ide_controller(&dir).unwrap().handle, ide);
}

#[test]
fn sole_unbindable_handle_ends_in_not_found() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::unbindable());
    assert_eq!(
        pci::find_ide_controller(&dir).unwrap_err(),
        ProbeError::NotFound
    );
}

#[test]
fn vendor_ids_are_reported_when_readable() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::ide(patterned_sector(6)).with_ids(0x8086, 0x7010));
    let controller = pci::find_ide_controller(&dir).unwrap();
    let id = controller.id.unwrap();
    assert_eq!(id.vendor, 0x8086);
    assert_eq!(id.device, 0x7010);
}

#[test]
#[serial(buffers)]
fn unreadable_vendor_id_does_not_block_selection() {
    let mut dir = SimDirectory::new();
    let ide = dir.add(
        SimDevice::ide(patterned_sector(15))
            .with_ids(0x8086, 0x7010)
            .broken_id_read(),
    );

    let controller = pci::find_ide_controller(&dir).unwrap();
    assert_eq!(controller.handle, ide);
    assert!(controller.id.is_none(), "selection must stand without an ID");

    let mut out = Vec::new();
    assert_eq!(probe::run(&dir, &mut out), ExitStatus::Success);
    let report = String::from_utf8(out).unwrap();
    assert!(
        report.contains("Found PCI IDE controller [01.01.80]\n"),
        "report was: {}",
        report
    );
}

#[test]
#[serial(buffers)]
fn sector_round_trip() {
    let content = patterned_sector(7);
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::ide(content.clone()));

    let before = TransferBuffer::outstanding();
    {
        let sector = disk::read_sector(&dir, ide, Lba::zero()).unwrap();
        assert_eq!(&sector[..], &content[..]);
    }
    assert_eq!(TransferBuffer::outstanding(), before);
}

#[test]
#[serial(buffers)]
fn read_at_nonzero_lba() {
    let mut content = vec![0u8; SECTOR_SIZE * 2];
    content[SECTOR_SIZE..].copy_from_slice(&patterned_sector(8));
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::ide(content.clone()));

    let sector = disk::read_sector(&dir, ide, Lba::new(1)).unwrap();
    assert_eq!(&sector[..], &content[SECTOR_SIZE..]);
}

#[test]
#[serial(buffers)]
fn missing_block_capability_is_fatal_after_commit() {
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::pci(ClassCode {
        base: 0x01,
        sub: 0x01,
        interface: 0x80,
    }));

    let before = TransferBuffer::outstanding();
    assert_eq!(
        disk::read_sector(&dir, ide, Lba::zero()).unwrap_err(),
        ProbeError::Capability
    );
    assert_eq!(TransferBuffer::outstanding(), before);

    let mut out = Vec::new();
    assert_eq!(probe::run(&dir, &mut out), ExitStatus::Capability);
}

#[test]
#[serial(buffers)]
fn read_fault_frees_buffer_and_surfaces_io() {
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::ide(patterned_sector(9)).failing_block(BlockFault::Device));

    let before = TransferBuffer::outstanding();
    assert_eq!(
        disk::read_sector(&dir, ide, Lba::zero()).unwrap_err(),
        ProbeError::Io(BlockFault::Device)
    );
    assert_eq!(TransferBuffer::outstanding(), before);
}

#[test]
#[serial(buffers)]
fn media_change_surfaces_io() {
    let mut dir = SimDirectory::new();
    let ide =
        dir.add(SimDevice::ide(patterned_sector(10)).failing_block(BlockFault::MediaChanged));
    assert_eq!(
        disk::read_sector(&dir, ide, Lba::zero()).unwrap_err(),
        ProbeError::Io(BlockFault::MediaChanged)
    );
}

#[test]
#[serial(buffers)]
fn absent_media_surfaces_io_without_allocating() {
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::ide(patterned_sector(11)).with_media(MediaInfo {
        media_id: 1,
        block_size: SECTOR_SIZE as u32,
        last_block: 0,
        flags: MediaFlags::empty(),
    }));

    let before = TransferBuffer::outstanding();
    assert_eq!(
        disk::read_sector(&dir, ide, Lba::zero()).unwrap_err(),
        ProbeError::Io(BlockFault::NoMedia)
    );
    assert_eq!(TransferBuffer::outstanding(), before);
}

#[test]
#[serial(buffers)]
fn oversized_media_surfaces_out_of_resources() {
    let mut dir = SimDirectory::new();
    let ide = dir.add(SimDevice::ide(patterned_sector(12)).with_media(MediaInfo {
        media_id: 1,
        block_size: 1 << 28,
        last_block: 0,
        flags: MediaFlags::MEDIA_PRESENT,
    }));

    let before = TransferBuffer::outstanding();
    assert_eq!(
        disk::read_sector(&dir, ide, Lba::zero()).unwrap_err(),
        ProbeError::OutOfResources
    );
    assert_eq!(TransferBuffer::outstanding(), before);

    let mut out = Vec::new();
    assert_eq!(probe::run(&dir, &mut out), ExitStatus::OutOfResources);
}

#[test]
#[serial(buffers)]
fn run_renders_full_report() {
    let content = patterned_sector(13);
    let mut dir = SimDirectory::new();
    dir.add(sata());
    dir.add(SimDevice::ide(content.clone()).with_ids(0x8086, 0x7010));

    let mut out = Vec::new();
    let status = probe::run(&dir, &mut out);
    assert_eq!(status, ExitStatus::Success);
    assert_eq!(status.code(), 0);

    let report = String::from_utf8(out).unwrap();
    assert!(
        report.contains("Found PCI IDE controller [01.01.80] (Intel 8086:7010)"),
        "report was: {}",
        report
    );
    assert!(report.contains("Sector content:\n"));
    assert!(report.ends_with("ok\n"));

    let dump = HexDump(&content).to_string();
    assert!(report.contains(&dump), "dump missing from report");
    assert_eq!(dump.lines().count(), 32);
    for line in dump.lines() {
        assert_eq!(line.split(' ').count(), 16);
        assert!(line.split(' ').all(|b| b.len() == 2));
    }
}

#[test]
#[serial(buffers)]
fn read_fault_prints_status_and_no_partial_dump() {
    let mut dir = SimDirectory::new();
    dir.add(SimDevice::ide(patterned_sector(14)).failing_block(BlockFault::Device));

    let before = TransferBuffer::outstanding();
    let mut out = Vec::new();
    let status = probe::run(&dir, &mut out);
    assert_eq!(status, ExitStatus::Io);
    assert_eq!(status.code(), 2);
    assert_eq!(TransferBuffer::outstanding(), before);

    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Failed to read sector: device error"));
    assert!(!report.contains("Sector content:"));
}

#[test]
fn not_found_run_reports_and_exits_nonzero() {
    let mut dir = SimDirectory::new();
    dir.add(sata());

    let mut out = Vec::new();
    let status = probe::run(&dir, &mut out);
    assert_eq!(status, ExitStatus::NotFound);
    assert_eq!(status.code(), 1);

    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("No PCI IDE controller found"));
}

#[test]
fn broken_directory_run_reports_discovery() {
    let mut dir = SimDirectory::new();
    dir.fail_locate();

    let mut out = Vec::new();
    let status = probe::run(&dir, &mut out);
    assert_eq!(status, ExitStatus::Discovery);
    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Failed to locate PCI I/O handles"));
}
