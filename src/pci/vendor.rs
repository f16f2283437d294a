//! Tiny vendor-ID name table for the probe report. Covers the vendors an
//! IDE controller plausibly shows up under; anything else is reported
//! numerically.

struct Vendor {
    id: u16,
    name: &'static str,
}

static VENDORS: &[Vendor] = &[
    Vendor { id: 0x1022, name: "AMD" },
    Vendor { id: 0x105a, name: "Promise" },
    Vendor { id: 0x10de, name: "NVIDIA" },
    Vendor { id: 0x1106, name: "VIA" },
    Vendor { id: 0x15ad, name: "VMware" },
    Vendor { id: 0x1af4, name: "Red Hat (virtio)" },
    Vendor { id: 0x1b36, name: "Red Hat (QEMU)" },
    Vendor { id: 0x80ee, name: "VirtualBox" },
    Vendor { id: 0x8086, name: "Intel" },
];

pub fn vendor_name(id: u16) -> Option<&'static str> {
    VENDORS.iter().find(|v| v.id == id).map(|v| v.name)
}
