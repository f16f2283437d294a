// src/lib.rs

//! One-shot pre-boot storage diagnostic.
//!
//! Walks the firmware handle directory for PCI-capable devices, picks the
//! first IDE-class mass-storage controller by its class-code signature, then
//! reads one sector at LBA 0 through the handle's block-storage capability
//! and hex-dumps the payload.
//!
//! The firmware surface is the [`firmware::HandleDirectory`] registry trait,
//! so the whole routine runs unchanged against an in-memory simulated
//! directory ([`sim::SimDirectory`]) in tests and in the demo binary.

#[macro_use]
extern crate log;

pub mod disk;
pub mod error;
pub mod firmware;
pub mod hexdump;
pub mod pci;
pub mod probe;
pub mod sim;
