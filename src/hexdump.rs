//! Fixed-width hex rendering of a sector payload: two digits per byte, a
//! single space between bytes, sixteen bytes per line.

use core::fmt;

pub const BYTES_PER_LINE: usize = 16;

/// Display adapter over a byte slice.
pub struct HexDump<'a>(pub &'a [u8]);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.0.chunks(BYTES_PER_LINE) {
            for (i, byte) in row.iter().enumerate() {
                if i != 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{:02x}", byte)?;
            }
            f.write_str("\n")?;
        }
        Ok(())
    }
}
