//! Identity-field-only EDID extraction (spec.md §1 Non-goals: "EDID parsing
//! beyond extracting identity fields needed for display selection").
//!
//! The fields pulled out here -- manufacturer ID, product code, serial
//! number, and week/year of manufacture -- sit at fixed byte offsets in
//! every 128-byte EDID block per the VESA EDID standard; decoding them
//! doesn't need a general-purpose EDID parser.

use ddc_core::error::ErrorKind;

const EDID_HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

/// The subset of EDID fields this workspace cares about for display
/// selection and profile headers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EdidIdentity {
    /// Three-letter PNP manufacturer ID, e.g. `"ACM"`.
    pub manufacturer: String,
    pub product_code: u16,
    pub serial_number: u32,
    pub week_of_manufacture: u8,
    pub year_of_manufacture: u16,
    /// The full 128-byte block, kept for [`DisplayIdentifier::Edid`](crate::identifier::DisplayIdentifier::Edid)
    /// matching and profile headers.
    pub raw: [u8; 128],
}

impl EdidIdentity {
    /// Parse identity fields out of a 128-byte EDID block, validating the
    /// fixed 8-byte header and the checksum over the whole block.
    pub fn parse(raw: &[u8]) -> Result<Self, ErrorKind> {
        if raw.len() < 128 {
            return Err(ErrorKind::InvalidEdid);
        }
        if raw[0..8] != EDID_HEADER {
            return Err(ErrorKind::InvalidEdid);
        }
        if raw[..128].iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) != 0 {
            return Err(ErrorKind::InvalidEdid);
        }

        let manufacturer = decode_manufacturer_id(u16::from_be_bytes([raw[8], raw[9]]));
        let product_code = u16::from_le_bytes([raw[10], raw[11]]);
        let serial_number = u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]);
        let week_of_manufacture = raw[16];
        let year_of_manufacture = 1990 + raw[17] as u16;

        let mut block = [0u8; 128];
        block.copy_from_slice(&raw[..128]);

        Ok(EdidIdentity {
            manufacturer,
            product_code,
            serial_number,
            week_of_manufacture,
            year_of_manufacture,
            raw: block,
        })
    }
}

/// Unpack the 3-letter, 5-bit-per-character manufacturer ID packed into
/// bytes 8-9 of the EDID (bit 15 reserved zero, then three 5-bit letters
/// where `1` = `'A'`).
fn decode_manufacturer_id(packed: u16) -> String {
    let letter = |shift: u16| -> char {
        let code = ((packed >> shift) & 0x1f) as u8;
        (b'A' + code.saturating_sub(1)) as char
    };
    [letter(10), letter(5), letter(0)].iter().collect()
}
