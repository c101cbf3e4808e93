//! Modbus CRC-16 and the RTU frame-detection predicate (§4.1, §4.7).
//!
//! The table-driven implementation below is the conventional two-table
//! (high-nibble/low-nibble) walk used by every Modbus RTU master and
//! slave; it must be byte-identical to that implementation rather than
//! delegate to a general-purpose CRC crate, since the wire format is
//! pinned to this exact algorithm.

use crate::constants::{RTU_UNIT_ID_MAX, RTU_UNIT_ID_MIN};

/// High-order nibble lookup table for the Modbus CRC-16.
const CRC_HI_TABLE: [u8; 256] = [
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40, 0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41,
    0x00, 0xC1, 0x81, 0x40, 0x01, 0xC0, 0x80, 0x41, 0x01, 0xC0, 0x80, 0x41, 0x00, 0xC1, 0x81, 0x40,
];

/// Low-order byte lookup table for the Modbus CRC-16.
const CRC_LO_TABLE: [u8; 256] = [
    0x00, 0xC0, 0xC1, 0x01, 0xC3, 0x03, 0x02, 0xC2, 0xC6, 0x06, 0x07, 0xC7, 0x05, 0xC5, 0xC4, 0x04,
    0xCC, 0x0C, 0x0D, 0xCD, 0x0F, 0xCF, 0xCE, 0x0E, 0x0A, 0xCA, 0xCB, 0x0B, 0xC9, 0x09, 0x08, 0xC8,
    0xD8, 0x18, 0x19, 0xD9, 0x1B, 0xDB, 0xDA, 0x1A, 0x1E, 0xDE, 0xDF, 0x1F, 0xDD, 0x1D, 0x1C, 0xDC,
    0x14, 0xD4, 0xD5, 0x15, 0xD7, 0x17, 0x16, 0xD6, 0xD2, 0x12, 0x13, 0xD3, 0x11, 0xD1, 0xD0, 0x10,
    0xF0, 0x30, 0x31, 0xF1, 0x33, 0xF3, 0xF2, 0x32, 0x36, 0xF6, 0xF7, 0x37, 0xF5, 0x35, 0x34, 0xF4,
    0x3C, 0xFC, 0xFD, 0x3D, 0xFF, 0x3F, 0x3E, 0xFE, 0xFA, 0x3A, 0x3B, 0xFB, 0x39, 0xF9, 0xF8, 0x38,
    0x28, 0xE8, 0xE9, 0x29, 0xEB, 0x2B, 0x2A, 0xEA, 0xEE, 0x2E, 0x2F, 0xEF, 0x2D, 0xED, 0xEC, 0x2C,
    0xE4, 0x24, 0x25, 0xE5, 0x27, 0xE7, 0xE6, 0x26, 0x22, 0xE2, 0xE3, 0x23, 0xE1, 0x21, 0x20, 0xE0,
    0xA0, 0x60, 0x61, 0xA1, 0x63, 0xA3, 0xA2, 0x62, 0x66, 0xA6, 0xA7, 0x67, 0xA5, 0x65, 0x64, 0xA4,
    0x6C, 0xAC, 0xAD, 0x6D, 0xAF, 0x6F, 0x6E, 0xAE, 0xAA, 0x6A, 0x6B, 0xAB, 0x69, 0xA9, 0xA8, 0x68,
    0x78, 0xB8, 0xB9, 0x79, 0xBB, 0x7B, 0x7A, 0xBA, 0xBE, 0x7E, 0x7F, 0xBF, 0x7D, 0xBD, 0xBC, 0x7C,
    0xB4, 0x74, 0x75, 0xB5, 0x77, 0xB7, 0xB6, 0x76, 0x72, 0xB2, 0xB3, 0x73, 0xB1, 0x71, 0x70, 0xB0,
    0x50, 0x90, 0x91, 0x51, 0x93, 0x53, 0x52, 0x92, 0x96, 0x56, 0x57, 0x97, 0x55, 0x95, 0x94, 0x54,
    0x9C, 0x5C, 0x5D, 0x9D, 0x5F, 0x9F, 0x9E, 0x5E, 0x5A, 0x9A, 0x9B, 0x5B, 0x99, 0x59, 0x58, 0x98,
    0x88, 0x48, 0x49, 0x89, 0x4B, 0x8B, 0x8A, 0x4A, 0x4E, 0x8E, 0x8F, 0x4F, 0x8D, 0x4D, 0x4C, 0x8C,
    0x44, 0x84, 0x85, 0x45, 0x87, 0x47, 0x46, 0x86, 0x82, 0x42, 0x43, 0x83, 0x41, 0x81, 0x80, 0x40,
];

/// Compute the Modbus CRC-16 over `data`.
///
/// Initial value 0xFFFF, polynomial 0xA001 (reversed 0x8005), no final
/// XOR. The returned `u16`'s low byte is `crc_lo`, high byte `crc_hi` —
/// the order those two bytes are written to the wire (`crc_lo` first).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc_hi: u8 = 0xFF;
    let mut crc_lo: u8 = 0xFF;

    for &byte in data {
        let index = (crc_lo ^ byte) as usize;
        crc_lo = crc_hi ^ CRC_HI_TABLE[index];
        crc_hi = CRC_LO_TABLE[index];
    }

    u16::from_le_bytes([crc_lo, crc_hi])
}

/// Split a CRC value into its wire bytes, `(crc_lo, crc_hi)`.
#[inline]
pub fn crc_bytes(crc: u16) -> (u8, u8) {
    let [lo, hi] = crc.to_le_bytes();
    (lo, hi)
}

/// The §4.7 RTU frame-detection predicate, shared by the master's
/// response reader and the slave's serial listener.
///
/// `buf[..len]` is a complete, valid RTU frame iff:
/// - `len >= 6`
/// - `buf[0]` (unit id) is in `[1, 247]`
/// - the trailing two bytes equal the CRC of `buf[..len-2]`, with
///   `crc_lo` at `len-2` and `crc_hi` at `len-1`.
pub fn detect_valid_frame(buf: &[u8], len: usize) -> bool {
    if len < 6 || len > buf.len() {
        return false;
    }
    let unit_id = buf[0];
    if !(RTU_UNIT_ID_MIN..=RTU_UNIT_ID_MAX).contains(&unit_id) {
        return false;
    }
    let (expected_lo, expected_hi) = crc_bytes(crc16(&buf[..len - 2]));
    buf[len - 2] == expected_lo && buf[len - 1] == expected_hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_single_coil_scenario() {
        // SPEC_FULL §8 scenario 2: unit=0x11, FC05, addr=0x00AC, value=ON.
        let pdu = [0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        let crc = crc16(&pdu);
        let (lo, hi) = crc_bytes(crc);
        assert_eq!([lo, hi], [0x4E, 0x8B]);
    }

    #[test]
    fn empty_input_is_the_seed() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    #[test]
    fn deterministic_and_order_dependent() {
        let a = crc16(&[0x01, 0x02, 0x03]);
        let b = crc16(&[0x01, 0x02, 0x03]);
        let c = crc16(&[0x03, 0x02, 0x01]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn detect_valid_frame_accepts_good_frame() {
        let pdu = [0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        let (lo, hi) = crc_bytes(crc16(&pdu));
        let mut frame = pdu.to_vec();
        frame.push(lo);
        frame.push(hi);
        assert!(detect_valid_frame(&frame, frame.len()));
    }

    #[test]
    fn detect_valid_frame_rejects_short_or_bad_unit_id() {
        assert!(!detect_valid_frame(&[0x11, 0x05, 0x00], 3));
        let mut frame = vec![0x00, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        let (lo, hi) = crc_bytes(crc16(&frame[..4]));
        frame.push(lo);
        frame.push(hi);
        assert!(!detect_valid_frame(&frame, frame.len()));
    }

    #[test]
    fn detect_valid_frame_rejects_corrupted_crc() {
        let pdu = [0x11, 0x05, 0x00, 0xAC, 0xFF, 0x00];
        let (lo, hi) = crc_bytes(crc16(&pdu));
        let mut frame = pdu.to_vec();
        frame.push(lo ^ 0x01);
        frame.push(hi);
        assert!(!detect_valid_frame(&frame, frame.len()));
    }
}
