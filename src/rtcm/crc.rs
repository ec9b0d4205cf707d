/// RTCM3 CRC-24Q generator polynomial.
pub const CRC24Q_POLY: u32 = 0x86_4cfb;

const CRC24_MASK: u32 = 0xff_ffff;

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80_0000 != 0 {
                (crc << 1) ^ CRC24Q_POLY
            } else {
                crc << 1
            };
            crc &= CRC24_MASK;
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Byte-wise lookup table for [CRC24Q_POLY].
pub static CRC24_TABLE: [u32; 256] = make_table();

/// Compute the 24-bit CRC of `data`.
///
/// Computed over a complete frame, i.e., including its 3 trailing CRC bytes, the result is
/// 0 when the frame is intact.
#[must_use]
pub fn crc24(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &byte| {
        let idx = (byte ^ ((crc >> 16) & 0xff) as u8) as usize;
        ((crc << 8) ^ CRC24_TABLE[idx]) & CRC24_MASK
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_published_values() {
        assert_eq!(CRC24_TABLE[0], 0);
        assert_eq!(CRC24_TABLE[1], 0x86_4cfb);
        assert_eq!(CRC24_TABLE[2], 0x8a_d50d);
        assert_eq!(CRC24_TABLE[128], 0x33_47a4);
        assert_eq!(CRC24_TABLE[255], 0xdd_8538);
    }

    #[test]
    fn check_value() {
        assert_eq!(crc24(b"123456789"), 0xcd_e703);
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(crc24(&[]), 0);
    }

    #[test]
    fn appended_crc_gives_zero_residual() {
        let mut dat = vec![0xd3, 0x00, 0x02, 0x3e, 0xd0];
        let crc = crc24(&dat);
        dat.extend_from_slice(&crc.to_be_bytes()[1..]);
        assert_eq!(crc24(&dat), 0);
    }
}
