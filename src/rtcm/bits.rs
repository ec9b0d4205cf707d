/// Read `width` bits starting at bit `offset` of `buf` as an unsigned value.
///
/// Bits are numbered from the most significant bit of `buf[0]`. Returns `None` if the
/// field does not fit in `buf` or `width` is not in `1..=64`.
#[must_use]
pub fn get_unsigned_bits(buf: &[u8], offset: usize, width: usize) -> Option<u64> {
    if width == 0 || width > 64 || offset + width > buf.len() * 8 {
        return None;
    }
    let mut zult: u64 = 0;
    for n in offset..offset + width {
        let bit = (buf[n / 8] >> (7 - (n % 8))) & 1;
        zult = (zult << 1) | u64::from(bit);
    }
    Some(zult)
}

/// Read `width` bits starting at bit `offset` of `buf` as a two's-complement value.
///
/// See [get_unsigned_bits] for bit numbering and when `None` is returned.
#[must_use]
pub fn get_signed_bits(buf: &[u8], offset: usize, width: usize) -> Option<i64> {
    let raw = get_unsigned_bits(buf, offset, width)?;
    if width == 64 {
        return Some(raw as i64);
    }
    let value = raw as i64;
    if raw & (1 << (width - 1)) != 0 {
        Some(value - (1i64 << width))
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write `value` into `buf` as a `width` bit field at `offset`.
    fn put_bits(buf: &mut [u8], offset: usize, width: usize, value: i64) {
        for i in 0..width {
            let bit = (value >> (width - 1 - i)) & 1;
            let n = offset + i;
            if bit == 1 {
                buf[n / 8] |= 1 << (7 - (n % 8));
            } else {
                buf[n / 8] &= !(1 << (7 - (n % 8)));
            }
        }
    }

    #[test]
    fn reads_message_number() {
        // 1005 == 0x3ed
        let buf = [0x3e, 0xd0, 0x00];
        assert_eq!(get_unsigned_bits(&buf, 0, 12), Some(1005));
        assert_eq!(get_signed_bits(&buf, 0, 12), Some(1005));
    }

    #[test]
    fn reads_unaligned_fields() {
        let buf = [0b1010_1100, 0b0101_0011];
        assert_eq!(get_unsigned_bits(&buf, 2, 4), Some(0b1011));
        assert_eq!(get_unsigned_bits(&buf, 6, 5), Some(0b00010));
        assert_eq!(get_signed_bits(&buf, 0, 3), Some(-3));
        assert_eq!(get_signed_bits(&buf, 15, 1), Some(-1));
    }

    #[test]
    fn width_38_roundtrip() {
        let values: [i64; 6] = [
            0,
            1,
            -1,
            11_141_045_999,
            -48_507_297_108,
            (1 << 37) - 1,
        ];
        for value in values {
            let mut buf = [0u8; 19];
            put_bits(&mut buf, 34, 38, value);
            assert_eq!(get_signed_bits(&buf, 34, 38), Some(value), "value {value}");
        }
        let mut buf = [0u8; 19];
        put_bits(&mut buf, 74, 38, -(1 << 37));
        assert_eq!(get_signed_bits(&buf, 74, 38), Some(-(1 << 37)));
    }

    #[test]
    fn negative_38_bit_pattern() {
        // all ones in a 38 bit field is -1
        let buf = [0xff; 5];
        assert_eq!(get_signed_bits(&buf, 2, 38), Some(-1));
        assert_eq!(get_unsigned_bits(&buf, 2, 38), Some((1 << 38) - 1));
    }

    #[test]
    fn full_width() {
        let buf = [0xff; 8];
        assert_eq!(get_unsigned_bits(&buf, 0, 64), Some(u64::MAX));
        assert_eq!(get_signed_bits(&buf, 0, 64), Some(-1));
    }

    #[test]
    fn out_of_range() {
        let buf = [0u8; 4];
        assert_eq!(get_unsigned_bits(&buf, 0, 0), None);
        assert_eq!(get_unsigned_bits(&buf, 0, 65), None);
        assert_eq!(get_unsigned_bits(&buf, 30, 3), None);
        assert_eq!(get_signed_bits(&buf, 32, 1), None);
        assert_eq!(get_unsigned_bits(&buf, 24, 8), Some(0));
    }
}
