//! Unsigned LEB128 in the `u32` range.

use alloc::vec::Vec;

use crate::error::{PickleError, Result};

/// Maximum encoded length of a `u32`.
const MAX_LEN: usize = 5;

#[inline]
pub(super) fn write_varint(buf: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Writes a `usize` length, failing if it does not fit in a `u32`.
#[inline]
pub(super) fn write_len(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| PickleError::malformed("length does not fit in 32 bits"))?;
    write_varint(buf, len);
    Ok(())
}

/// Reads a varint starting at `*pos`, advancing `pos` past it.
pub(super) fn read_varint(input: &[u8], pos: &mut usize) -> Result<u32> {
    let mut result = 0_u32;
    for index in 0..MAX_LEN {
        let Some(&byte) = input.get(*pos) else {
            return Err(PickleError::malformed("unexpected end of input in varint"));
        };
        *pos += 1;

        let bits = u32::from(byte & 0x7F);
        if index == MAX_LEN - 1 && bits > 0x0F {
            return Err(PickleError::malformed("varint overflows 32 bits"));
        }
        result |= bits << (7 * index);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(PickleError::malformed("varint longer than 5 bytes"))
}
