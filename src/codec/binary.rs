//! Primitive binary encoding
//!
//! Format:
//! - int / long: zig-zag, then 7-bit groups least significant first,
//!   high bit set on every byte but the last (at most 10 bytes)
//! - float / double: IEEE 754 little-endian
//! - boolean: one byte, 0 or 1
//! - bytes / string: long length, then raw bytes

use super::errors::{CodecError, CodecResult};

/// Longest valid varint encoding of a 64-bit value
pub const MAX_VARINT_LEN: usize = 10;

pub fn zigzag(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

pub fn unzigzag(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

pub fn write_long(buf: &mut Vec<u8>, n: i64) {
    let mut z = zigzag(n);
    while z >= 0x80 {
        buf.push((z as u8 & 0x7f) | 0x80);
        z >>= 7;
    }
    buf.push(z as u8);
}

pub fn write_int(buf: &mut Vec<u8>, n: i32) {
    write_long(buf, n as i64);
}

pub fn write_bool(buf: &mut Vec<u8>, b: bool) {
    buf.push(u8::from(b));
}

pub fn write_float(buf: &mut Vec<u8>, f: f32) {
    buf.extend_from_slice(&f.to_le_bytes());
}

pub fn write_double(buf: &mut Vec<u8>, f: f64) {
    buf.extend_from_slice(&f.to_le_bytes());
}

pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_long(buf, bytes.len() as i64);
    buf.extend_from_slice(bytes);
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    write_bytes(buf, s.as_bytes());
}

/// Forward-only reader over an input buffer
///
/// Every read checks the remaining length first; nothing is consumed from
/// a read that fails.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn read_exact(&mut self, n: usize, path: &str) -> CodecResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::decode(
                path,
                format!("need {} bytes, {} remaining", n, self.remaining()),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_long(&mut self, path: &str) -> CodecResult<i64> {
        let mut value: u64 = 0;
        let mut shift = 0;
        let start = self.pos;
        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.data.get(start + i) else {
                return Err(CodecError::decode(path, "truncated varint"));
            };
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(CodecError::decode(path, "varint overflows 64 bits"));
            }
            value |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                self.pos = start + i + 1;
                return Ok(unzigzag(value));
            }
            shift += 7;
        }
        Err(CodecError::decode(path, "varint longer than 10 bytes"))
    }

    pub fn read_int(&mut self, path: &str) -> CodecResult<i32> {
        let start = self.pos;
        let n = self.read_long(path)?;
        i32::try_from(n).map_err(|_| {
            self.pos = start;
            CodecError::decode(path, format!("int out of range: {}", n))
        })
    }

    pub fn read_bool(&mut self, path: &str) -> CodecResult<bool> {
        match self.read_exact(1, path)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.pos -= 1;
                Err(CodecError::decode(path, format!("invalid boolean byte {:#04x}", other)))
            }
        }
    }

    pub fn read_float(&mut self, path: &str) -> CodecResult<f32> {
        let bytes = self.read_exact(4, path)?;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_double(&mut self, path: &str) -> CodecResult<f64> {
        let bytes = self.read_exact(8, path)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(buf))
    }

    /// Length-prefixed byte string; the length is checked against the
    /// remaining input before anything is allocated
    pub fn read_bytes(&mut self, path: &str) -> CodecResult<&'a [u8]> {
        let start = self.pos;
        let len = self.read_long(path)?;
        if len < 0 || len as u64 > self.remaining() as u64 {
            self.pos = start;
            return Err(CodecError::decode(
                path,
                format!("length prefix {} exceeds remaining {} bytes", len, self.remaining()),
            ));
        }
        self.read_exact(len as usize, path)
    }

    pub fn read_string(&mut self, path: &str) -> CodecResult<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CodecError::decode(path, format!("invalid UTF-8: {}", e)))
    }
}
