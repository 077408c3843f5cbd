//! Wire primitives: little-endian integers, varints and length-prefixed bytes

use bytes::{Buf, BufMut};

use crate::error::{Result, TxError};
use crate::types::Hash;

/// Size of a varint encoding of `n`
pub fn varint_size(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Size of `len` bytes with their varint length prefix
pub fn varbytes_size(len: usize) -> usize {
    varint_size(len as u64) + len
}

pub fn write_varint<B: BufMut>(buf: &mut B, n: u64) {
    match n {
        0..=0xfc => buf.put_u8(n as u8),
        0xfd..=0xffff => {
            buf.put_u8(0xfd);
            buf.put_u16_le(n as u16);
        }
        0x1_0000..=0xffff_ffff => {
            buf.put_u8(0xfe);
            buf.put_u32_le(n as u32);
        }
        _ => {
            buf.put_u8(0xff);
            buf.put_u64_le(n);
        }
    }
}

pub fn write_varbytes<B: BufMut>(buf: &mut B, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Bounds-checked cursor over an encoded buffer
pub struct Reader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { buf: data, len: data.len() }
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(TxError::Decode(format!(
                "unexpected end of data at offset {}: need {} bytes, have {}",
                self.offset(),
                n,
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn read_hash(&mut self) -> Result<Hash> {
        self.ensure(32)?;
        let mut hash = [0u8; 32];
        self.buf.copy_to_slice(&mut hash);
        Ok(hash)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n)?;
        let mut out = vec![0u8; n];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Read a varint, rejecting encodings longer than necessary
    pub fn read_varint(&mut self) -> Result<u64> {
        let prefix = self.read_u8()?;
        let (value, min) = match prefix {
            0xfd => (self.read_u16()? as u64, 0xfd),
            0xfe => (self.read_u32()? as u64, 0x1_0000),
            0xff => (self.read_u64()?, 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(TxError::Decode(format!("non-canonical varint {}", value)));
        }
        Ok(value)
    }

    /// Read a varint used as an element count or length, bounded by the
    /// bytes left in the buffer
    pub fn read_len(&mut self) -> Result<usize> {
        let n = self.read_varint()?;
        if n > self.remaining() as u64 {
            return Err(TxError::Decode(format!(
                "length {} exceeds remaining {} bytes",
                n,
                self.remaining()
            )));
        }
        Ok(n as usize)
    }

    /// Read an element count where each element takes at least `min_size`
    /// bytes, rejecting counts the remaining buffer cannot hold
    pub fn read_count(&mut self, min_size: usize) -> Result<usize> {
        let n = self.read_varint()?;
        let fits = n
            .checked_mul(min_size.max(1) as u64)
            .map_or(false, |need| need <= self.remaining() as u64);
        if !fits {
            return Err(TxError::Decode(format!(
                "{} elements of at least {} bytes exceed remaining {} bytes",
                n,
                min_size,
                self.remaining()
            )));
        }
        Ok(n as usize)
    }

    pub fn read_varbytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_sizes() {
        assert_eq!(varint_size(0), 1);
        assert_eq!(varint_size(0xfc), 1);
        assert_eq!(varint_size(0xfd), 3);
        assert_eq!(varint_size(0xffff), 3);
        assert_eq!(varint_size(0x10000), 5);
        assert_eq!(varint_size(0xffff_ffff), 5);
        assert_eq!(varint_size(0x1_0000_0000), 9);
    }

    #[test]
    fn test_varint_encoding_matches_size() {
        for n in [0u64, 1, 0xfc, 0xfd, 0x1234, 0xffff, 0x10000, 0xdead_beef, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(&mut buf, n);
            assert_eq!(buf.len(), varint_size(n));

            let mut reader = Reader::new(&buf);
            assert_eq!(reader.read_varint().unwrap(), n);
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn test_varint_layout() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 0x1234);
        assert_eq!(buf, vec![0xfd, 0x34, 0x12]);
    }

    #[test]
    fn test_non_canonical_varint_rejected() {
        let data = [0xfd, 0x10, 0x00];
        let mut reader = Reader::new(&data);
        assert!(matches!(reader.read_varint(), Err(TxError::Decode(_))));
    }

    #[test]
    fn test_truncated_read() {
        let data = [0x01, 0x02];
        let mut reader = Reader::new(&data);
        assert!(reader.read_u32().is_err());
    }

    #[test]
    fn test_varbytes_length_exceeds_buffer() {
        let data = [0x05, 0x01, 0x02];
        let mut reader = Reader::new(&data);
        assert!(reader.read_varbytes().is_err());
    }

    #[test]
    fn test_count_bounded_by_element_size() {
        let mut data = vec![0x03];
        data.extend_from_slice(&[0u8; 80]);
        assert_eq!(Reader::new(&data).read_count(26).unwrap(), 3);
        assert!(Reader::new(&data).read_count(27).is_err());

        // Huge count, tiny buffer
        let data = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];
        assert!(matches!(
            Reader::new(&data).read_count(1),
            Err(TxError::Decode(_))
        ));
        let data = [0xfe, 0x00, 0x00, 0x00, 0x01, 0x00];
        assert!(Reader::new(&data).read_count(usize::MAX).is_err());
    }

    #[test]
    fn test_offset_tracking() {
        let data = [0u8; 12];
        let mut reader = Reader::new(&data);
        reader.read_u32().unwrap();
        assert_eq!(reader.offset(), 4);
        reader.read_u64().unwrap();
        assert_eq!(reader.offset(), 12);
        assert!(reader.is_empty());
    }
}
