use std::borrow::Cow;
use std::io::{self, Read};
use std::sync::Arc;

use flate2::read::ZlibDecoder;
use nom::{
    IResult,
    bytes::complete::{take, take_till},
    number::complete::{be_i32, be_u16, be_u32, i8, le_i24, le_i32, le_u16, le_u32, u8},
};
use tracing::warn;

use crate::error::{Error, Result};

type NomError<'i> = nom::error::Error<&'i [u8]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Cursor over an immutable byte buffer.
///
/// All primitive reads go through nom's complete parsers; a parser running
/// out of input surfaces as [`Error::UnexpectedEof`] at the cursor position.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: Cow<'a, [u8]>,
    position: usize,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endian(data, Endian::Little)
    }

    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data: Cow::Borrowed(data),
            position: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bytes from the cursor to the end of the buffer.
    pub fn rest(&self) -> &[u8] {
        &self.data[self.position..]
    }

    /// Runs a nom parser on the unread bytes and advances past what it consumed.
    pub(crate) fn run<O>(
        &mut self,
        need: usize,
        parser: impl FnOnce(&[u8]) -> IResult<&[u8], O>,
    ) -> Result<O> {
        let input = &self.data[self.position..];
        match parser(input) {
            Ok((rest, value)) => {
                self.position += input.len() - rest.len();
                Ok(value)
            }
            Err(_) => Err(Error::UnexpectedEof {
                offset: self.position,
                need,
            }),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.run(1, |input| u8(input))
    }

    pub fn read_s8(&mut self) -> Result<i8> {
        self.run(1, |input| i8(input))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        match self.endian {
            Endian::Little => self.run(2, |input| le_u16(input)),
            Endian::Big => self.run(2, |input| be_u16(input)),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        match self.endian {
            Endian::Little => self.run(4, |input| le_u32(input)),
            Endian::Big => self.run(4, |input| be_u32(input)),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        match self.endian {
            Endian::Little => self.run(4, |input| le_i32(input)),
            Endian::Big => self.run(4, |input| be_i32(input)),
        }
    }

    /// Signed 24-bit value, always little-endian (branch operands).
    pub fn read_s24(&mut self) -> Result<i32> {
        self.run(3, |input| le_i24(input))
    }

    pub fn read_double(&mut self) -> Result<f64> {
        let first = self.read_u32()? as u64;
        let second = self.read_u32()? as u64;
        let bits = match self.endian {
            Endian::Little => second << 32 | first,
            Endian::Big => first << 32 | second,
        };
        Ok(f64::from_bits(bits))
    }

    /// Base-128 varint, low group first, at most five groups.
    pub fn read_var_u32(&mut self) -> Result<u32> {
        let start = self.position;
        let mut result = 0u32;
        for group in 0..4 {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7f) as u32) << (7 * group);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        let last = self.read_u8()?;
        if last & 0x80 != 0 {
            return Err(Error::VarintOverflow { offset: start });
        }
        Ok(result | ((last & 0x0f) as u32) << 28)
    }

    pub fn read_var_s32(&mut self) -> Result<i32> {
        Ok(self.read_var_u32()? as i32)
    }

    pub fn read_utf8(&mut self, length: usize) -> Result<Arc<str>> {
        let start = self.position;
        self.skip(length)?;
        let text = String::from_utf8_lossy(&self.data[start..start + length]);
        if let Cow::Owned(_) = text {
            warn!(offset = start, "string is not valid utf-8, decoded lossily");
        }
        Ok(Arc::from(text.as_ref()))
    }

    /// Null-terminated string; the terminator is consumed but not returned.
    pub fn read_c_string(&mut self) -> Result<Arc<str>> {
        let start = self.position;
        let length = self.run(1, |input| {
            let (input, bytes) = take_till::<_, _, NomError>(|b| b == 0)(input)?;
            let (input, _) = u8::<_, NomError>(input)?;
            Ok((input, bytes.len()))
        })?;
        let text = String::from_utf8_lossy(&self.data[start..start + length]);
        Ok(Arc::from(text.as_ref()))
    }

    /// Detaches the next `length` bytes into their own buffer.
    pub fn read_bytes(&mut self, length: usize) -> Result<Arc<[u8]>> {
        self.run(length, |input| {
            let (input, bytes) = take::<_, _, NomError>(length)(input)?;
            Ok((input, Arc::from(bytes)))
        })
    }

    pub fn skip(&mut self, length: usize) -> Result<()> {
        self.run(length, |input| {
            let (input, _) = take::<_, _, NomError>(length)(input)?;
            Ok((input, ()))
        })
    }

    /// Replaces everything after the cursor with its zlib expansion.
    pub fn decompress_remaining(&mut self) -> Result<()> {
        let (head, tail) = self.data.split_at(self.position);
        let expanded = inflate(head, tail)?;
        self.data = Cow::Owned(expanded);
        Ok(())
    }
}

fn inflate(head: &[u8], tail: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(tail);
    let mut expanded = Vec::with_capacity(head.len() + tail.len() * 2);
    expanded.extend_from_slice(head);
    let mut scratch = vec![0u8; tail.len().max(1024)];
    loop {
        let read = decoder.read(&mut scratch)?;
        if read == 0 {
            break;
        }
        expanded.extend_from_slice(&scratch[..read]);
        if read == scratch.len() {
            scratch.resize(scratch.len() * 2, 0);
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use proptest::prelude::*;
    use std::io::Write;

    fn encode_var_u32(mut value: u32, out: &mut Vec<u8>) {
        loop {
            let group = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                out.push(group);
                return;
            }
            out.push(group | 0x80);
        }
    }

    #[test]
    fn test_var_u32_group_boundaries() {
        for value in [0, 0x7f, 0x80, 0x3fff, 0x4000, 0x1f_ffff, 0x20_0000, 0x0fff_ffff] {
            let mut bytes = Vec::new();
            encode_var_u32(value, &mut bytes);
            let mut reader = ByteReader::new(&bytes);
            assert_eq!(reader.read_var_u32().unwrap(), value);
            assert!(reader.is_at_end());
        }
    }

    #[test]
    fn test_var_u32_fifth_group_low_bits() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0x0f];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_var_u32().unwrap(), u32::MAX);
    }

    #[test]
    fn test_var_u32_sixth_group_rejected() {
        let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_var_u32(),
            Err(Error::VarintOverflow { offset: 0 })
        ));
    }

    #[test]
    fn test_truncated_read() {
        let bytes = [0x01, 0x02, 0x03];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u8().unwrap();
        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof { offset: 1, need: 4 })
        ));
        // failed reads leave the cursor alone
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_endianness() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        let mut little = ByteReader::new(&bytes);
        assert_eq!(little.read_u16().unwrap(), 0x3412);
        let mut big = ByteReader::with_endian(&bytes, Endian::Big);
        assert_eq!(big.read_u16().unwrap(), 0x1234);
        assert_eq!(big.read_u16().unwrap(), 0x5678);
    }

    #[test]
    fn test_read_double() {
        let bytes = 1.5f64.to_le_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_double().unwrap(), 1.5);

        let bytes = (-2.25f64).to_be_bytes();
        let mut reader = ByteReader::with_endian(&bytes, Endian::Big);
        assert_eq!(reader.read_double().unwrap(), -2.25);
    }

    #[test]
    fn test_read_s24() {
        let bytes = [0xfd, 0xff, 0xff, 0x05, 0x00, 0x00];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_s24().unwrap(), -3);
        assert_eq!(reader.read_s24().unwrap(), 5);
    }

    #[test]
    fn test_strings_and_bytes() {
        let bytes = b"abcname\0rest";
        let mut reader = ByteReader::new(bytes);
        assert_eq!(&*reader.read_utf8(3).unwrap(), "abc");
        assert_eq!(&*reader.read_c_string().unwrap(), "name");
        assert_eq!(&*reader.read_bytes(4).unwrap(), b"rest");
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_decompress_remaining() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&payload).unwrap();
        let mut bytes = b"HEAD".to_vec();
        bytes.extend(encoder.finish().unwrap());

        let mut reader = ByteReader::new(&bytes);
        reader.skip(4).unwrap();
        reader.decompress_remaining().unwrap();
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.len(), 4 + payload.len());
        assert_eq!(&reader.as_slice()[..4], b"HEAD");
        assert_eq!(reader.rest(), payload.as_slice());
    }

    proptest! {
        #[test]
        fn prop_var_u32_roundtrip(value in 0u32..(1 << 28)) {
            let mut bytes = Vec::new();
            encode_var_u32(value, &mut bytes);
            let mut reader = ByteReader::new(&bytes);
            prop_assert_eq!(reader.read_var_u32().unwrap(), value);
            prop_assert_eq!(reader.position(), bytes.len());
        }
    }
}
