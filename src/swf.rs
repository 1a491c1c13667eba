use std::sync::Arc;

use nom::{IResult, Parser, bits::bits, bits::complete::take};
use tracing::{debug, trace};

use crate::abc::Abc;
use crate::consts::{SWF_TAG_DO_ABC, SWF_TAG_DO_ABC_DEFINE, SWF_TAG_END};
use crate::error::{Error, Result};
use crate::processor::Processor;
use crate::reader::ByteReader;

type BitInput<'i> = (&'i [u8], usize);

/// Movie bounds in twips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwfHeader {
    pub compressed: bool,
    pub version: u8,
    /// Uncompressed length declared by the file.
    pub length: u32,
    pub frame_size: Rect,
    /// 8.8 fixed point.
    pub frame_rate: u16,
    pub frame_count: u16,
}

impl SwfHeader {
    pub fn frames_per_second(&self) -> f32 {
        self.frame_rate as f32 / 256.0
    }
}

/// An ABC module found in a tag.
#[derive(Debug)]
pub struct AbcTag {
    /// Lazy-initialization flags, only in `DoABC` tags.
    pub flags: Option<u32>,
    pub name: Option<Arc<str>>,
    pub abc: Abc,
}

#[derive(Debug)]
pub struct Swf {
    pub(crate) header: SwfHeader,
    pub(crate) abcs: Vec<AbcTag>,
}

impl Swf {
    /// Whether `data` starts with one of the SWF signatures.
    pub fn sniff(data: &[u8]) -> bool {
        matches!(data.get(..3), Some(b"FWS" | b"CWS" | b"ZWS"))
    }

    pub fn parse(data: &[u8], processor: &mut dyn Processor) -> Result<Swf> {
        parse_swf(data, &mut *processor).inspect_err(|err| processor.has_error(&err.to_string()))
    }

    pub fn header(&self) -> &SwfHeader {
        &self.header
    }

    pub fn abcs(&self) -> &[AbcTag] {
        &self.abcs
    }

    pub fn into_abcs(self) -> Vec<AbcTag> {
        self.abcs
    }
}

fn parse_swf(data: &[u8], processor: &mut dyn Processor) -> Result<Swf> {
    let mut reader = ByteReader::new(data);
    let mut signature = [0u8; 3];
    for byte in &mut signature {
        *byte = reader.read_u8()?;
    }
    let compressed = match &signature {
        b"FWS" => false,
        b"CWS" => true,
        b"ZWS" => return Err(Error::UnsupportedCompression { signature }),
        _ => return Err(Error::InvalidSignature { found: signature }),
    };
    let version = reader.read_u8()?;
    let length = reader.read_u32()?;
    if compressed {
        reader.decompress_remaining()?;
    }

    let frame_size = reader.run(1, parse_rect)?;
    let frame_rate = reader.read_u16()?;
    let frame_count = reader.read_u16()?;
    let header = SwfHeader {
        compressed,
        version,
        length,
        frame_size,
        frame_rate,
        frame_count,
    };
    debug!(version, length, compressed, frame_count, "swf header");

    let mut abcs = Vec::new();
    while !reader.is_at_end() {
        let offset = reader.position();
        let code_and_length = reader.read_u16()?;
        let code = code_and_length >> 6;
        let mut length = (code_and_length & 0x3f) as usize;
        if length == 0x3f {
            length = reader.read_u32()? as usize;
        }

        match code {
            SWF_TAG_END => break,
            SWF_TAG_DO_ABC => {
                let start = reader.position();
                let flags = reader.read_u32()?;
                let name = reader.read_c_string()?;
                let prefix = reader.position() - start;
                let abc_length = length.checked_sub(prefix).ok_or(Error::UnexpectedEof {
                    offset: start,
                    need: prefix,
                })?;
                let bytes = reader.read_bytes(abc_length)?;
                debug!(offset, name = &*name, size = abc_length, "DoABC");
                abcs.push(AbcTag {
                    flags: Some(flags),
                    name: Some(name),
                    abc: Abc::decode(&bytes, &mut *processor)?,
                });
            }
            SWF_TAG_DO_ABC_DEFINE => {
                let bytes = reader.read_bytes(length)?;
                debug!(offset, size = length, "DoABCDefine");
                abcs.push(AbcTag {
                    flags: None,
                    name: None,
                    abc: Abc::decode(&bytes, &mut *processor)?,
                });
            }
            _ => {
                trace!(offset, code, length, "skipping tag");
                reader.skip(length)?;
            }
        }
    }

    Ok(Swf { header, abcs })
}

fn sign_extend(value: u32, width: usize) -> i32 {
    if width == 0 {
        return 0;
    }
    let shift = 32 - width as u32;
    ((value << shift) as i32) >> shift
}

/// Bit-packed rect: a 5-bit field width, then four signed fields, MSB first.
fn parse_rect(input: &[u8]) -> IResult<&[u8], Rect> {
    bits(rect).parse(input)
}

fn rect(input: BitInput<'_>) -> IResult<BitInput<'_>, Rect> {
    let width: IResult<BitInput<'_>, usize> = take(5usize).parse(input);
    let (mut input, width) = width?;
    let mut fields = [0i32; 4];
    for field in &mut fields {
        let raw: IResult<BitInput<'_>, u32> = take(width).parse(input);
        let value;
        (input, value) = raw?;
        *field = sign_extend(value, width);
    }
    let [x_min, x_max, y_min, y_max] = fields;
    Ok((
        input,
        Rect {
            x_min,
            x_max,
            y_min,
            y_max,
        },
    ))
}
