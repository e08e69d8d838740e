//! Decoding of encoded predicate streams, for inspection and testing.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use log::{debug, trace};

use super::node::PredExp;
use super::tag::{tags, BinKind, CompareOp, Metadata};
use super::{PredExpError, Result};

/// Node header: wire tag and payload length (header excluded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub tag: u16,
    pub len: u32,
}

/// Read the header at the start of `buf`.
pub fn decode_header(buf: &[u8]) -> Result<Header> {
    read_header(&mut Cursor::new(buf))
}

fn read_header(cursor: &mut Cursor<&[u8]>) -> Result<Header> {
    let offset = cursor.position() as usize;
    let truncated = |_: std::io::Error| PredExpError::Truncated { offset };
    let tag = cursor.read_u16::<BigEndian>().map_err(truncated)?;
    let len = cursor.read_u32::<BigEndian>().map_err(truncated)?;
    Ok(Header { tag, len })
}

/// Decode every node in `buf`.
pub fn decode_stream(buf: &[u8]) -> Result<Vec<PredExp>> {
    let mut cursor = Cursor::new(buf);
    let mut exps = Vec::new();

    while (cursor.position() as usize) < buf.len() {
        let header = read_header(&mut cursor)?;
        let start = cursor.position() as usize;
        let end = start
            .checked_add(header.len as usize)
            .filter(|end| *end <= buf.len())
            .ok_or(PredExpError::Truncated { offset: start })?;

        let exp = decode_payload(header, &buf[start..end])?;
        trace!("decoded {} (tag {}, {} bytes)", exp, header.tag, header.len);
        exps.push(exp);
        cursor.set_position(end as u64);
    }

    debug!("decoded {} predicate nodes from {} bytes", exps.len(), buf.len());
    Ok(exps)
}

fn decode_payload(header: Header, payload: &[u8]) -> Result<PredExp> {
    let Header { tag, len } = header;
    let invalid = |_: std::io::Error| PredExpError::InvalidLength { tag, len };
    let expect_len = |expected: usize| {
        if payload.len() == expected {
            Ok(())
        } else {
            Err(PredExpError::InvalidLength { tag, len })
        }
    };
    let mut cursor = Cursor::new(payload);

    let exp = match tag {
        tags::AND => {
            expect_len(2)?;
            PredExp::And(cursor.read_u16::<BigEndian>().map_err(invalid)?)
        }
        tags::OR => {
            expect_len(2)?;
            PredExp::Or(cursor.read_u16::<BigEndian>().map_err(invalid)?)
        }
        tags::NOT => {
            expect_len(0)?;
            PredExp::Not
        }
        tags::INTEGER_VALUE => {
            expect_len(8)?;
            PredExp::IntegerValue(cursor.read_i64::<BigEndian>().map_err(invalid)?)
        }
        tags::STRING_VALUE => PredExp::StringValue(std::str::from_utf8(payload)?.to_string()),
        tags::GEOJSON_VALUE => {
            let flags = cursor.read_u8().map_err(invalid)?;
            let ncells = cursor.read_u16::<BigEndian>().map_err(invalid)?;
            if flags != 0 || ncells != 0 {
                return Err(PredExpError::UnsupportedGeoCells { flags, ncells });
            }
            PredExp::GeoJsonValue(std::str::from_utf8(&payload[3..])?.to_string())
        }
        tags::STRING_REGEX => {
            expect_len(4)?;
            PredExp::StringRegex(cursor.read_u32::<BigEndian>().map_err(invalid)?)
        }
        _ => {
            if let Some(kind) = BinKind::from_tag(tag) {
                let name_len = cursor.read_u8().map_err(invalid)? as usize;
                expect_len(1 + name_len)?;
                PredExp::Bin {
                    kind,
                    name: std::str::from_utf8(&payload[1..])?.to_string(),
                }
            } else if let Some(md) = Metadata::from_tag(tag) {
                expect_len(0)?;
                PredExp::Metadata(md)
            } else if let Some(op) = CompareOp::from_tag(tag) {
                expect_len(0)?;
                PredExp::Compare(op)
            } else {
                return Err(PredExpError::UnknownTag(tag));
            }
        }
    };
    Ok(exp)
}
