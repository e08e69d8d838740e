//! Predicate expression nodes and their TLV encoding.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use log::{debug, trace};

use super::tag::{tags, BinKind, CompareOp, Metadata, HEADER_SIZE, MAX_BIN_NAME_LEN};
use super::{PredExpError, Result};

/// A single node of a flattened predicate expression.
///
/// Connectives and operators do not own their operands; the caller places
/// them in the stream around the node. Nodes are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredExp {
    /// N-ary AND over the next `n` predicates
    And(u16),
    /// N-ary OR over the next `n` predicates
    Or(u16),
    /// Negation of the following predicate
    Not,
    IntegerValue(i64),
    StringValue(String),
    /// GeoJSON text; flags and cell count are always written as zero
    GeoJsonValue(String),
    /// Bin reference. `name` must be at most 255 bytes.
    Bin { kind: BinKind, name: String },
    Metadata(Metadata),
    Compare(CompareOp),
    /// Regex match with compile flags owned by the server
    StringRegex(u32),
}

impl PredExp {
    pub fn and(nexpr: u16) -> Self {
        PredExp::And(nexpr)
    }

    pub fn or(nexpr: u16) -> Self {
        PredExp::Or(nexpr)
    }

    pub fn not() -> Self {
        PredExp::Not
    }

    pub fn integer_value(val: i64) -> Self {
        PredExp::IntegerValue(val)
    }

    pub fn string_value(val: impl Into<String>) -> Self {
        PredExp::StringValue(val.into())
    }

    pub fn geojson_value(val: impl Into<String>) -> Self {
        PredExp::GeoJsonValue(val.into())
    }

    pub fn bin(kind: BinKind, name: impl Into<String>) -> Self {
        PredExp::Bin {
            kind,
            name: name.into(),
        }
    }

    /// Bin reference without a type assertion. Such a node cannot be encoded.
    pub fn unknown_bin(name: impl Into<String>) -> Self {
        Self::bin(BinKind::Unknown, name)
    }

    pub fn integer_bin(name: impl Into<String>) -> Self {
        Self::bin(BinKind::Integer, name)
    }

    pub fn string_bin(name: impl Into<String>) -> Self {
        Self::bin(BinKind::String, name)
    }

    pub fn geojson_bin(name: impl Into<String>) -> Self {
        Self::bin(BinKind::GeoJson, name)
    }

    pub fn record_size() -> Self {
        PredExp::Metadata(Metadata::RecordSize)
    }

    pub fn last_update() -> Self {
        PredExp::Metadata(Metadata::LastUpdate)
    }

    pub fn void_time() -> Self {
        PredExp::Metadata(Metadata::VoidTime)
    }

    pub fn integer_equal() -> Self {
        PredExp::Compare(CompareOp::IntegerEqual)
    }

    pub fn integer_unequal() -> Self {
        PredExp::Compare(CompareOp::IntegerUnequal)
    }

    pub fn integer_greater() -> Self {
        PredExp::Compare(CompareOp::IntegerGreater)
    }

    pub fn integer_greater_eq() -> Self {
        PredExp::Compare(CompareOp::IntegerGreaterEq)
    }

    pub fn integer_less() -> Self {
        PredExp::Compare(CompareOp::IntegerLess)
    }

    pub fn integer_less_eq() -> Self {
        PredExp::Compare(CompareOp::IntegerLessEq)
    }

    pub fn string_equal() -> Self {
        PredExp::Compare(CompareOp::StringEqual)
    }

    pub fn string_unequal() -> Self {
        PredExp::Compare(CompareOp::StringUnequal)
    }

    pub fn geojson_within() -> Self {
        PredExp::Compare(CompareOp::GeoJsonWithin)
    }

    pub fn geojson_contains() -> Self {
        PredExp::Compare(CompareOp::GeoJsonContains)
    }

    pub fn string_regex(cflags: u32) -> Self {
        PredExp::StringRegex(cflags)
    }

    /// Wire tag written in the node header
    pub fn tag(&self) -> u16 {
        match self {
            PredExp::And(_) => tags::AND,
            PredExp::Or(_) => tags::OR,
            PredExp::Not => tags::NOT,
            PredExp::IntegerValue(_) => tags::INTEGER_VALUE,
            PredExp::StringValue(_) => tags::STRING_VALUE,
            PredExp::GeoJsonValue(_) => tags::GEOJSON_VALUE,
            PredExp::Bin { kind, .. } => kind.tag(),
            PredExp::Metadata(md) => md.tag(),
            PredExp::Compare(op) => op.tag(),
            PredExp::StringRegex(_) => tags::STRING_REGEX,
        }
    }

    /// Number of payload bytes following the header
    pub fn payload_len(&self) -> usize {
        match self {
            PredExp::And(_) | PredExp::Or(_) => 2,
            PredExp::Not | PredExp::Metadata(_) | PredExp::Compare(_) => 0,
            PredExp::IntegerValue(_) => 8,
            PredExp::StringValue(val) => val.len(),
            PredExp::GeoJsonValue(val) => {
                1 + // flags
                2 + // ncells
                val.len()
            }
            PredExp::Bin { name, .. } => 1 + name.len(),
            PredExp::StringRegex(_) => 4,
        }
    }

    /// Total encoded size, header included
    pub fn size_of(&self) -> usize {
        HEADER_SIZE + self.payload_len()
    }

    /// Check that the node can be put on the wire as-is.
    pub fn validate(&self) -> Result<()> {
        if let PredExp::Bin { kind, name } = self {
            if *kind == BinKind::Unknown {
                return Err(PredExpError::UnknownBinType { name: name.clone() });
            }
            if name.len() > MAX_BIN_NAME_LEN {
                return Err(PredExpError::BinNameTooLong { len: name.len() });
            }
        }

        check_payload_len(self.payload_len())?;
        Ok(())
    }

    /// Encode this node into `buf`. Nothing is written on error.
    pub fn encode<B: BufMut>(&self, buf: &mut B) -> Result<()> {
        self.validate()?;

        let required = self.size_of();
        let available = buf.remaining_mut();
        if available < required {
            return Err(PredExpError::SinkFull {
                required,
                available,
            });
        }

        self.write(buf);
        Ok(())
    }

    // Callers must have run `validate` and checked capacity.
    fn write<B: BufMut>(&self, buf: &mut B) {
        write_header(buf, self.tag(), self.payload_len() as u32);

        match self {
            PredExp::And(nexpr) | PredExp::Or(nexpr) => buf.put_u16(*nexpr),
            PredExp::Not | PredExp::Metadata(_) | PredExp::Compare(_) => {}
            PredExp::IntegerValue(val) => buf.put_i64(*val),
            PredExp::StringValue(val) => buf.put_slice(val.as_bytes()),
            PredExp::GeoJsonValue(val) => {
                buf.put_u8(0);
                buf.put_u16(0);
                buf.put_slice(val.as_bytes());
            }
            PredExp::Bin { name, .. } => {
                buf.put_u8(name.len() as u8);
                buf.put_slice(name.as_bytes());
            }
            PredExp::StringRegex(cflags) => buf.put_u32(*cflags),
        }
    }
}

/// Payload length as it goes in the header's 32-bit length field.
fn check_payload_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| PredExpError::ValueTooLarge { len })
}

fn write_header<B: BufMut>(buf: &mut B, tag: u16, len: u32) {
    buf.put_u16(tag);
    buf.put_u32(len);
}

impl fmt::Display for PredExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredExp::And(_) => write!(f, "AND"),
            PredExp::Or(_) => write!(f, "OR"),
            PredExp::Not => write!(f, "NOT"),
            PredExp::IntegerValue(val) => write!(f, "{}", val),
            PredExp::StringValue(val) => write!(f, "'{}'", val),
            PredExp::GeoJsonValue(val) => write!(f, "{}", val),
            PredExp::Bin { name, .. } => write!(f, "{}", name),
            PredExp::Metadata(md) => write!(f, "{}", md.as_str()),
            PredExp::Compare(op) => write!(f, "{}", op.as_str()),
            PredExp::StringRegex(_) => write!(f, "regex:"),
        }
    }
}

/// Total encoded size of a node sequence
pub fn stream_size(exps: &[PredExp]) -> usize {
    exps.iter().map(PredExp::size_of).sum()
}

/// Encode a node sequence and return the number of bytes written.
///
/// Every node is validated and the sink capacity is checked before the first
/// write, so a failed call leaves `buf` untouched.
pub fn encode_stream<B: BufMut>(exps: &[PredExp], buf: &mut B) -> Result<usize> {
    for exp in exps {
        exp.validate()?;
    }

    let required = stream_size(exps);
    let available = buf.remaining_mut();
    if available < required {
        return Err(PredExpError::SinkFull {
            required,
            available,
        });
    }

    for exp in exps {
        trace!("encode {} (tag {}, {} bytes)", exp, exp.tag(), exp.size_of());
        exp.write(buf);
    }
    debug!("encoded {} predicate nodes into {} bytes", exps.len(), required);
    Ok(required)
}

/// Encode a node sequence into a freshly allocated buffer
pub fn encode_to_bytes(exps: &[PredExp]) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(stream_size(exps));
    encode_stream(exps, &mut buf)?;
    Ok(buf.freeze())
}
