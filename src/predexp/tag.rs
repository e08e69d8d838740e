//! Wire tags and the closed operator/accessor families.

/// Server-defined tag registry. These values are part of the wire protocol.
pub mod tags {
    /// Placeholder tag for a bin without an asserted type. Never written.
    pub const UNKNOWN_BIN: u16 = u16::MAX;

    pub const AND: u16 = 1;
    pub const OR: u16 = 2;
    pub const NOT: u16 = 3;

    pub const INTEGER_VALUE: u16 = 10;
    pub const STRING_VALUE: u16 = 11;
    pub const GEOJSON_VALUE: u16 = 12;

    pub const INTEGER_BIN: u16 = 100;
    pub const STRING_BIN: u16 = 101;
    pub const GEOJSON_BIN: u16 = 102;

    pub const RECSIZE: u16 = 150;
    pub const LAST_UPDATE: u16 = 151;
    pub const VOID_TIME: u16 = 152;

    pub const INTEGER_EQUAL: u16 = 200;
    pub const INTEGER_UNEQUAL: u16 = 201;
    pub const INTEGER_GREATER: u16 = 202;
    pub const INTEGER_GREATEREQ: u16 = 203;
    pub const INTEGER_LESS: u16 = 204;
    pub const INTEGER_LESSEQ: u16 = 205;

    pub const STRING_EQUAL: u16 = 210;
    pub const STRING_UNEQUAL: u16 = 211;
    pub const STRING_REGEX: u16 = 212;

    pub const GEOJSON_WITHIN: u16 = 220;
    pub const GEOJSON_CONTAINS: u16 = 221;
}

/// Size of the tag + length header preceding every payload.
pub const HEADER_SIZE: usize = 2 + 4;

/// Bin names are length-prefixed with a single byte.
pub const MAX_BIN_NAME_LEN: usize = u8::MAX as usize;

/// Value type an operand produces on the server side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    String,
    GeoJson,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Integer => "integer",
            ValueType::String => "string",
            ValueType::GeoJson => "geojson",
        }
    }
}

/// Asserted type of a bin reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinKind {
    Unknown,
    Integer,
    String,
    GeoJson,
}

impl BinKind {
    pub fn tag(&self) -> u16 {
        match self {
            BinKind::Unknown => tags::UNKNOWN_BIN,
            BinKind::Integer => tags::INTEGER_BIN,
            BinKind::String => tags::STRING_BIN,
            BinKind::GeoJson => tags::GEOJSON_BIN,
        }
    }

    /// The sentinel tag is not a wire tag, so `Unknown` is never returned.
    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            tags::INTEGER_BIN => Some(BinKind::Integer),
            tags::STRING_BIN => Some(BinKind::String),
            tags::GEOJSON_BIN => Some(BinKind::GeoJson),
            _ => None,
        }
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            BinKind::Unknown => None,
            BinKind::Integer => Some(ValueType::Integer),
            BinKind::String => Some(ValueType::String),
            BinKind::GeoJson => Some(ValueType::GeoJson),
        }
    }
}

/// Record metadata accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metadata {
    /// Stored size of the record
    RecordSize,
    /// Last update time
    LastUpdate,
    /// Expiration time
    VoidTime,
}

impl Metadata {
    pub fn tag(&self) -> u16 {
        match self {
            Metadata::RecordSize => tags::RECSIZE,
            Metadata::LastUpdate => tags::LAST_UPDATE,
            Metadata::VoidTime => tags::VOID_TIME,
        }
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            tags::RECSIZE => Some(Metadata::RecordSize),
            tags::LAST_UPDATE => Some(Metadata::LastUpdate),
            tags::VOID_TIME => Some(Metadata::VoidTime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metadata::RecordSize => "rec.Size",
            Metadata::LastUpdate => "rec.LastUpdate",
            Metadata::VoidTime => "rec.Expiration",
        }
    }
}

/// Comparison operators. Operands are the two nodes preceding the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    IntegerEqual,
    IntegerUnequal,
    IntegerGreater,
    IntegerGreaterEq,
    IntegerLess,
    IntegerLessEq,
    StringEqual,
    StringUnequal,
    GeoJsonWithin,
    GeoJsonContains,
}

impl CompareOp {
    pub fn tag(&self) -> u16 {
        match self {
            CompareOp::IntegerEqual => tags::INTEGER_EQUAL,
            CompareOp::IntegerUnequal => tags::INTEGER_UNEQUAL,
            CompareOp::IntegerGreater => tags::INTEGER_GREATER,
            CompareOp::IntegerGreaterEq => tags::INTEGER_GREATEREQ,
            CompareOp::IntegerLess => tags::INTEGER_LESS,
            CompareOp::IntegerLessEq => tags::INTEGER_LESSEQ,
            CompareOp::StringEqual => tags::STRING_EQUAL,
            CompareOp::StringUnequal => tags::STRING_UNEQUAL,
            CompareOp::GeoJsonWithin => tags::GEOJSON_WITHIN,
            CompareOp::GeoJsonContains => tags::GEOJSON_CONTAINS,
        }
    }

    pub fn from_tag(tag: u16) -> Option<Self> {
        match tag {
            tags::INTEGER_EQUAL => Some(CompareOp::IntegerEqual),
            tags::INTEGER_UNEQUAL => Some(CompareOp::IntegerUnequal),
            tags::INTEGER_GREATER => Some(CompareOp::IntegerGreater),
            tags::INTEGER_GREATEREQ => Some(CompareOp::IntegerGreaterEq),
            tags::INTEGER_LESS => Some(CompareOp::IntegerLess),
            tags::INTEGER_LESSEQ => Some(CompareOp::IntegerLessEq),
            tags::STRING_EQUAL => Some(CompareOp::StringEqual),
            tags::STRING_UNEQUAL => Some(CompareOp::StringUnequal),
            tags::GEOJSON_WITHIN => Some(CompareOp::GeoJsonWithin),
            tags::GEOJSON_CONTAINS => Some(CompareOp::GeoJsonContains),
            _ => None,
        }
    }

    /// Type both operands must have
    pub fn operand_type(&self) -> ValueType {
        match self {
            CompareOp::IntegerEqual
            | CompareOp::IntegerUnequal
            | CompareOp::IntegerGreater
            | CompareOp::IntegerGreaterEq
            | CompareOp::IntegerLess
            | CompareOp::IntegerLessEq => ValueType::Integer,

            CompareOp::StringEqual | CompareOp::StringUnequal => ValueType::String,

            CompareOp::GeoJsonWithin | CompareOp::GeoJsonContains => ValueType::GeoJson,
        }
    }

    /// Display symbol. Integer and string equality share `=` and `!=`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::IntegerEqual | CompareOp::StringEqual => "=",
            CompareOp::IntegerUnequal | CompareOp::StringUnequal => "!=",
            CompareOp::IntegerGreater => ">",
            CompareOp::IntegerGreaterEq => ">=",
            CompareOp::IntegerLess => "<",
            CompareOp::IntegerLessEq => "<=",
            CompareOp::GeoJsonWithin => "WITHIN",
            CompareOp::GeoJsonContains => "CONTAINS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPS: [CompareOp; 10] = [
        CompareOp::IntegerEqual,
        CompareOp::IntegerUnequal,
        CompareOp::IntegerGreater,
        CompareOp::IntegerGreaterEq,
        CompareOp::IntegerLess,
        CompareOp::IntegerLessEq,
        CompareOp::StringEqual,
        CompareOp::StringUnequal,
        CompareOp::GeoJsonWithin,
        CompareOp::GeoJsonContains,
    ];

    #[test]
    fn test_compare_tags() {
        assert_eq!(CompareOp::IntegerEqual.tag(), 200);
        assert_eq!(CompareOp::IntegerLessEq.tag(), 205);
        assert_eq!(CompareOp::StringEqual.tag(), 210);
        assert_eq!(CompareOp::StringUnequal.tag(), 211);
        assert_eq!(CompareOp::GeoJsonWithin.tag(), 220);
        assert_eq!(CompareOp::GeoJsonContains.tag(), 221);

        for op in ALL_OPS {
            assert_eq!(CompareOp::from_tag(op.tag()), Some(op));
        }
        // Regex matching carries flags and is a node of its own
        assert_eq!(CompareOp::from_tag(tags::STRING_REGEX), None);
    }

    #[test]
    fn test_compare_operand_types() {
        assert_eq!(CompareOp::IntegerGreater.operand_type(), ValueType::Integer);
        assert_eq!(CompareOp::StringUnequal.operand_type(), ValueType::String);
        assert_eq!(CompareOp::GeoJsonContains.operand_type(), ValueType::GeoJson);
    }

    #[test]
    fn test_compare_symbols() {
        assert_eq!(CompareOp::IntegerEqual.as_str(), "=");
        assert_eq!(CompareOp::StringEqual.as_str(), "=");
        assert_eq!(CompareOp::StringUnequal.as_str(), "!=");
        assert_eq!(CompareOp::IntegerGreaterEq.as_str(), ">=");
        assert_eq!(CompareOp::GeoJsonWithin.as_str(), "WITHIN");
    }

    #[test]
    fn test_metadata() {
        assert_eq!(Metadata::RecordSize.tag(), 150);
        assert_eq!(Metadata::LastUpdate.tag(), 151);
        assert_eq!(Metadata::VoidTime.tag(), 152);
        assert_eq!(Metadata::from_tag(152), Some(Metadata::VoidTime));
        assert_eq!(Metadata::from_tag(153), None);
        assert_eq!(Metadata::VoidTime.as_str(), "rec.Expiration");
    }

    #[test]
    fn test_bin_kinds() {
        assert_eq!(BinKind::Unknown.tag(), 0xFFFF);
        assert_eq!(BinKind::Integer.tag(), 100);
        assert_eq!(BinKind::from_tag(101), Some(BinKind::String));
        assert_eq!(BinKind::from_tag(tags::UNKNOWN_BIN), None);
        assert_eq!(BinKind::Unknown.value_type(), None);
        assert_eq!(BinKind::GeoJson.value_type(), Some(ValueType::GeoJson));
    }
}
