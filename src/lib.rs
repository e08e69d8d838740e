pub mod predexp;

pub use predexp::{
    decode_header, decode_stream, encode_stream, encode_to_bytes, parse_tokens, stream_size,
    BinKind, CompareOp, Header, Metadata, Operand, PredExp, PredExpError, Predicate, Result,
    ValueType,
};
