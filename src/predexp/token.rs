//! One-token-per-node text syntax for predicate streams.
//!
//! ```text
//! and:N  or:N  not
//! int:V  str:S  geo:JSON
//! bin:NAME  int-bin:NAME  str-bin:NAME  geo-bin:NAME
//! rec.Size  rec.LastUpdate  rec.Expiration
//! int=  int!=  int>  int>=  int<  int<=  str=  str!=  geo-within  geo-contains
//! regex:FLAGS
//! ```

use std::str::FromStr;

use super::node::PredExp;
use super::tag::{BinKind, CompareOp, Metadata};
use super::{PredExpError, Result};

impl FromStr for PredExp {
    type Err = PredExpError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PredExpError::InvalidToken(s.to_string());

        if let Some((head, rest)) = s.split_once(':') {
            return match head {
                "and" => Ok(PredExp::And(rest.parse().map_err(|_| invalid())?)),
                "or" => Ok(PredExp::Or(rest.parse().map_err(|_| invalid())?)),
                "int" => Ok(PredExp::IntegerValue(rest.parse().map_err(|_| invalid())?)),
                "str" => Ok(PredExp::string_value(rest)),
                "geo" => Ok(PredExp::geojson_value(rest)),
                "bin" => Ok(PredExp::bin(BinKind::Unknown, rest)),
                "int-bin" => Ok(PredExp::bin(BinKind::Integer, rest)),
                "str-bin" => Ok(PredExp::bin(BinKind::String, rest)),
                "geo-bin" => Ok(PredExp::bin(BinKind::GeoJson, rest)),
                "regex" => Ok(PredExp::StringRegex(parse_flags(rest).ok_or_else(invalid)?)),
                _ => Err(invalid()),
            };
        }

        let exp = match s {
            "not" => PredExp::Not,
            "rec.Size" => PredExp::Metadata(Metadata::RecordSize),
            "rec.LastUpdate" => PredExp::Metadata(Metadata::LastUpdate),
            "rec.Expiration" => PredExp::Metadata(Metadata::VoidTime),
            "int=" => PredExp::Compare(CompareOp::IntegerEqual),
            "int!=" => PredExp::Compare(CompareOp::IntegerUnequal),
            "int>" => PredExp::Compare(CompareOp::IntegerGreater),
            "int>=" => PredExp::Compare(CompareOp::IntegerGreaterEq),
            "int<" => PredExp::Compare(CompareOp::IntegerLess),
            "int<=" => PredExp::Compare(CompareOp::IntegerLessEq),
            "str=" => PredExp::Compare(CompareOp::StringEqual),
            "str!=" => PredExp::Compare(CompareOp::StringUnequal),
            "geo-within" => PredExp::Compare(CompareOp::GeoJsonWithin),
            "geo-contains" => PredExp::Compare(CompareOp::GeoJsonContains),
            _ => return Err(invalid()),
        };
        Ok(exp)
    }
}

fn parse_flags(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Parse a sequence of tokens into nodes.
pub fn parse_tokens<'a, I>(tokens: I) -> Result<Vec<PredExp>>
where
    I: IntoIterator<Item = &'a str>,
{
    tokens.into_iter().map(str::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!("int:-42".parse::<PredExp>().unwrap(), PredExp::integer_value(-42));
        assert_eq!("str:a:b".parse::<PredExp>().unwrap(), PredExp::string_value("a:b"));
        assert_eq!("str:".parse::<PredExp>().unwrap(), PredExp::string_value(""));
        assert_eq!(
            r#"geo:{"type":"Point"}"#.parse::<PredExp>().unwrap(),
            PredExp::geojson_value(r#"{"type":"Point"}"#)
        );
    }

    #[test]
    fn test_parse_bins_and_metadata() {
        assert_eq!("int-bin:age".parse::<PredExp>().unwrap(), PredExp::integer_bin("age"));
        assert_eq!("str-bin:n".parse::<PredExp>().unwrap(), PredExp::string_bin("n"));
        assert_eq!("geo-bin:loc".parse::<PredExp>().unwrap(), PredExp::geojson_bin("loc"));
        assert_eq!("bin:x".parse::<PredExp>().unwrap(), PredExp::unknown_bin("x"));
        assert_eq!("rec.Expiration".parse::<PredExp>().unwrap(), PredExp::void_time());
        assert_eq!("rec.Size".parse::<PredExp>().unwrap(), PredExp::record_size());
    }

    #[test]
    fn test_parse_operators() {
        assert_eq!("and:2".parse::<PredExp>().unwrap(), PredExp::and(2));
        assert_eq!("or:65535".parse::<PredExp>().unwrap(), PredExp::or(65535));
        assert_eq!("not".parse::<PredExp>().unwrap(), PredExp::not());
        assert_eq!("int>=".parse::<PredExp>().unwrap(), PredExp::integer_greater_eq());
        assert_eq!("str!=".parse::<PredExp>().unwrap(), PredExp::string_unequal());
        assert_eq!("geo-within".parse::<PredExp>().unwrap(), PredExp::geojson_within());
        assert_eq!("regex:3".parse::<PredExp>().unwrap(), PredExp::string_regex(3));
        assert_eq!("regex:0x10".parse::<PredExp>().unwrap(), PredExp::string_regex(16));
    }

    #[test]
    fn test_parse_invalid() {
        for token in ["and:-1", "or:70000", "int:abc", "regex:0xZZ", "foo:1", "=", "AND"] {
            assert_eq!(
                token.parse::<PredExp>(),
                Err(PredExpError::InvalidToken(token.to_string())),
                "token {}",
                token
            );
        }
    }

    #[test]
    fn test_parse_tokens() {
        let exps = parse_tokens("int-bin:age int:18 int>=".split_whitespace()).unwrap();
        assert_eq!(
            exps,
            vec![
                PredExp::integer_bin("age"),
                PredExp::integer_value(18),
                PredExp::integer_greater_eq(),
            ]
        );
        assert!(parse_tokens(["not", "bogus"]).is_err());
    }
}
