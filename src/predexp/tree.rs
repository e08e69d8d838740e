//! Owned predicate trees that flatten to a checked node stream.
//!
//! The node-level API lets callers emit any sequence, including ones whose
//! connective counts do not match what follows. `Predicate` is the strict
//! path: it is acyclic by construction, type-checks its comparisons and
//! produces child counts from the actual children.
//!
//! Stream order: connectives come before their children, comparisons come
//! after their two operands.

use std::fmt;

use super::node::PredExp;
use super::tag::{BinKind, CompareOp, Metadata, ValueType};
use super::{PredExpError, Result};

/// Maximum nesting depth accepted when parsing a stream
const MAX_DEPTH: usize = 64;

/// Leaf value participating in a comparison
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Integer(i64),
    String(String),
    GeoJson(String),
    Bin { kind: BinKind, name: String },
    Metadata(Metadata),
}

impl Operand {
    pub fn integer(val: i64) -> Self {
        Operand::Integer(val)
    }

    pub fn string(val: impl Into<String>) -> Self {
        Operand::String(val.into())
    }

    pub fn geojson(val: impl Into<String>) -> Self {
        Operand::GeoJson(val.into())
    }

    pub fn integer_bin(name: impl Into<String>) -> Self {
        Operand::Bin {
            kind: BinKind::Integer,
            name: name.into(),
        }
    }

    pub fn string_bin(name: impl Into<String>) -> Self {
        Operand::Bin {
            kind: BinKind::String,
            name: name.into(),
        }
    }

    pub fn geojson_bin(name: impl Into<String>) -> Self {
        Operand::Bin {
            kind: BinKind::GeoJson,
            name: name.into(),
        }
    }

    pub fn unknown_bin(name: impl Into<String>) -> Self {
        Operand::Bin {
            kind: BinKind::Unknown,
            name: name.into(),
        }
    }

    pub fn record_size() -> Self {
        Operand::Metadata(Metadata::RecordSize)
    }

    pub fn last_update() -> Self {
        Operand::Metadata(Metadata::LastUpdate)
    }

    pub fn void_time() -> Self {
        Operand::Metadata(Metadata::VoidTime)
    }

    /// Type produced by this operand. `None` for a bin without a type.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Operand::Integer(_) | Operand::Metadata(_) => Some(ValueType::Integer),
            Operand::String(_) => Some(ValueType::String),
            Operand::GeoJson(_) => Some(ValueType::GeoJson),
            Operand::Bin { kind, .. } => kind.value_type(),
        }
    }

    pub fn to_exp(&self) -> PredExp {
        match self {
            Operand::Integer(val) => PredExp::IntegerValue(*val),
            Operand::String(val) => PredExp::StringValue(val.clone()),
            Operand::GeoJson(val) => PredExp::GeoJsonValue(val.clone()),
            Operand::Bin { kind, name } => PredExp::bin(*kind, name.clone()),
            Operand::Metadata(md) => PredExp::Metadata(*md),
        }
    }

    fn from_exp(exp: &PredExp) -> Option<Self> {
        match exp {
            PredExp::IntegerValue(val) => Some(Operand::Integer(*val)),
            PredExp::StringValue(val) => Some(Operand::String(val.clone())),
            PredExp::GeoJsonValue(val) => Some(Operand::GeoJson(val.clone())),
            PredExp::Bin { kind, name } => Some(Operand::Bin {
                kind: *kind,
                name: name.clone(),
            }),
            PredExp::Metadata(md) => Some(Operand::Metadata(*md)),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_exp())
    }
}

/// Predicate expression tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    /// `left` matched against the regular expression in `pattern`
    Regex {
        left: Operand,
        pattern: Operand,
        flags: u32,
    },
}

impl Predicate {
    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }

    pub fn not(child: Predicate) -> Self {
        Predicate::Not(Box::new(child))
    }

    pub fn compare(op: CompareOp, left: Operand, right: Operand) -> Self {
        Predicate::Compare { op, left, right }
    }

    pub fn regex(left: Operand, pattern: impl Into<String>, flags: u32) -> Self {
        Predicate::Regex {
            left,
            pattern: Operand::String(pattern.into()),
            flags,
        }
    }

    /// Validate connective arity and operand types.
    pub fn check(&self) -> Result<()> {
        match self {
            Predicate::And(children) => check_children("AND", children),
            Predicate::Or(children) => check_children("OR", children),
            Predicate::Not(child) => child.check(),
            Predicate::Compare { op, left, right } => {
                let expected = op.operand_type();
                check_operand(op.as_str(), expected, left)?;
                check_operand(op.as_str(), expected, right)
            }
            Predicate::Regex { left, pattern, .. } => {
                check_operand("~=", ValueType::String, left)?;
                check_operand("~=", ValueType::String, pattern)
            }
        }
    }

    /// Check the tree and produce its node stream.
    pub fn flatten(&self) -> Result<Vec<PredExp>> {
        self.check()?;
        let mut exps = Vec::new();
        self.flatten_into(&mut exps);
        Ok(exps)
    }

    // Counts were checked to fit in u16.
    fn flatten_into(&self, exps: &mut Vec<PredExp>) {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                let nexpr = children.len() as u16;
                exps.push(match self {
                    Predicate::And(_) => PredExp::And(nexpr),
                    _ => PredExp::Or(nexpr),
                });
                for child in children {
                    child.flatten_into(exps);
                }
            }
            Predicate::Not(child) => {
                exps.push(PredExp::Not);
                child.flatten_into(exps);
            }
            Predicate::Compare { op, left, right } => {
                exps.push(left.to_exp());
                exps.push(right.to_exp());
                exps.push(PredExp::Compare(*op));
            }
            Predicate::Regex {
                left,
                pattern,
                flags,
            } => {
                exps.push(left.to_exp());
                exps.push(pattern.to_exp());
                exps.push(PredExp::StringRegex(*flags));
            }
        }
    }

    /// Rebuild a tree from a node stream, rejecting streams whose shape or
    /// operand types are invalid.
    pub fn parse(exps: &[PredExp]) -> Result<Self> {
        let mut parser = StreamParser { exps, pos: 0 };
        let predicate = parser.parse_predicate(0)?;
        if parser.pos != exps.len() {
            return Err(PredExpError::MalformedExpression(format!(
                "{} trailing node(s) after complete predicate",
                exps.len() - parser.pos
            )));
        }
        predicate.check()?;
        Ok(predicate)
    }
}

fn check_children(connective: &'static str, children: &[Predicate]) -> Result<()> {
    if children.is_empty() {
        return Err(PredExpError::MalformedExpression(format!(
            "{} requires at least one child",
            connective
        )));
    }
    if children.len() > u16::MAX as usize {
        return Err(PredExpError::TooManyChildren {
            connective,
            count: children.len(),
        });
    }
    children.iter().try_for_each(Predicate::check)
}

fn check_operand(operator: &str, expected: ValueType, operand: &Operand) -> Result<()> {
    match operand.value_type() {
        // Untyped bins pass here and are refused by the encoder.
        None => Ok(()),
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(PredExpError::InvalidOperand {
            operator: operator.to_string(),
            operand: format!(
                "{} is {}, expected {}",
                operand,
                actual.as_str(),
                expected.as_str()
            ),
        }),
    }
}

struct StreamParser<'a> {
    exps: &'a [PredExp],
    pos: usize,
}

impl<'a> StreamParser<'a> {
    fn next(&mut self, expected: &str) -> Result<&'a PredExp> {
        let exp = self.exps.get(self.pos).ok_or_else(|| {
            PredExpError::MalformedExpression(format!(
                "stream ended, expected {} at node {}",
                expected, self.pos
            ))
        })?;
        self.pos += 1;
        Ok(exp)
    }

    fn parse_predicate(&mut self, depth: usize) -> Result<Predicate> {
        if depth > MAX_DEPTH {
            return Err(PredExpError::MalformedExpression(format!(
                "nesting exceeds maximum depth of {}",
                MAX_DEPTH
            )));
        }

        match self.next("predicate")? {
            PredExp::And(nexpr) => Ok(Predicate::And(self.parse_children(*nexpr, depth)?)),
            PredExp::Or(nexpr) => Ok(Predicate::Or(self.parse_children(*nexpr, depth)?)),
            PredExp::Not => Ok(Predicate::not(self.parse_predicate(depth + 1)?)),
            exp => {
                let left = self.expect_operand(exp)?;
                let next = self.next("operand")?;
                let right = self.expect_operand(next)?;
                match self.next("operator")? {
                    PredExp::Compare(op) => Ok(Predicate::compare(*op, left, right)),
                    PredExp::StringRegex(flags) => Ok(Predicate::Regex {
                        left,
                        pattern: right,
                        flags: *flags,
                    }),
                    other => Err(PredExpError::MalformedExpression(format!(
                        "expected operator at node {}, found {}",
                        self.pos - 1,
                        other
                    ))),
                }
            }
        }
    }

    fn parse_children(&mut self, nexpr: u16, depth: usize) -> Result<Vec<Predicate>> {
        (0..nexpr)
            .map(|_| self.parse_predicate(depth + 1))
            .collect()
    }

    fn expect_operand(&self, exp: &PredExp) -> Result<Operand> {
        Operand::from_exp(exp).ok_or_else(|| {
            PredExpError::MalformedExpression(format!(
                "expected operand at node {}, found {}",
                self.pos - 1,
                exp
            ))
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                let connective = match self {
                    Predicate::And(_) => " AND ",
                    _ => " OR ",
                };
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", connective)?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
            Predicate::Not(child) => match child.as_ref() {
                Predicate::Compare { .. } | Predicate::Regex { .. } => {
                    write!(f, "NOT ({})", child)
                }
                _ => write!(f, "NOT {}", child),
            },
            Predicate::Compare { op, left, right } => {
                write!(f, "{} {} {}", left, op.as_str(), right)
            }
            Predicate::Regex { left, pattern, .. } => write!(f, "{} ~= {}", left, pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adult() -> Predicate {
        Predicate::compare(
            CompareOp::IntegerGreaterEq,
            Operand::integer_bin("age"),
            Operand::integer(18),
        )
    }

    #[test]
    fn test_flatten_compare() {
        assert_eq!(
            adult().flatten().unwrap(),
            vec![
                PredExp::integer_bin("age"),
                PredExp::integer_value(18),
                PredExp::integer_greater_eq(),
            ]
        );
    }

    #[test]
    fn test_flatten_connectives() {
        let pred = Predicate::or(vec![
            adult(),
            Predicate::not(Predicate::regex(Operand::string_bin("name"), "^a", 1)),
            Predicate::compare(
                CompareOp::IntegerLess,
                Operand::void_time(),
                Operand::integer(1000),
            ),
        ]);
        let exps = pred.flatten().unwrap();
        assert_eq!(exps.len(), 1 + 3 + 1 + 3 + 3);
        assert_eq!(exps[0], PredExp::or(3));
        assert_eq!(exps[4], PredExp::not());
        assert_eq!(exps[7], PredExp::string_regex(1));
        assert_eq!(exps[8], PredExp::void_time());
    }

    #[test]
    fn test_empty_connective() {
        assert!(matches!(
            Predicate::and(vec![]).flatten(),
            Err(PredExpError::MalformedExpression(_))
        ));
    }

    #[test]
    fn test_too_many_children() {
        let pred = Predicate::and(vec![adult(); u16::MAX as usize + 1]);
        assert_eq!(
            pred.flatten(),
            Err(PredExpError::TooManyChildren {
                connective: "AND",
                count: 65536
            })
        );
    }

    #[test]
    fn test_operand_type_mismatch() {
        let pred = Predicate::compare(
            CompareOp::StringEqual,
            Operand::string_bin("name"),
            Operand::integer(3),
        );
        assert!(matches!(
            pred.check(),
            Err(PredExpError::InvalidOperand { .. })
        ));

        let pred = Predicate::compare(
            CompareOp::GeoJsonWithin,
            Operand::integer_bin("loc"),
            Operand::geojson("{}"),
        );
        assert!(pred.check().is_err());

        // Metadata accessors are integers
        let pred = Predicate::compare(
            CompareOp::IntegerGreater,
            Operand::record_size(),
            Operand::integer(1024),
        );
        assert!(pred.check().is_ok());

        let pred = Predicate::regex(Operand::integer_bin("age"), "1.*", 0);
        assert!(pred.check().is_err());
    }

    #[test]
    fn test_parse_round_trip() {
        let pred = Predicate::and(vec![
            adult(),
            Predicate::or(vec![
                Predicate::compare(
                    CompareOp::StringEqual,
                    Operand::string_bin("city"),
                    Operand::string("Oslo"),
                ),
                Predicate::not(Predicate::compare(
                    CompareOp::GeoJsonContains,
                    Operand::geojson_bin("region"),
                    Operand::geojson(r#"{"type":"Point","coordinates":[10.7,59.9]}"#),
                )),
            ]),
        ]);
        let exps = pred.flatten().unwrap();
        assert_eq!(Predicate::parse(&exps).unwrap(), pred);
    }

    #[test]
    fn test_parse_arity_mismatch() {
        // AND declares three children but only two follow
        let mut exps = vec![PredExp::and(3)];
        exps.extend(adult().flatten().unwrap());
        exps.extend(adult().flatten().unwrap());
        assert!(matches!(
            Predicate::parse(&exps),
            Err(PredExpError::MalformedExpression(_))
        ));

        // AND declares one child but two follow
        exps[0] = PredExp::and(1);
        assert!(matches!(
            Predicate::parse(&exps),
            Err(PredExpError::MalformedExpression(msg)) if msg.contains("trailing")
        ));
    }

    #[test]
    fn test_parse_missing_operator() {
        let exps = vec![
            PredExp::integer_bin("age"),
            PredExp::integer_value(18),
            PredExp::not(),
        ];
        assert!(matches!(
            Predicate::parse(&exps),
            Err(PredExpError::MalformedExpression(_))
        ));

        let exps = vec![PredExp::integer_greater()];
        assert!(Predicate::parse(&exps).is_err());
        assert!(Predicate::parse(&[]).is_err());
    }

    #[test]
    fn test_parse_depth_limit() {
        let mut exps = vec![PredExp::not(); MAX_DEPTH + 1];
        exps.extend(adult().flatten().unwrap());
        assert!(matches!(
            Predicate::parse(&exps),
            Err(PredExpError::MalformedExpression(msg)) if msg.contains("depth")
        ));

        let mut exps = vec![PredExp::not(); MAX_DEPTH];
        exps.extend(adult().flatten().unwrap());
        assert!(Predicate::parse(&exps).is_ok());
    }

    #[test]
    fn test_display() {
        let pred = Predicate::and(vec![
            adult(),
            Predicate::not(Predicate::regex(Operand::string_bin("name"), "^a", 0)),
        ]);
        assert_eq!(pred.to_string(), "(age >= 18 AND NOT (name ~= '^a'))");

        let pred = Predicate::compare(
            CompareOp::IntegerLess,
            Operand::last_update(),
            Operand::integer(5),
        );
        assert_eq!(pred.to_string(), "rec.LastUpdate < 5");
    }

    #[test]
    fn test_display_not_connective() {
        let pred = Predicate::not(Predicate::and(vec![
            adult(),
            Predicate::regex(Operand::string_bin("name"), "^a", 0),
        ]));
        assert_eq!(pred.to_string(), "NOT (age >= 18 AND name ~= '^a')");

        let pred = Predicate::not(Predicate::not(adult()));
        assert_eq!(pred.to_string(), "NOT NOT (age >= 18)");
    }
}
