//! The type engine: built-in types, derived types, and their restrictions.
//!
//! A compiled [`Type`] is the composition of a whole typedef chain: every
//! derivation step must narrow its parent (range and length subsets, added
//! patterns, enum and bit subsets), so the compiled form carries the
//! effective restrictions and only a back-reference to the nearest typedef.

use crate::ident::Ident;
use crate::path::LeafrefPath;
use crate::schema::{IdentityRef, ModuleId, NodeId};
use std::fmt;
use std::sync::OnceLock;

pub(crate) mod resolve;
pub(crate) mod value;

pub(crate) use self::resolve::{resolve_type, TypeCx, TypeScope};
pub(crate) use self::value::{identity_derived_from, validate_value, ValueCx};

/// The YANG built-in types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        Some(match name {
            "binary" => BuiltinType::Binary,
            "bits" => BuiltinType::Bits,
            "boolean" => BuiltinType::Boolean,
            "decimal64" => BuiltinType::Decimal64,
            "empty" => BuiltinType::Empty,
            "enumeration" => BuiltinType::Enumeration,
            "identityref" => BuiltinType::Identityref,
            "instance-identifier" => BuiltinType::InstanceIdentifier,
            "int8" => BuiltinType::Int8,
            "int16" => BuiltinType::Int16,
            "int32" => BuiltinType::Int32,
            "int64" => BuiltinType::Int64,
            "leafref" => BuiltinType::Leafref,
            "string" => BuiltinType::String,
            "uint8" => BuiltinType::Uint8,
            "uint16" => BuiltinType::Uint16,
            "uint32" => BuiltinType::Uint32,
            "uint64" => BuiltinType::Uint64,
            "union" => BuiltinType::Union,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Binary => "binary",
            BuiltinType::Bits => "bits",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Decimal64 => "decimal64",
            BuiltinType::Empty => "empty",
            BuiltinType::Enumeration => "enumeration",
            BuiltinType::Identityref => "identityref",
            BuiltinType::InstanceIdentifier => "instance-identifier",
            BuiltinType::Int8 => "int8",
            BuiltinType::Int16 => "int16",
            BuiltinType::Int32 => "int32",
            BuiltinType::Int64 => "int64",
            BuiltinType::Leafref => "leafref",
            BuiltinType::String => "string",
            BuiltinType::Uint8 => "uint8",
            BuiltinType::Uint16 => "uint16",
            BuiltinType::Uint32 => "uint32",
            BuiltinType::Uint64 => "uint64",
            BuiltinType::Union => "union",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BuiltinType::Int8
                | BuiltinType::Int16
                | BuiltinType::Int32
                | BuiltinType::Int64
                | BuiltinType::Uint8
                | BuiltinType::Uint16
                | BuiltinType::Uint32
                | BuiltinType::Uint64
        )
    }

    /// The full value range of an integer built-in.
    pub(crate) fn integer_bounds(self) -> Option<(Number, Number)> {
        Some(match self {
            BuiltinType::Int8 => (Number::Signed(i8::MIN as i64), Number::Signed(i8::MAX as i64)),
            BuiltinType::Int16 => {
                (Number::Signed(i16::MIN as i64), Number::Signed(i16::MAX as i64))
            }
            BuiltinType::Int32 => {
                (Number::Signed(i32::MIN as i64), Number::Signed(i32::MAX as i64))
            }
            BuiltinType::Int64 => (Number::Signed(i64::MIN), Number::Signed(i64::MAX)),
            BuiltinType::Uint8 => (Number::Unsigned(0), Number::Unsigned(u8::MAX as u64)),
            BuiltinType::Uint16 => (Number::Unsigned(0), Number::Unsigned(u16::MAX as u64)),
            BuiltinType::Uint32 => (Number::Unsigned(0), Number::Unsigned(u32::MAX as u64)),
            BuiltinType::Uint64 => (Number::Unsigned(0), Number::Unsigned(u64::MAX)),
            _ => return None,
        })
    }
}

/// A restriction bound or enum/range value, typed by the base it belongs to.
///
/// Decimal64 values are scaled integers: `value * 10^-fraction_digits`.
/// Bounds within one restriction always share a representation; comparing
/// across representations is a caller bug and answers `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Number {
    Signed(i64),
    Unsigned(u64),
    Decimal {
        value: i64,
        fraction_digits: u8,
    },
}

impl Number {
    pub(crate) fn partial_cmp_same(self, other: Number) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Number::Signed(a), Number::Signed(b)) => Some(a.cmp(&b)),
            (Number::Unsigned(a), Number::Unsigned(b)) => Some(a.cmp(&b)),
            (
                Number::Decimal { value: a, .. },
                Number::Decimal { value: b, .. },
            ) => Some(a.cmp(&b)),
            _ => None,
        }
    }

    pub(crate) fn le(self, other: Number) -> bool {
        matches!(
            self.partial_cmp_same(other),
            Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)
        )
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Number::Signed(v) => write!(f, "{v}"),
            Number::Unsigned(v) => write!(f, "{v}"),
            Number::Decimal {
                value,
                fraction_digits,
            } => {
                let digits = fraction_digits as u32;
                let scale = 10i128.pow(digits);
                let value = value as i128;
                let int = value / scale;
                let frac = (value % scale).unsigned_abs();
                if value < 0 && int == 0 {
                    write!(f, "-0.{frac:0width$}", width = digits as usize)
                } else {
                    write!(f, "{int}.{frac:0width$}", width = digits as usize)
                }
            }
        }
    }
}

/// One closed interval of a range or length restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePart {
    pub min: Number,
    pub max: Number,
}

/// A `range` or `length` restriction: disjoint ascending intervals.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Restriction {
    pub parts: Vec<RangePart>,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
}

impl Restriction {
    pub(crate) fn contains(&self, value: Number) -> bool {
        self.parts
            .iter()
            .any(|part| part.min.le(value) && value.le(part.max))
    }

    /// Whether every interval of `self` fits inside one interval of
    /// `parent`.
    pub(crate) fn is_subset_of(&self, parent: &Restriction) -> bool {
        self.parts.iter().all(|part| {
            parent
                .parts
                .iter()
                .any(|outer| outer.min.le(part.min) && part.max.le(outer.max))
        })
    }
}

/// A compiled `pattern` restriction.
///
/// The source is kept verbatim; the automaton is compiled eagerly outside
/// groupings and deferred to the expansion site inside them.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub invert_match: bool,
    pub error_message: Option<String>,
    pub error_app_tag: Option<String>,
    pub(crate) regex: Option<regex::Regex>,
}

impl Pattern {
    /// Whether `value` satisfies this pattern, taking invert-match into
    /// account. Patterns that were only syntax-checked match everything.
    pub fn matches(&self, value: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(value) != self.invert_match,
            None => true,
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.invert_match == other.invert_match
    }
}

impl Eq for Pattern {}

/// XSD regular expressions are implicitly anchored.
pub(crate) fn compile_pattern(source: &str) -> Result<regex::Regex, regex::Error> {
    regex::Regex::new(&format!("^(?:{source})$"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bit {
    pub name: Ident,
    pub position: u32,
}

/// Back-reference to the nearest typedef in a derivation chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedefRef {
    /// Name of the module defining the typedef.
    pub module: Ident,
    pub name: Ident,
}

/// A default inherited from a typedef in the derivation chain, with the
/// document it was written in (identityref defaults carry prefixes).
#[derive(Debug, Clone)]
pub struct InheritedDefault {
    pub value: String,
    pub(crate) module: ModuleId,
    pub(crate) doc: usize,
}

/// A fully composed type.
#[derive(Debug, Clone)]
pub struct Type {
    pub base: BuiltinType,
    /// `None` when the leaf derives straight from a built-in.
    pub typedef: Option<TypedefRef>,
    /// The nearest `default` declared by a typedef in the chain.
    pub typedef_default: Option<InheritedDefault>,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Binary {
        length: Option<Restriction>,
    },
    Bits {
        bits: Vec<Bit>,
    },
    Boolean,
    Decimal64 {
        fraction_digits: u8,
        range: Option<Restriction>,
    },
    Empty,
    Enumeration {
        enums: Vec<EnumValue>,
    },
    Identityref {
        bases: Vec<IdentityRef>,
    },
    InstanceIdentifier {
        require_instance: bool,
    },
    /// Any of the eight integer built-ins; which one is in [`Type::base`].
    Numeric {
        range: Option<Restriction>,
    },
    Leafref {
        path: LeafrefPath,
        require_instance: bool,
        /// Filled by the resolver once all augments are applied.
        target: OnceLock<NodeId>,
    },
    String {
        length: Option<Restriction>,
        patterns: Vec<Pattern>,
    },
    Union {
        members: Vec<Type>,
        /// Set when any member, transitively, is a leafref or an
        /// instance-identifier.
        has_pointer_type: bool,
    },
}

impl Type {
    /// The name this type goes by: its typedef, or the built-in.
    pub fn name(&self) -> &str {
        match &self.typedef {
            Some(typedef) => typedef.name.as_str(),
            None => self.base.name(),
        }
    }

    pub fn leafref_target(&self) -> Option<NodeId> {
        match &self.kind {
            TypeKind::Leafref { target, .. } => target.get().copied(),
            _ => None,
        }
    }

    pub fn has_pointer_type(&self) -> bool {
        match &self.kind {
            TypeKind::Leafref { .. } | TypeKind::InstanceIdentifier { .. } => true,
            TypeKind::Union {
                has_pointer_type, ..
            } => *has_pointer_type,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_display_uses_the_scale() {
        let n = Number::Decimal {
            value: -1205,
            fraction_digits: 2,
        };
        assert_eq!(n.to_string(), "-12.05");
        let small = Number::Decimal {
            value: -5,
            fraction_digits: 2,
        };
        assert_eq!(small.to_string(), "-0.05");
    }

    #[test]
    fn restriction_subset_checks_interval_nesting() {
        let parent = Restriction {
            parts: vec![
                RangePart {
                    min: Number::Signed(0),
                    max: Number::Signed(10),
                },
                RangePart {
                    min: Number::Signed(20),
                    max: Number::Signed(30),
                },
            ],
            ..Default::default()
        };
        let inside = Restriction {
            parts: vec![RangePart {
                min: Number::Signed(2),
                max: Number::Signed(8),
            }],
            ..Default::default()
        };
        let straddling = Restriction {
            parts: vec![RangePart {
                min: Number::Signed(8),
                max: Number::Signed(22),
            }],
            ..Default::default()
        };
        assert!(inside.is_subset_of(&parent));
        assert!(!straddling.is_subset_of(&parent));
    }

    #[test]
    fn inverted_patterns_negate_membership() {
        let pattern = Pattern {
            source: "[a-z]+".to_owned(),
            invert_match: true,
            error_message: None,
            error_app_tag: None,
            regex: Some(compile_pattern("[a-z]+").unwrap()),
        };
        assert!(!pattern.matches("abc"));
        assert!(pattern.matches("ABC"));
    }

    #[test]
    fn patterns_are_anchored() {
        let regex = compile_pattern("[a-z]+").unwrap();
        assert!(regex.is_match("abc"));
        assert!(!regex.is_match("abc1"));
    }
}
