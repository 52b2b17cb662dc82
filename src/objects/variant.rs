use crate::error::Result;
use crate::objects::{Array, Dictionary, Name, PdfString, Reference};

/// The payload of a PDF value: exactly one of the primitive data kinds.
///
/// Literal and hex strings share the `String` variant; the flag lives on
/// [`PdfString`]. `RawData` carries pre-serialized bytes used to round-trip
/// content this library does not interpret.
#[derive(Debug)]
pub enum Variant {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    String(PdfString),
    Name(Name),
    Array(Array),
    Dictionary(Dictionary),
    Reference(Reference),
    RawData(Vec<u8>),
}

/// The data kind of a value, including the two kinds that exist only for
/// diagnostics: `HexString` (a `String` payload with the hex flag) and
/// `Unknown` (a value whose body was never materialized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    Null,
    Bool,
    Integer,
    Real,
    String,
    HexString,
    Name,
    Array,
    Dictionary,
    Reference,
    RawData,
    Unknown,
}

impl DataKind {
    pub fn name(&self) -> &'static str {
        match self {
            DataKind::Null => "Null",
            DataKind::Bool => "Bool",
            DataKind::Integer => "Integer",
            DataKind::Real => "Real",
            DataKind::String => "String",
            DataKind::HexString => "HexString",
            DataKind::Name => "Name",
            DataKind::Array => "Array",
            DataKind::Dictionary => "Dictionary",
            DataKind::Reference => "Reference",
            DataKind::RawData => "RawData",
            DataKind::Unknown => "Unknown",
        }
    }
}

impl Variant {
    pub fn kind(&self) -> DataKind {
        match self {
            Variant::Null => DataKind::Null,
            Variant::Bool(_) => DataKind::Bool,
            Variant::Integer(_) => DataKind::Integer,
            Variant::Real(_) => DataKind::Real,
            Variant::String(s) => {
                if s.is_hex() {
                    DataKind::HexString
                } else {
                    DataKind::String
                }
            }
            Variant::Name(_) => DataKind::Name,
            Variant::Array(_) => DataKind::Array,
            Variant::Dictionary(_) => DataKind::Dictionary,
            Variant::Reference(_) => DataKind::Reference,
            Variant::RawData(_) => DataKind::RawData,
        }
    }

    /// Deep copy. Fallible because container children may carry delayed
    /// loads that must be materialized first.
    pub fn try_clone(&self) -> Result<Variant> {
        Ok(match self {
            Variant::Null => Variant::Null,
            Variant::Bool(b) => Variant::Bool(*b),
            Variant::Integer(i) => Variant::Integer(*i),
            Variant::Real(r) => Variant::Real(*r),
            Variant::String(s) => Variant::String(s.clone()),
            Variant::Name(n) => Variant::Name(n.clone()),
            Variant::Array(a) => Variant::Array(a.try_clone()?),
            Variant::Dictionary(d) => Variant::Dictionary(d.try_clone()?),
            Variant::Reference(r) => Variant::Reference(*r),
            Variant::RawData(d) => Variant::RawData(d.clone()),
        })
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Variant::Bool(b)
    }
}

impl From<i32> for Variant {
    fn from(i: i32) -> Self {
        Variant::Integer(i as i64)
    }
}

impl From<i64> for Variant {
    fn from(i: i64) -> Self {
        Variant::Integer(i)
    }
}

impl From<f64> for Variant {
    fn from(r: f64) -> Self {
        Variant::Real(r)
    }
}

impl From<PdfString> for Variant {
    fn from(s: PdfString) -> Self {
        Variant::String(s)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Variant::String(PdfString::from(s))
    }
}

impl From<Name> for Variant {
    fn from(n: Name) -> Self {
        Variant::Name(n)
    }
}

impl From<Array> for Variant {
    fn from(a: Array) -> Self {
        Variant::Array(a)
    }
}

impl From<Dictionary> for Variant {
    fn from(d: Dictionary) -> Self {
        Variant::Dictionary(d)
    }
}

impl From<Reference> for Variant {
    fn from(r: Reference) -> Self {
        Variant::Reference(r)
    }
}
