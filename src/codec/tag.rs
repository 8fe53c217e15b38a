//! Static tag allocation for the codec strategies.
//!
//! Every strategy owns one or more contiguous tag bytes, handed out in
//! [`REGISTRATION_ORDER`] starting right after the reserved null tag. The
//! order is part of the wire format: moving an entry changes the meaning of
//! every tag after it, so new strategies go at the end and the format
//! version in [`super::FORMAT_VERSION`] gets bumped.

/// Tag 0 is reserved for null and terminates recursion.
pub const NULL: u8 = 0;

/// One encode/decode strategy of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Fresh literal, then back-reference.
    Str,
    /// Fresh literal, then back-reference.
    Type,
    Int16,
    /// Full four-byte payload, then one-byte payload.
    Int32,
    Int64,
    /// True, then false. No payload.
    Bool,
    Char,
    Double,
    Timestamp,
    Enum,
    PrimitiveArray,
    ObjectArray,
    Pair,
    Triplet,
    List,
    Map,
    /// Opaque value rendered through a text adapter.
    Formatted,
    /// Generic fallback: type name plus serializer bytes.
    Opaque,
}

impl Strategy {
    pub const fn tag_count(self) -> u8 {
        match self {
            Strategy::Str | Strategy::Type | Strategy::Int32 | Strategy::Bool => 2,
            _ => 1,
        }
    }

    /// First tag owned by this strategy.
    pub const fn base(self) -> u8 {
        let mut next = NULL + 1;
        let mut i = 0;
        while i < REGISTRATION_ORDER.len() {
            let candidate = REGISTRATION_ORDER[i];
            if candidate as u8 == self as u8 {
                return next;
            }
            next += candidate.tag_count();
            i += 1;
        }
        // Every variant is registered; see the tests below.
        0
    }

    /// Tag for the `offset`-th variant of this strategy.
    pub const fn tag(self, offset: u8) -> u8 {
        self.base() + offset
    }
}

pub const REGISTRATION_ORDER: [Strategy; 18] = [
    Strategy::Str,
    Strategy::Type,
    Strategy::Int16,
    Strategy::Int32,
    Strategy::Int64,
    Strategy::Bool,
    Strategy::Char,
    Strategy::Double,
    Strategy::Timestamp,
    Strategy::Enum,
    Strategy::PrimitiveArray,
    Strategy::ObjectArray,
    Strategy::Pair,
    Strategy::Triplet,
    Strategy::List,
    Strategy::Map,
    Strategy::Formatted,
    Strategy::Opaque,
];

pub const STR: u8 = Strategy::Str.tag(0);
pub const STR_REF: u8 = Strategy::Str.tag(1);
pub const TYPE: u8 = Strategy::Type.tag(0);
pub const TYPE_REF: u8 = Strategy::Type.tag(1);
pub const INT16: u8 = Strategy::Int16.tag(0);
pub const INT32: u8 = Strategy::Int32.tag(0);
pub const INT32_BYTE: u8 = Strategy::Int32.tag(1);
pub const INT64: u8 = Strategy::Int64.tag(0);
pub const TRUE: u8 = Strategy::Bool.tag(0);
pub const FALSE: u8 = Strategy::Bool.tag(1);
pub const CHAR: u8 = Strategy::Char.tag(0);
pub const DOUBLE: u8 = Strategy::Double.tag(0);
pub const TIMESTAMP: u8 = Strategy::Timestamp.tag(0);
pub const ENUM: u8 = Strategy::Enum.tag(0);
pub const PRIMITIVE_ARRAY: u8 = Strategy::PrimitiveArray.tag(0);
pub const OBJECT_ARRAY: u8 = Strategy::ObjectArray.tag(0);
pub const PAIR: u8 = Strategy::Pair.tag(0);
pub const TRIPLET: u8 = Strategy::Triplet.tag(0);
pub const LIST: u8 = Strategy::List.tag(0);
pub const MAP: u8 = Strategy::Map.tag(0);
pub const FORMATTED: u8 = Strategy::Formatted.tag(0);
pub const OPAQUE: u8 = Strategy::Opaque.tag(0);

/// Dense tag -> (strategy, variant offset) table, built at compile time.
static DISPATCH: [Option<(Strategy, u8)>; 256] = build_dispatch();

const fn build_dispatch() -> [Option<(Strategy, u8)>; 256] {
    let mut table: [Option<(Strategy, u8)>; 256] = [None; 256];
    let mut next = NULL as usize + 1;
    let mut i = 0;
    while i < REGISTRATION_ORDER.len() {
        let strategy = REGISTRATION_ORDER[i];
        let mut offset = 0;
        while offset < strategy.tag_count() {
            table[next] = Some((strategy, offset));
            next += 1;
            offset += 1;
        }
        i += 1;
    }
    table
}

/// Look up the strategy that produced `tag`. `None` for null and for
/// unallocated tags.
pub fn lookup(tag: u8) -> Option<(Strategy, u8)> {
    DISPATCH[tag as usize]
}

/// Element kinds for [`crate::codec::PrimitiveArray`] payloads.
pub mod element {
    pub const BYTE: u8 = 1;
    pub const BOOL: u8 = 2;
    pub const INT16: u8 = 3;
    pub const INT32: u8 = 4;
    pub const INT64: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CHAR: u8 = 7;
}
