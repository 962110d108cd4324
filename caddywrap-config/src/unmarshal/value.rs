//! Token coercion
//!
//! [`DirectiveValue`] is implemented by every field type the unmarshaler can
//! fill. Scalars take the first token of a line, sequences append one element
//! per line, maps insert one key/value pair per line and `Vec<Vec<String>>`
//! keeps each line's tokens as one element.

use crate::parser::Token;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// What a field's tokens are converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    IpAddr,
    IpNet,
    StringList,
    Map,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::IpAddr => "IP address",
            FieldKind::IpNet => "CIDR network",
            FieldKind::StringList => "string list",
            FieldKind::Map => "key/value pair",
        };
        f.write_str(name)
    }
}

/// How repeated lines combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    /// Last line wins
    Single,
    /// Each line appends an element
    Repeated,
    /// Each line inserts or replaces a key
    Keyed,
}

/// Failure to coerce the tokens of one line
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    Invalid {
        token: Token,
        expected: FieldKind,
        reason: String,
    },
    Missing {
        needed: usize,
        found: usize,
    },
}

/// A type parsed from a single token
pub trait Scalar: Sized {
    const KIND: FieldKind;

    fn parse_token(token: &str) -> Result<Self, String>;

    /// Value of a directive given with no token at all
    fn bare() -> Option<Self> {
        None
    }
}

/// A field type the unmarshaler can assign from a line's tokens
pub trait DirectiveValue {
    const KIND: FieldKind;
    const MULTIPLICITY: Multiplicity;

    fn assign(&mut self, args: &[Token]) -> Result<(), ValueError>;
}

/// Coerce one token
pub fn coerce<S: Scalar>(token: &Token) -> Result<S, ValueError> {
    S::parse_token(&token.text).map_err(|reason| ValueError::Invalid {
        token: token.clone(),
        expected: S::KIND,
        reason,
    })
}

/// Coerce the first token of a line, falling back to the bare value
pub fn coerce_first<S: Scalar>(args: &[Token]) -> Result<S, ValueError> {
    match args.first() {
        Some(token) => coerce(token),
        None => S::bare().ok_or(ValueError::Missing { needed: 1, found: 0 }),
    }
}

/// Same spellings `strconv.ParseBool` accepts
fn parse_bool(token: &str) -> Result<bool, String> {
    match token {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

impl Scalar for String {
    const KIND: FieldKind = FieldKind::String;

    fn parse_token(token: &str) -> Result<Self, String> {
        Ok(token.to_string())
    }
}

impl Scalar for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn parse_token(token: &str) -> Result<Self, String> {
        parse_bool(token)
    }

    fn bare() -> Option<Self> {
        Some(true)
    }
}

macro_rules! parsed_scalar {
    ($kind:expr => $($ty:ty),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: FieldKind = $kind;

                fn parse_token(token: &str) -> Result<Self, String> {
                    token.parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )+
    };
}

parsed_scalar!(FieldKind::Integer => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
parsed_scalar!(FieldKind::IpAddr => IpAddr, Ipv4Addr, Ipv6Addr);

macro_rules! network_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Scalar for $ty {
                const KIND: FieldKind = FieldKind::IpNet;

                // The network itself, with host bits cleared.
                fn parse_token(token: &str) -> Result<Self, String> {
                    token.parse::<$ty>().map(|net| net.trunc()).map_err(|e| e.to_string())
                }
            }
        )+
    };
}

network_scalar!(IpNet, Ipv4Net, Ipv6Net);

/// Implement [`DirectiveValue`] for a [`Scalar`] type and for its `Option`
/// and `Vec` forms.
#[macro_export]
macro_rules! scalar_values {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::unmarshal::DirectiveValue for $ty {
                const KIND: $crate::unmarshal::FieldKind =
                    <$ty as $crate::unmarshal::Scalar>::KIND;
                const MULTIPLICITY: $crate::unmarshal::Multiplicity =
                    $crate::unmarshal::Multiplicity::Single;

                fn assign(
                    &mut self,
                    args: &[$crate::parser::Token],
                ) -> Result<(), $crate::unmarshal::ValueError> {
                    *self = $crate::unmarshal::coerce_first(args)?;
                    Ok(())
                }
            }

            impl $crate::unmarshal::DirectiveValue for Option<$ty> {
                const KIND: $crate::unmarshal::FieldKind =
                    <$ty as $crate::unmarshal::Scalar>::KIND;
                const MULTIPLICITY: $crate::unmarshal::Multiplicity =
                    $crate::unmarshal::Multiplicity::Single;

                fn assign(
                    &mut self,
                    args: &[$crate::parser::Token],
                ) -> Result<(), $crate::unmarshal::ValueError> {
                    *self = Some($crate::unmarshal::coerce_first(args)?);
                    Ok(())
                }
            }

            impl $crate::unmarshal::DirectiveValue for Vec<$ty> {
                const KIND: $crate::unmarshal::FieldKind =
                    <$ty as $crate::unmarshal::Scalar>::KIND;
                const MULTIPLICITY: $crate::unmarshal::Multiplicity =
                    $crate::unmarshal::Multiplicity::Repeated;

                fn assign(
                    &mut self,
                    args: &[$crate::parser::Token],
                ) -> Result<(), $crate::unmarshal::ValueError> {
                    self.push($crate::unmarshal::coerce_first(args)?);
                    Ok(())
                }
            }
        )+
    };
}

scalar_values!(
    String, bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, IpAddr,
    Ipv4Addr, Ipv6Addr, IpNet, Ipv4Net, Ipv6Net,
);

/// Each line contributes all of its tokens, uncoerced, as one element
impl DirectiveValue for Vec<Vec<String>> {
    const KIND: FieldKind = FieldKind::StringList;
    const MULTIPLICITY: Multiplicity = Multiplicity::Repeated;

    fn assign(&mut self, args: &[Token]) -> Result<(), ValueError> {
        self.push(args.iter().map(|t| t.text.clone()).collect());
        Ok(())
    }
}

fn key_value<K: Scalar, V: Scalar>(args: &[Token]) -> Result<(K, V), ValueError> {
    let key = match args.first() {
        Some(token) => coerce(token)?,
        None => return Err(ValueError::Missing { needed: 2, found: 0 }),
    };
    let value = match args.get(1) {
        Some(token) => coerce(token)?,
        None => V::bare().ok_or(ValueError::Missing { needed: 2, found: 1 })?,
    };
    Ok((key, value))
}

impl<K, V> DirectiveValue for HashMap<K, V>
where
    K: Scalar + Eq + Hash,
    V: Scalar,
{
    const KIND: FieldKind = FieldKind::Map;
    const MULTIPLICITY: Multiplicity = Multiplicity::Keyed;

    fn assign(&mut self, args: &[Token]) -> Result<(), ValueError> {
        let (key, value) = key_value(args)?;
        self.insert(key, value);
        Ok(())
    }
}

impl<K, V> DirectiveValue for BTreeMap<K, V>
where
    K: Scalar + Ord,
    V: Scalar,
{
    const KIND: FieldKind = FieldKind::Map;
    const MULTIPLICITY: Multiplicity = Multiplicity::Keyed;

    fn assign(&mut self, args: &[Token]) -> Result<(), ValueError> {
        let (key, value) = key_value(args)?;
        self.insert(key, value);
        Ok(())
    }
}
