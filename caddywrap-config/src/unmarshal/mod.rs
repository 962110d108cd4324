//! Directive-to-struct unmarshaling
//!
//! A target type lists its fields once through [`Unmarshal::describe`],
//! usually with [`directive_fields!`](crate::directive_fields). Each call to
//! [`unmarshal`] builds the field index from that description and walks the
//! dispenser:
//!
//! - arguments on the directive line fill the fields tagged `argN`, in order
//! - every line inside the directive's block names a field by keyword
//!   (case-insensitive) and its remaining tokens are coerced into it
//! - scalars keep the last value, sequences append, maps insert
//!
//! ```text
//! app /api {          # path => ",arg0"
//!     timeout 30      # timeout: u32
//!     allow 10.0.0.0/8
//!     allow ::1/128   # allow: Vec<IpNet>
//!     header X-A b    # headers => "header": HashMap<String, String>
//! }
//! ```

mod engine;
mod error;
mod schema;
mod value;

pub use error::UnmarshalError;
pub use schema::{FieldBinding, SchemaBuilder, parse_tag};
pub use value::{DirectiveValue, FieldKind, Multiplicity, Scalar, ValueError, coerce, coerce_first};

use crate::parser::{Dispenser, lex_tokens, process_env};
use schema::FieldIndex;

/// A type that can be filled from a directive's tokens
pub trait Unmarshal: Sized + 'static {
    /// Register every field the directive may set
    fn describe(fields: &mut SchemaBuilder<Self>);
}

/// What to do with nested keywords no field is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownDirectives {
    #[default]
    Ignore,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnmarshalOptions {
    pub unknown: UnknownDirectives,
}

impl UnmarshalOptions {
    /// Reject unknown keywords
    pub fn strict() -> Self {
        Self {
            unknown: UnknownDirectives::Reject,
        }
    }
}

fn index_of<T: Unmarshal>() -> Result<FieldIndex<T>, UnmarshalError> {
    let mut fields = SchemaBuilder::new();
    T::describe(&mut fields);
    FieldIndex::build(fields)
}

/// Fill `target` from every remaining occurrence in `d`, ignoring unknown
/// keywords.
///
/// On error the fields assigned before the failing token keep their values.
pub fn unmarshal<T: Unmarshal>(d: &mut Dispenser, target: &mut T) -> Result<(), UnmarshalError> {
    unmarshal_with(d, target, &UnmarshalOptions::default())
}

pub fn unmarshal_with<T: Unmarshal>(
    d: &mut Dispenser,
    target: &mut T,
    options: &UnmarshalOptions,
) -> Result<(), UnmarshalError> {
    let index = index_of::<T>()?;
    engine::run(d, target, &index, options)
}

/// Lex `source` and unmarshal it into a fresh `T`
pub fn from_str<T: Unmarshal + Default>(source: &str) -> Result<T, UnmarshalError> {
    let mut d = Dispenser::from_tokens("", lex_tokens(source, process_env)?);
    let mut target = T::default();
    unmarshal(&mut d, &mut target)?;
    Ok(target)
}

/// Field bindings of `T`, in declaration order
pub fn schema_of<T: Unmarshal>() -> Result<Vec<FieldBinding>, UnmarshalError> {
    Ok(index_of::<T>()?.bindings().cloned().collect())
}

/// Implement [`Unmarshal`] by listing fields, each optionally followed by
/// `=> "tag"`.
///
/// ```rust
/// use caddywrap_config::directive_fields;
///
/// #[derive(Default)]
/// struct Site {
///     root: String,
///     ports: Vec<u16>,
///     tls: bool,
/// }
///
/// directive_fields!(Site {
///     root => ",arg0",
///     ports => "port",
///     tls,
/// });
///
/// let site: Site = caddywrap_config::from_str("site /srv {\n port 80\n port 443\n tls\n}").unwrap();
/// assert_eq!(site.root, "/srv");
/// assert_eq!(site.ports, vec![80, 443]);
/// assert!(site.tls);
/// ```
#[macro_export]
macro_rules! directive_fields {
    (@tag) => {
        None
    };
    (@tag $tag:literal) => {
        Some($tag)
    };
    ($target:ty { $($field:ident $(=> $tag:literal)?),* $(,)? }) => {
        impl $crate::unmarshal::Unmarshal for $target {
            fn describe(fields: &mut $crate::unmarshal::SchemaBuilder<Self>) {
                $(
                    fields.field(
                        stringify!($field),
                        $crate::directive_fields!(@tag $($tag)?),
                        |target| &mut target.$field,
                    );
                )*
            }
        }
    };
}
