//! Field index
//!
//! Maps directive keywords and positional slots to the fields of a target
//! type. A field is declared with an identifier and an optional tag:
//!
//! | tag          | keyword              | position |
//! |--------------|----------------------|----------|
//! | none         | lowercase identifier | none     |
//! | `name`       | `name`               | none     |
//! | `name,argN`  | `name`               | `N`      |
//! | `,argN`      | lowercase identifier | `N`      |

use crate::parser::Token;
use crate::unmarshal::{DirectiveValue, FieldKind, Multiplicity, UnmarshalError, ValueError};
use std::collections::HashMap;

type Assigner<T> = Box<dyn Fn(&mut T, &[Token]) -> Result<(), ValueError> + Send + Sync>;

/// Where a field is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Field identifier as declared
    pub ident: &'static str,
    /// Lowercase keyword matched against nested lines
    pub keyword: String,
    /// Positional slot on the directive line
    pub position: Option<usize>,
    pub kind: FieldKind,
    pub multiplicity: Multiplicity,
}

struct FieldDecl<T> {
    ident: &'static str,
    tag: Option<&'static str>,
    kind: FieldKind,
    multiplicity: Multiplicity,
    assign: Assigner<T>,
}

/// Collects field declarations for a target type
pub struct SchemaBuilder<T> {
    fields: Vec<FieldDecl<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Declare a field. `access` projects the target onto the field.
    pub fn field<V>(
        &mut self,
        ident: &'static str,
        tag: Option<&'static str>,
        access: fn(&mut T) -> &mut V,
    ) -> &mut Self
    where
        V: DirectiveValue + 'static,
    {
        self.fields.push(FieldDecl {
            ident,
            tag,
            kind: V::KIND,
            multiplicity: V::MULTIPLICITY,
            assign: Box::new(move |target: &mut T, args: &[Token]| access(target).assign(args)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<T: 'static> Default for SchemaBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a tag into its keyword and positional slot
pub fn parse_tag(ident: &str, tag: Option<&str>) -> Result<(String, Option<usize>), String> {
    let tag = tag.unwrap_or("");
    let (name, position) = match tag.split_once(',') {
        None => (tag, None),
        Some((name, suffix)) => {
            let index = suffix
                .strip_prefix("arg")
                .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                .ok_or_else(|| format!("tag suffix '{}' is not argN", suffix))?;
            let index = index
                .parse::<usize>()
                .map_err(|e| format!("bad position '{}': {}", index, e))?;
            (name, Some(index))
        }
    };

    if name.chars().any(char::is_whitespace) {
        return Err(format!("keyword '{}' contains whitespace", name));
    }

    let keyword = if name.is_empty() { ident } else { name };
    Ok((keyword.to_lowercase(), position))
}

pub(crate) struct IndexedField<T> {
    pub binding: FieldBinding,
    pub assign: Assigner<T>,
}

/// Keyword and position lookup tables for one target type
pub(crate) struct FieldIndex<T> {
    fields: Vec<IndexedField<T>>,
    keywords: HashMap<String, usize>,
    positions: HashMap<usize, usize>,
}

impl<T: 'static> FieldIndex<T> {
    pub fn build(builder: SchemaBuilder<T>) -> Result<Self, UnmarshalError> {
        let mut index = Self {
            fields: Vec::with_capacity(builder.len()),
            keywords: HashMap::new(),
            positions: HashMap::new(),
        };

        for decl in builder.fields {
            let schema_error = |message: String| UnmarshalError::Schema {
                field: decl.ident,
                message,
            };
            let (keyword, position) = parse_tag(decl.ident, decl.tag).map_err(schema_error)?;
            let slot = index.fields.len();

            if let Some(other) = index.keywords.insert(keyword.clone(), slot) {
                return Err(schema_error(format!(
                    "keyword '{}' already bound to `{}`",
                    keyword, index.fields[other].binding.ident
                )));
            }
            if let Some(position) = position {
                if let Some(other) = index.positions.insert(position, slot) {
                    return Err(schema_error(format!(
                        "arg{} already bound to `{}`",
                        position, index.fields[other].binding.ident
                    )));
                }
            }

            index.fields.push(IndexedField {
                binding: FieldBinding {
                    ident: decl.ident,
                    keyword,
                    position,
                    kind: decl.kind,
                    multiplicity: decl.multiplicity,
                },
                assign: decl.assign,
            });
        }

        Ok(index)
    }

    /// Look up a lowercase keyword
    pub fn by_keyword(&self, keyword: &str) -> Option<&IndexedField<T>> {
        self.keywords.get(keyword).map(|&slot| &self.fields[slot])
    }

    pub fn by_position(&self, position: usize) -> Option<&IndexedField<T>> {
        self.positions.get(&position).map(|&slot| &self.fields[slot])
    }

    pub fn bindings(&self) -> impl Iterator<Item = &FieldBinding> {
        self.fields.iter().map(|f| &f.binding)
    }
}
