use std::fmt;

use serde::Serialize;

use super::lower::{Ctor, Shape};

/// A pattern describing values a match does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "pattern", rename_all = "kebab-case")]
pub enum WitnessPattern {
    Wildcard,
    Literal {
        text: String,
    },
    Variant {
        name: String,
        fields: Vec<WitnessField>,
    },
    Tuple {
        items: Vec<WitnessPattern>,
    },
    Record {
        name: String,
        fields: Vec<WitnessField>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WitnessField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pattern: WitnessPattern,
}

impl fmt::Display for WitnessPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WitnessPattern::Wildcard => f.write_str("_"),
            WitnessPattern::Literal { text } => f.write_str(text),
            WitnessPattern::Variant { name, fields } => {
                f.write_str(name)?;
                if fields.is_empty() {
                    Ok(())
                } else if fields.iter().all(|fl| fl.name.is_some()) {
                    write_named(f, fields)
                } else {
                    let parts: Vec<String> = fields.iter().map(|fl| fl.pattern.to_string()).collect();
                    write!(f, "({})", parts.join(", "))
                }
            }
            WitnessPattern::Tuple { items } => {
                let parts: Vec<String> = items.iter().map(|p| p.to_string()).collect();
                if parts.len() == 1 {
                    write!(f, "({},)", parts[0])
                } else {
                    write!(f, "({})", parts.join(", "))
                }
            }
            WitnessPattern::Record { name, fields } => {
                f.write_str(name)?;
                write_named(f, fields)
            }
        }
    }
}

fn write_named(f: &mut fmt::Formatter<'_>, fields: &[WitnessField]) -> fmt::Result {
    let parts: Vec<String> = fields
        .iter()
        .map(|fl| format!("{}: {}", fl.name.as_deref().unwrap_or("_"), fl.pattern))
        .collect();
    write!(f, " {{ {} }}", parts.join(", "))
}

/// Rebuild a witness for `ctor` from witnesses for its fields.
pub(super) fn build(shape: &Shape<'_>, ctor: &Ctor, fields: Vec<WitnessPattern>) -> WitnessPattern {
    match (shape, ctor) {
        (Shape::Sum { variants, .. }, Ctor::Variant(ix)) => match variants.get(*ix) {
            Some(variant) => WitnessPattern::Variant {
                name: variant.name.clone(),
                fields: variant
                    .fields
                    .iter()
                    .zip(fields)
                    .map(|(decl, pattern)| WitnessField {
                        name: decl.name.clone(),
                        pattern,
                    })
                    .collect(),
            },
            None => WitnessPattern::Wildcard,
        },
        (Shape::Product { path, fields: decl }, Ctor::Single) => WitnessPattern::Record {
            name: path.name.clone(),
            fields: decl
                .iter()
                .zip(fields)
                .map(|(d, pattern)| WitnessField {
                    name: d.name.clone(),
                    pattern,
                })
                .collect(),
        },
        (Shape::Tuple(_), Ctor::Single) => WitnessPattern::Tuple { items: fields },
        (Shape::Unit, Ctor::Single) => WitnessPattern::Tuple { items: Vec::new() },
        (_, Ctor::Bool(b)) => WitnessPattern::Literal {
            text: b.to_string(),
        },
        (_, Ctor::Lit(key)) => WitnessPattern::Literal {
            text: key.to_string(),
        },
        _ => WitnessPattern::Wildcard,
    }
}

/// `ctor` with a wildcard in every field, e.g. `Rect(_, _)`.
pub(super) fn wild_ctor(shape: &Shape<'_>, ctor: &Ctor) -> WitnessPattern {
    let arity = shape.field_types(ctor).len();
    build(shape, ctor, vec![WitnessPattern::Wildcard; arity])
}
