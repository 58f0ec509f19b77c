use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::*;

// ---------------------------------------------------------------------------
// Deconstructed patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum LitKey {
    Int(i64),
    /// Bit pattern, so that literals can be compared and hashed. `-0.0`
    /// is stored as `0.0` since the two compare equal.
    Float(u64),
    Str(String),
}

impl LitKey {
    pub(super) fn float(x: f64) -> Self {
        let x = if x == 0.0 { 0.0 } else { x };
        LitKey::Float(x.to_bits())
    }
}

impl fmt::Display for LitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LitKey::Int(i) => write!(f, "{}", i),
            LitKey::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            LitKey::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Head of a pattern: which constructor of its type it selects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) enum Ctor {
    /// Variant of a sum type, by declaration index.
    Variant(usize),
    Bool(bool),
    /// The only constructor of a record, tuple or unit.
    Single,
    Lit(LitKey),
}

/// A pattern checked against its type, with names resolved to indices and
/// omitted record fields filled with wildcards.
#[derive(Debug, Clone)]
pub(super) enum Pat {
    Wild,
    Ctor(Ctor, Vec<Pat>),
    Or(Vec<Pat>),
}

// ---------------------------------------------------------------------------
// Type shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub(super) enum Shape<'a> {
    Sum {
        path: &'a TypePath,
        variants: &'a [Variant],
    },
    Product {
        path: &'a TypePath,
        fields: &'a [Field],
    },
    Tuple(&'a [TypeRef]),
    Unit,
    Bool,
    /// Int, Float, String and opaque types: not enumerable.
    Infinite,
    /// Named type with no definition in the program.
    Unresolved(&'a TypePath),
}

pub(super) fn shape_of<'a>(env: &TypeEnv<'a>, ty: &'a TypeRef) -> Shape<'a> {
    match ty {
        TypeRef::Bool => Shape::Bool,
        TypeRef::Unit => Shape::Unit,
        TypeRef::Tuple(items) => Shape::Tuple(items),
        TypeRef::Int | TypeRef::Float | TypeRef::Str | TypeRef::Opaque(_) => Shape::Infinite,
        TypeRef::Named(path) => match env.lookup(path) {
            Some(TypeDef::Sum { variants, .. }) => Shape::Sum { path, variants },
            Some(TypeDef::Product { fields, .. }) => Shape::Product { path, fields },
            None => Shape::Unresolved(path),
        },
    }
}

impl<'a> Shape<'a> {
    /// Every constructor of the type, or `None` when they cannot be listed.
    pub(super) fn ctors(&self) -> Option<Vec<Ctor>> {
        match self {
            Shape::Sum { variants, .. } => Some((0..variants.len()).map(Ctor::Variant).collect()),
            Shape::Bool => Some(vec![Ctor::Bool(true), Ctor::Bool(false)]),
            Shape::Product { .. } | Shape::Tuple(_) | Shape::Unit => Some(vec![Ctor::Single]),
            Shape::Infinite | Shape::Unresolved(_) => None,
        }
    }

    pub(super) fn field_types(&self, ctor: &Ctor) -> Vec<&'a TypeRef> {
        match (self, ctor) {
            (Shape::Sum { variants, .. }, Ctor::Variant(ix)) => variants
                .get(*ix)
                .map(|v| v.fields.iter().map(|f| &f.ty).collect())
                .unwrap_or_default(),
            (Shape::Product { fields, .. }, Ctor::Single) => fields.iter().map(|f| &f.ty).collect(),
            (Shape::Tuple(items), Ctor::Single) => items.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether some value is built with `ctor`.
    pub(super) fn inhabits(&self, env: &TypeEnv<'a>, ctor: &Ctor) -> bool {
        let mut visiting = Vec::new();
        self.field_types(ctor)
            .into_iter()
            .all(|ty| inhabited(env, ty, &mut visiting))
    }
}

/// A type has values when one of its constructors has only inhabited
/// fields. A named type met again while it is still being decided counts
/// as empty there, so `Loop = Loop(Loop)` has no values but a list with a
/// `Nil` case does.
fn inhabited<'a>(
    env: &TypeEnv<'a>,
    ty: &'a TypeRef,
    visiting: &mut Vec<&'a TypePath>,
) -> bool {
    let shape = shape_of(env, ty);
    let path = match shape {
        Shape::Sum { path, .. } | Shape::Product { path, .. } => Some(path),
        _ => None,
    };
    if let Some(path) = path {
        if visiting.contains(&path) {
            return false;
        }
        visiting.push(path);
    }
    let result = match shape.ctors() {
        Some(ctors) => ctors.iter().any(|c| {
            shape
                .field_types(c)
                .into_iter()
                .all(|t| inhabited(env, t, visiting))
        }),
        None => true,
    };
    if path.is_some() {
        visiting.pop();
    }
    result
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

/// A pattern whose shape does not fit the scrutinee type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedPattern {
    pub span: Span,
    pub reason: String,
}

fn malformed(span: Span, reason: String) -> MalformedPattern {
    MalformedPattern { span, reason }
}

fn undefined_type(span: Span, path: &TypePath) -> MalformedPattern {
    malformed(span, format!("type '{}' is not defined", path))
}

pub(super) struct Lowerer<'e, 'a> {
    module: &'a Module,
    env: &'e TypeEnv<'a>,
    check_or_bindings: bool,
}

impl<'e, 'a> Lowerer<'e, 'a> {
    pub(super) fn new(module: &'a Module, env: &'e TypeEnv<'a>, check_or_bindings: bool) -> Self {
        Lowerer {
            module,
            env,
            check_or_bindings,
        }
    }

    pub(super) fn lower(&self, id: PatId, ty: &'a TypeRef) -> Result<Pat, MalformedPattern> {
        let pattern = self.module.pattern(id);
        let span = pattern.span;
        let shape = shape_of(self.env, ty);

        match &pattern.kind {
            PatternKind::Wildcard | PatternKind::Binding(_) => Ok(Pat::Wild),

            PatternKind::Literal(lit) => lower_literal(lit, ty, span),

            PatternKind::Constructor { name, fields } => match shape {
                Shape::Sum { path, variants } => {
                    let Some(ix) = variants.iter().position(|v| &v.name == name) else {
                        return Err(malformed(
                            span,
                            format!("type '{}' has no variant '{}'", path, name),
                        ));
                    };
                    let owner = format!("variant '{}'", name);
                    let subs = match fields {
                        CtorFields::Positional(ps) => {
                            self.lower_positional(&variants[ix].fields, ps, span, &owner)?
                        }
                        CtorFields::Named(fs) => {
                            self.lower_named(&variants[ix].fields, fs, span, &owner)?
                        }
                    };
                    Ok(Pat::Ctor(Ctor::Variant(ix), subs))
                }
                Shape::Unresolved(path) => Err(undefined_type(span, path)),
                _ => Err(malformed(
                    span,
                    format!(
                        "constructor pattern '{}' cannot match a value of type {}",
                        name, ty
                    ),
                )),
            },

            PatternKind::UnresolvedVariant(name) => {
                Err(malformed(span, format!("unresolved variant '{}'", name)))
            }

            PatternKind::Tuple(items) => match shape {
                Shape::Tuple(tys) if tys.len() == items.len() => {
                    let subs = items
                        .iter()
                        .zip(tys)
                        .map(|(p, t)| self.lower(*p, t))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Pat::Ctor(Ctor::Single, subs))
                }
                Shape::Unit if items.is_empty() => Ok(Pat::Ctor(Ctor::Single, Vec::new())),
                Shape::Tuple(tys) => Err(malformed(
                    span,
                    format!(
                        "tuple pattern has {} elements but type {} has {}",
                        items.len(),
                        ty,
                        tys.len()
                    ),
                )),
                _ => Err(malformed(
                    span,
                    format!("tuple pattern cannot match a value of type {}", ty),
                )),
            },

            PatternKind::Record(fs) => match shape {
                Shape::Product { path, fields } => {
                    let owner = format!("record '{}'", path);
                    let subs = self.lower_named(fields, fs, span, &owner)?;
                    Ok(Pat::Ctor(Ctor::Single, subs))
                }
                Shape::Unresolved(path) => Err(undefined_type(span, path)),
                _ => Err(malformed(
                    span,
                    format!("record pattern cannot match a value of type {}", ty),
                )),
            },

            PatternKind::Or(alts) => {
                let lowered = alts
                    .iter()
                    .map(|a| self.lower(*a, ty))
                    .collect::<Result<Vec<_>, _>>()?;
                if self.check_or_bindings {
                    self.check_alternative_bindings(alts, span)?;
                }
                Ok(Pat::Or(lowered))
            }
        }
    }

    fn lower_positional(
        &self,
        decl: &'a [Field],
        given: &[PatId],
        span: Span,
        owner: &str,
    ) -> Result<Vec<Pat>, MalformedPattern> {
        if given.len() != decl.len() {
            return Err(malformed(
                span,
                format!(
                    "{} has {} field(s) but the pattern gives {}",
                    owner,
                    decl.len(),
                    given.len()
                ),
            ));
        }
        given
            .iter()
            .zip(decl)
            .map(|(p, f)| self.lower(*p, &f.ty))
            .collect()
    }

    fn lower_named(
        &self,
        decl: &'a [Field],
        given: &[(String, PatId)],
        span: Span,
        owner: &str,
    ) -> Result<Vec<Pat>, MalformedPattern> {
        let mut out = vec![Pat::Wild; decl.len()];
        let mut seen = HashSet::new();
        for (fname, pid) in given {
            let Some(ix) = decl
                .iter()
                .position(|f| f.name.as_deref() == Some(fname.as_str()))
            else {
                return Err(malformed(
                    span,
                    format!("{} has no field '{}'", owner, fname),
                ));
            };
            if !seen.insert(fname.as_str()) {
                return Err(malformed(
                    span,
                    format!("field '{}' appears twice in the pattern", fname),
                ));
            }
            out[ix] = self.lower(*pid, &decl[ix].ty)?;
        }
        Ok(out)
    }

    fn check_alternative_bindings(&self, alts: &[PatId], span: Span) -> Result<(), MalformedPattern> {
        let mut sets = alts.iter().map(|a| self.bindings(*a));
        let Some(first) = sets.next() else {
            return Ok(());
        };
        for other in sets {
            if other != first {
                return Err(malformed(
                    span,
                    format!(
                        "or-pattern alternatives bind different variables: {} and {}",
                        show_set(&first),
                        show_set(&other)
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Variables bound by a pattern. For or-patterns the first
    /// alternative stands for all of them.
    fn bindings(&self, id: PatId) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match &self.module.pattern(id).kind {
                PatternKind::Binding(name) => {
                    out.insert(name.clone());
                }
                PatternKind::Or(alts) => stack.extend(alts.first()),
                other => stack.extend(other.children()),
            }
        }
        out
    }
}

fn lower_literal(lit: &Literal, ty: &TypeRef, span: Span) -> Result<Pat, MalformedPattern> {
    let ctor = match (lit, ty) {
        (Literal::Bool(b), TypeRef::Bool) => Ctor::Bool(*b),
        (Literal::Int(i), TypeRef::Int) => Ctor::Lit(LitKey::Int(*i)),
        (Literal::Float(x), TypeRef::Float) => Ctor::Lit(LitKey::float(*x)),
        (Literal::Str(s), TypeRef::Str) => Ctor::Lit(LitKey::Str(s.clone())),
        _ => {
            return Err(malformed(
                span,
                format!("literal {} cannot match a value of type {}", lit, ty),
            ))
        }
    };
    Ok(Pat::Ctor(ctor, Vec::new()))
}

fn show_set(set: &BTreeSet<String>) -> String {
    let names: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("{{{}}}", names.join(", "))
}
