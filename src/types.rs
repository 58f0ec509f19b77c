/// Static type references as attached to the program model.
///
/// The analyzer performs no inference: every scrutinee arrives with a
/// `TypeRef`, and named types are looked up through a [`TypeEnv`] built once
/// per program.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{Program, TypeDef};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypePath {
    pub module: String,
    pub name: String,
}

impl TypePath {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        TypePath {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    Bool,
    Int,
    Float,
    Str,
    Unit,
    Tuple(Vec<TypeRef>),
    /// User-defined sum or product type, fully qualified.
    Named(TypePath),
    /// A type whose values the analyzer cannot enumerate (functions,
    /// unmodeled builtins). Only catch-all patterns cover it.
    Opaque(String),
}

impl TypeRef {
    pub fn named(module: impl Into<String>, name: impl Into<String>) -> Self {
        TypeRef::Named(TypePath::new(module, name))
    }

    pub fn display(&self) -> String {
        match self {
            TypeRef::Bool => "Bool".to_string(),
            TypeRef::Int => "Int".to_string(),
            TypeRef::Float => "Float".to_string(),
            TypeRef::Str => "String".to_string(),
            TypeRef::Unit => "Unit".to_string(),
            TypeRef::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|t| t.display()).collect();
                format!("({})", parts.join(", "))
            }
            TypeRef::Named(path) => path.to_string(),
            TypeRef::Opaque(name) => name.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Lookup table from fully-qualified type paths to their definitions.
#[derive(Debug, Default)]
pub struct TypeEnv<'a> {
    defs: HashMap<TypePath, &'a TypeDef>,
}

impl<'a> TypeEnv<'a> {
    pub fn new(program: &'a Program) -> Self {
        let mut defs = HashMap::new();
        for module in &program.modules {
            for td in &module.types {
                defs.insert(TypePath::new(module.name.as_str(), td.name()), td);
            }
        }
        TypeEnv { defs }
    }

    pub fn lookup(&self, path: &TypePath) -> Option<&'a TypeDef> {
        self.defs.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
