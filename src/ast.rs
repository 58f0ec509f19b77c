/// Program model consumed by the analyzer.
///
/// Modules are produced by an external parser and handed over already
/// resolved: callees carry fully-qualified paths where the parser could
/// resolve them, types are attached to every match scrutinee. Expression and
/// pattern trees live in per-module arenas and reference their children by
/// index. A child index is always strictly smaller than its parent's, which
/// keeps every tree acyclic (checked by [`Program::validate`]).
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TypeRef;

mod builder;

pub use builder::ModuleBuilder;

// ---------------------------------------------------------------------------
// Locations and ids
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatId(pub u32);

impl PatId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purity {
    Pure,
    Effectful,
}

/// Fully-qualified function reference: `module.name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FnPath {
    pub module: String,
    pub name: String,
}

impl FnPath {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        FnPath {
            module: module.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for FnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDef {
    Sum {
        name: String,
        variants: Vec<Variant>,
        #[serde(default)]
        span: Span,
    },
    Product {
        name: String,
        fields: Vec<Field>,
        #[serde(default)]
        span: Span,
    },
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Sum { name, .. } | TypeDef::Product { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDef::Sum { span, .. } | TypeDef::Product { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub purity: Purity,
    #[serde(default)]
    pub params: Vec<(String, TypeRef)>,
    pub ret: TypeRef,
    pub body: ExprId,
    #[serde(default)]
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{:?}", x),
            Literal::Str(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
    And,
    Or,
}

/// Call target as resolved by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Callee {
    /// A declaration the parser resolved to a fully-qualified path.
    Function(FnPath),
    /// A name the parser could not resolve to a declaration: a builtin,
    /// an intrinsic, or something external to the program.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Var(String),
    Call { callee: Callee, args: Vec<ExprId> },
    Construct { variant: String, args: Vec<ExprId> },
    Tuple(Vec<ExprId>),
    Record(Vec<(String, ExprId)>),
    Field { base: ExprId, field: String },
    BinOp { op: BinOp, lhs: ExprId, rhs: ExprId },
    Let { name: String, value: ExprId },
    Block(Vec<ExprId>),
    Return(ExprId),
    Match(MatchExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExpr {
    pub scrutinee: ExprId,
    pub scrutinee_ty: TypeRef,
    pub arms: Vec<MatchArm>,
}

/// One `pattern [if guard] => body` arm. Arm order is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: PatId,
    #[serde(default)]
    pub guard: Option<ExprId>,
    pub body: ExprId,
    #[serde(default)]
    pub span: Span,
}

impl ExprKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Literal(_) | ExprKind::Var(_) => vec![],
            ExprKind::Call { args, .. } | ExprKind::Construct { args, .. } => args.clone(),
            ExprKind::Tuple(items) | ExprKind::Block(items) => items.clone(),
            ExprKind::Record(fields) => fields.iter().map(|(_, e)| *e).collect(),
            ExprKind::Field { base, .. } => vec![*base],
            ExprKind::BinOp { lhs, rhs, .. } => vec![*lhs, *rhs],
            ExprKind::Let { value, .. } => vec![*value],
            ExprKind::Return(e) => vec![*e],
            ExprKind::Match(m) => {
                let mut out = vec![m.scrutinee];
                for arm in &m.arms {
                    if let Some(g) = arm.guard {
                        out.push(g);
                    }
                    out.push(arm.body);
                }
                out
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    Wildcard,
    Binding(String),
    Literal(Literal),
    Constructor {
        name: String,
        #[serde(default)]
        fields: CtorFields,
    },
    /// Constructor name the parser could not resolve against any type.
    UnresolvedVariant(String),
    Tuple(Vec<PatId>),
    /// Named-field pattern; fields not mentioned match anything.
    Record(Vec<(String, PatId)>),
    Or(Vec<PatId>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CtorFields {
    Positional(Vec<PatId>),
    Named(Vec<(String, PatId)>),
}

impl Default for CtorFields {
    fn default() -> Self {
        CtorFields::Positional(Vec::new())
    }
}

impl PatternKind {
    pub fn children(&self) -> Vec<PatId> {
        match self {
            PatternKind::Wildcard
            | PatternKind::Binding(_)
            | PatternKind::Literal(_)
            | PatternKind::UnresolvedVariant(_) => vec![],
            PatternKind::Constructor { fields, .. } => match fields {
                CtorFields::Positional(ps) => ps.clone(),
                CtorFields::Named(fs) => fs.iter().map(|(_, p)| *p).collect(),
            },
            PatternKind::Tuple(ps) | PatternKind::Or(ps) => ps.clone(),
            PatternKind::Record(fs) => fs.iter().map(|(_, p)| *p).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Modules and programs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub functions: Vec<FnDecl>,
    #[serde(default)]
    pub exprs: Vec<Expr>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
}

impl Module {
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn pattern(&self, id: PatId) -> &Pattern {
        &self.patterns[id.index()]
    }

    pub fn function(&self, name: &str) -> Option<&FnDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name() == name)
    }

    /// Pre-order walk of the expression tree rooted at `root`, children in
    /// source order. Shared subtrees are yielded once.
    pub fn descendants(&self, root: ExprId) -> Descendants<'_> {
        Descendants {
            module: self,
            stack: vec![root],
            seen: HashSet::new(),
        }
    }
}

pub struct Descendants<'a> {
    module: &'a Module,
    stack: Vec<ExprId>,
    seen: HashSet<ExprId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (ExprId, &'a Expr);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if !self.seen.insert(id) {
                continue;
            }
            let expr = self.module.expr(id);
            self.stack.extend(expr.kind.children().into_iter().rev());
            return Some((id, expr));
        }
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub modules: Vec<Module>,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid program model: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate module '{0}'")]
    DuplicateModule(String),
    #[error("module '{module}': duplicate function '{name}'")]
    DuplicateFunction { module: String, name: String },
    #[error("module '{module}': duplicate type '{name}'")]
    DuplicateType { module: String, name: String },
    #[error("module '{module}': type '{ty}' declares variant '{variant}' twice")]
    DuplicateVariant {
        module: String,
        ty: String,
        variant: String,
    },
    #[error("module '{module}': '{owner}' declares field '{field}' twice")]
    DuplicateField {
        module: String,
        owner: String,
        field: String,
    },
    #[error("module '{module}': record type '{ty}' has an unnamed field")]
    UnnamedRecordField { module: String, ty: String },
    #[error("module '{module}': expression #{id} is out of bounds")]
    ExprOutOfBounds { module: String, id: u32 },
    #[error("module '{module}': pattern #{id} is out of bounds")]
    PatternOutOfBounds { module: String, id: u32 },
    #[error("module '{module}': node #{parent} references #{child}, which is not an earlier node")]
    ForwardReference {
        module: String,
        parent: u32,
        child: u32,
    },
}

impl Program {
    pub fn new(modules: Vec<Module>) -> Self {
        Program { modules }
    }

    /// Parse and validate a JSON-encoded program model.
    pub fn from_json(src: &str) -> Result<Self, ModelError> {
        let program: Program = serde_json::from_str(src)?;
        program.validate()?;
        Ok(program)
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn function(&self, path: &FnPath) -> Option<&FnDecl> {
        self.module(&path.module)?.function(&path.name)
    }

    /// Check the input contract: unique names, in-bounds and acyclic arenas.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut module_names = HashSet::new();
        for module in &self.modules {
            if !module_names.insert(module.name.as_str()) {
                return Err(ModelError::DuplicateModule(module.name.clone()));
            }
            validate_module(module)?;
        }
        Ok(())
    }
}

fn validate_module(module: &Module) -> Result<(), ModelError> {
    let m = || module.name.clone();

    let mut fn_names = HashSet::new();
    for f in &module.functions {
        if !fn_names.insert(f.name.as_str()) {
            return Err(ModelError::DuplicateFunction {
                module: m(),
                name: f.name.clone(),
            });
        }
        check_expr_id(module, f.body)?;
    }

    let mut type_names = HashSet::new();
    for td in &module.types {
        if !type_names.insert(td.name()) {
            return Err(ModelError::DuplicateType {
                module: m(),
                name: td.name().to_string(),
            });
        }
        match td {
            TypeDef::Sum { name, variants, .. } => {
                let mut seen = HashSet::new();
                for v in variants {
                    if !seen.insert(v.name.as_str()) {
                        return Err(ModelError::DuplicateVariant {
                            module: m(),
                            ty: name.clone(),
                            variant: v.name.clone(),
                        });
                    }
                    check_field_names(module, &format!("{}.{}", name, v.name), &v.fields)?;
                }
            }
            TypeDef::Product { name, fields, .. } => {
                if fields.iter().any(|f| f.name.is_none()) {
                    return Err(ModelError::UnnamedRecordField {
                        module: m(),
                        ty: name.clone(),
                    });
                }
                check_field_names(module, name, fields)?;
            }
        }
    }

    for (ix, expr) in module.exprs.iter().enumerate() {
        let parent = ix as u32;
        let mut children = expr.kind.children();
        if let ExprKind::Match(mx) = &expr.kind {
            for arm in &mx.arms {
                check_pat_id(module, arm.pattern)?;
            }
        }
        for child in children.drain(..) {
            check_expr_id(module, child)?;
            if child.0 >= parent {
                return Err(ModelError::ForwardReference {
                    module: m(),
                    parent,
                    child: child.0,
                });
            }
        }
    }

    for (ix, pat) in module.patterns.iter().enumerate() {
        let parent = ix as u32;
        for child in pat.kind.children() {
            check_pat_id(module, child)?;
            if child.0 >= parent {
                return Err(ModelError::ForwardReference {
                    module: m(),
                    parent,
                    child: child.0,
                });
            }
        }
    }
    Ok(())
}

fn check_field_names(module: &Module, owner: &str, fields: &[Field]) -> Result<(), ModelError> {
    let mut seen = HashSet::new();
    for name in fields.iter().filter_map(|f| f.name.as_deref()) {
        if !seen.insert(name) {
            return Err(ModelError::DuplicateField {
                module: module.name.clone(),
                owner: owner.to_string(),
                field: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_expr_id(module: &Module, id: ExprId) -> Result<(), ModelError> {
    if id.index() < module.exprs.len() {
        Ok(())
    } else {
        Err(ModelError::ExprOutOfBounds {
            module: module.name.clone(),
            id: id.0,
        })
    }
}

fn check_pat_id(module: &Module, id: PatId) -> Result<(), ModelError> {
    if id.index() < module.patterns.len() {
        Ok(())
    } else {
        Err(ModelError::PatternOutOfBounds {
            module: module.name.clone(),
            id: id.0,
        })
    }
}
