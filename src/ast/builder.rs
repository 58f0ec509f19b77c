use super::*;
use crate::types::TypePath;

/// Incremental construction of a [`Module`] without a parser.
///
/// Children must be allocated before their parents, which is what the
/// arena layout requires anyway. Every allocated node gets the next line
/// number, so source order follows allocation order unless a span is set
/// explicitly with [`ModuleBuilder::at`].
pub struct ModuleBuilder {
    module: Module,
    next_line: u32,
    pinned: Option<Span>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleBuilder {
            module: Module {
                name: name.into(),
                types: Vec::new(),
                functions: Vec::new(),
                exprs: Vec::new(),
                patterns: Vec::new(),
            },
            next_line: 1,
            pinned: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// Use `span` for the next allocated node only.
    pub fn at(&mut self, line: u32, col: u32) -> &mut Self {
        self.pinned = Some(Span::new(line, col));
        self
    }

    fn span(&mut self) -> Span {
        if let Some(span) = self.pinned.take() {
            self.next_line = self.next_line.max(span.line + 1);
            return span;
        }
        let span = Span::new(self.next_line, 1);
        self.next_line += 1;
        span
    }

    pub fn finish(self) -> Module {
        self.module
    }

    // ── Types ────────────────────────────────────────────────────────────

    /// Sum type with positional variant fields.
    pub fn sum(&mut self, name: &str, variants: &[(&str, Vec<TypeRef>)]) -> TypePath {
        let variants = variants
            .iter()
            .map(|(vname, tys)| Variant {
                name: vname.to_string(),
                fields: tys
                    .iter()
                    .map(|ty| Field {
                        name: None,
                        ty: ty.clone(),
                    })
                    .collect(),
            })
            .collect();
        self.sum_with(name, variants)
    }

    pub fn sum_with(&mut self, name: &str, variants: Vec<Variant>) -> TypePath {
        let span = self.span();
        self.module.types.push(TypeDef::Sum {
            name: name.to_string(),
            variants,
            span,
        });
        TypePath::new(self.module.name.as_str(), name)
    }

    pub fn record(&mut self, name: &str, fields: &[(&str, TypeRef)]) -> TypePath {
        let span = self.span();
        self.module.types.push(TypeDef::Product {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(fname, ty)| Field {
                    name: Some(fname.to_string()),
                    ty: ty.clone(),
                })
                .collect(),
            span,
        });
        TypePath::new(self.module.name.as_str(), name)
    }

    // ── Functions ────────────────────────────────────────────────────────

    pub fn function(
        &mut self,
        name: &str,
        purity: Purity,
        params: Vec<(&str, TypeRef)>,
        ret: TypeRef,
        body: ExprId,
    ) -> FnPath {
        let span = self.span();
        self.module.functions.push(FnDecl {
            name: name.to_string(),
            purity,
            params: params
                .into_iter()
                .map(|(p, ty)| (p.to_string(), ty))
                .collect(),
            ret,
            body,
            span,
        });
        FnPath::new(self.module.name.as_str(), name)
    }

    pub fn pure_fn(&mut self, name: &str, body: ExprId) -> FnPath {
        self.function(name, Purity::Pure, vec![], TypeRef::Unit, body)
    }

    pub fn effectful_fn(&mut self, name: &str, body: ExprId) -> FnPath {
        self.function(name, Purity::Effectful, vec![], TypeRef::Unit, body)
    }

    // ── Expressions ──────────────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        let span = self.span();
        let id = ExprId(self.module.exprs.len() as u32);
        self.module.exprs.push(Expr { kind, span });
        id
    }

    pub fn lit(&mut self, lit: Literal) -> ExprId {
        self.expr(ExprKind::Literal(lit))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.lit(Literal::Int(value))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        self.expr(ExprKind::Var(name.to_string()))
    }

    /// Call to a function declared in this module.
    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        let path = FnPath::new(self.module.name.as_str(), name);
        self.call_path(path, args)
    }

    pub fn call_path(&mut self, path: FnPath, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call {
            callee: Callee::Function(path),
            args,
        })
    }

    /// Call to a name the parser left unresolved (builtin or intrinsic).
    pub fn external(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Call {
            callee: Callee::External(name.to_string()),
            args,
        })
    }

    pub fn construct(&mut self, variant: &str, args: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Construct {
            variant: variant.to_string(),
            args,
        })
    }

    pub fn tuple(&mut self, items: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Tuple(items))
    }

    pub fn binop(&mut self, op: BinOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.expr(ExprKind::BinOp { op, lhs, rhs })
    }

    pub fn let_(&mut self, name: &str, value: ExprId) -> ExprId {
        self.expr(ExprKind::Let {
            name: name.to_string(),
            value,
        })
    }

    pub fn block(&mut self, items: Vec<ExprId>) -> ExprId {
        self.expr(ExprKind::Block(items))
    }

    pub fn ret(&mut self, value: ExprId) -> ExprId {
        self.expr(ExprKind::Return(value))
    }

    pub fn arm(&self, pattern: PatId, guard: Option<ExprId>, body: ExprId) -> MatchArm {
        let span = self.module.patterns[pattern.index()].span;
        MatchArm {
            pattern,
            guard,
            body,
            span,
        }
    }

    pub fn match_(&mut self, scrutinee: ExprId, ty: TypeRef, arms: Vec<MatchArm>) -> ExprId {
        self.expr(ExprKind::Match(MatchExpr {
            scrutinee,
            scrutinee_ty: ty,
            arms,
        }))
    }

    // ── Patterns ─────────────────────────────────────────────────────────

    pub fn pat(&mut self, kind: PatternKind) -> PatId {
        let span = self.span();
        let id = PatId(self.module.patterns.len() as u32);
        self.module.patterns.push(Pattern { kind, span });
        id
    }

    pub fn wild(&mut self) -> PatId {
        self.pat(PatternKind::Wildcard)
    }

    pub fn bind(&mut self, name: &str) -> PatId {
        self.pat(PatternKind::Binding(name.to_string()))
    }

    pub fn pat_lit(&mut self, lit: Literal) -> PatId {
        self.pat(PatternKind::Literal(lit))
    }

    pub fn ctor(&mut self, name: &str, fields: Vec<PatId>) -> PatId {
        self.pat(PatternKind::Constructor {
            name: name.to_string(),
            fields: CtorFields::Positional(fields),
        })
    }

    pub fn ctor_named(&mut self, name: &str, fields: Vec<(&str, PatId)>) -> PatId {
        self.pat(PatternKind::Constructor {
            name: name.to_string(),
            fields: CtorFields::Named(
                fields
                    .into_iter()
                    .map(|(f, p)| (f.to_string(), p))
                    .collect(),
            ),
        })
    }

    /// Constructor pattern with one wildcard per field: `Name(_, _)`.
    pub fn ctor_wild(&mut self, name: &str, arity: usize) -> PatId {
        let fields = (0..arity).map(|_| self.wild()).collect();
        self.ctor(name, fields)
    }

    pub fn unresolved(&mut self, name: &str) -> PatId {
        self.pat(PatternKind::UnresolvedVariant(name.to_string()))
    }

    pub fn pat_tuple(&mut self, items: Vec<PatId>) -> PatId {
        self.pat(PatternKind::Tuple(items))
    }

    pub fn pat_record(&mut self, fields: Vec<(&str, PatId)>) -> PatId {
        self.pat(PatternKind::Record(
            fields
                .into_iter()
                .map(|(f, p)| (f.to_string(), p))
                .collect(),
        ))
    }

    pub fn or(&mut self, alts: Vec<PatId>) -> PatId {
        self.pat(PatternKind::Or(alts))
    }
}
