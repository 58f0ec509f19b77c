/// Pattern-match exhaustiveness and reachability.
///
/// Every `match` in every function body is checked on its own: arm patterns
/// are lowered against the scrutinee type, then the usefulness search asks
/// which values no unguarded arm covers and which arms can never be reached.
/// A malformed pattern aborts only the match it belongs to.
use rayon::prelude::*;
use tracing::{debug, instrument, trace};

use crate::ast::{
    CtorFields, ExprKind, Field, FnDecl, Literal, MatchExpr, Module, PatId, PatternKind, Program,
    Span, TypeDef, Variant,
};
use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Origin, Payload};
use crate::types::{TypeEnv, TypePath, TypeRef};

mod lower;
mod usefulness;
mod witness;

#[cfg(test)]
mod tests;

pub use lower::MalformedPattern;
pub use witness::{WitnessField, WitnessPattern};

use lower::{Lowerer, Pat};
use usefulness::Usefulness;

/// Outcome of checking a single match expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchVerdict {
    /// At least one arm does not fit the scrutinee type; nothing else was
    /// checked for this match.
    Malformed(Vec<(usize, MalformedPattern)>),
    Checked {
        /// Uncovered values, empty when the match is exhaustive.
        missing: Vec<WitnessPattern>,
        /// Indices of arms no value can reach.
        unreachable: Vec<usize>,
    },
}

impl MatchVerdict {
    pub fn is_exhaustive(&self) -> bool {
        matches!(self, MatchVerdict::Checked { missing, .. } if missing.is_empty())
    }
}

/// Check one match expression of `module`.
pub fn analyze_match(
    module: &Module,
    env: &TypeEnv<'_>,
    m: &MatchExpr,
    config: &AnalyzerConfig,
) -> MatchVerdict {
    let lowerer = Lowerer::new(module, env, config.check_or_bindings);
    let ty = &m.scrutinee_ty;

    let mut rows = Vec::with_capacity(m.arms.len());
    let mut malformed = Vec::new();
    for (ix, arm) in m.arms.iter().enumerate() {
        match lowerer.lower(arm.pattern, ty) {
            Ok(pat) => rows.push(pat),
            Err(err) => malformed.push((ix, err)),
        }
    }
    if !malformed.is_empty() {
        return MatchVerdict::Malformed(malformed);
    }

    let tys = [ty];

    // Guarded arms may fail at runtime, so only unguarded rows cover values.
    let mut covering: Vec<Vec<Pat>> = Vec::with_capacity(rows.len());
    let mut unreachable = Vec::new();
    let probe = Usefulness::new(env, 1);
    for (ix, (arm, pat)) in m.arms.iter().zip(rows).enumerate() {
        let row = vec![pat];
        if config.report_unreachable && probe.witnesses(&covering, &row, &tys).is_empty() {
            unreachable.push(ix);
        }
        if arm.guard.is_none() {
            covering.push(row);
        }
    }

    let missing = Usefulness::new(env, config.max_witnesses)
        .witnesses(&covering, &[Pat::Wild], &tys)
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .collect();

    MatchVerdict::Checked {
        missing,
        unreachable,
    }
}

/// Check every match reachable from `decl.body`, nested ones included.
pub fn check_function(
    module_index: usize,
    module: &Module,
    decl_index: usize,
    decl: &FnDecl,
    env: &TypeEnv<'_>,
    config: &AnalyzerConfig,
) -> Vec<Diagnostic> {
    let origin = Origin {
        module_index,
        decl_index,
    };
    let mut out = Vec::new();

    for (_, expr) in module.descendants(decl.body) {
        let ExprKind::Match(m) = &expr.kind else {
            continue;
        };
        let verdict = analyze_match(module, env, m, config);
        trace!(function = %decl.name, at = %expr.span, ?verdict, "match checked");

        match verdict {
            MatchVerdict::Malformed(errors) => {
                for (arm_index, err) in errors {
                    out.push(
                        Diagnostic::new(
                            DiagnosticKind::MalformedPattern,
                            &module.name,
                            origin,
                            err.span,
                            format!("malformed pattern in arm {}: {}", arm_index + 1, err.reason),
                        )
                        .in_function(&decl.name)
                        .with_payload(Payload::Malformed { arm_index }),
                    );
                }
            }
            MatchVerdict::Checked {
                missing,
                unreachable,
            } => {
                if !missing.is_empty() {
                    out.push(
                        Diagnostic::new(
                            DiagnosticKind::NonExhaustiveMatch,
                            &module.name,
                            origin,
                            expr.span,
                            non_exhaustive_message(m, &missing),
                        )
                        .in_function(&decl.name)
                        .with_payload(Payload::Witnesses { witnesses: missing }),
                    );
                }
                for arm_index in unreachable {
                    let arm = &m.arms[arm_index];
                    out.push(
                        Diagnostic::new(
                            DiagnosticKind::UnreachablePattern,
                            &module.name,
                            origin,
                            arm.span,
                            format!(
                                "arm {} is unreachable: earlier arms cover every value it matches",
                                arm_index + 1
                            ),
                        )
                        .in_function(&decl.name)
                        .with_payload(Payload::Shadowed { arm_index }),
                    );
                }
            }
        }
    }
    out
}

fn non_exhaustive_message(m: &MatchExpr, missing: &[WitnessPattern]) -> String {
    let shown: Vec<String> = missing.iter().map(|w| format!("`{}`", w)).collect();
    let noun = if missing.len() == 1 { "pattern" } else { "patterns" };
    let mut message = format!(
        "non-exhaustive match on {}: {} {} not covered",
        m.scrutinee_ty,
        noun,
        shown.join(", ")
    );
    if m.arms.iter().any(|a| a.guard.is_some()) {
        message.push_str(" (guarded arms do not count towards coverage)");
    }
    message
}

/// Check every function of `program`; functions are independent, so they
/// are checked in parallel.
#[instrument(skip_all)]
pub fn check_program(
    program: &Program,
    env: &TypeEnv<'_>,
    config: &AnalyzerConfig,
    sink: &DiagnosticSink,
) {
    let jobs: Vec<(usize, &Module, usize, &FnDecl)> = program
        .modules
        .iter()
        .enumerate()
        .flat_map(|(mi, module)| {
            module
                .functions
                .iter()
                .enumerate()
                .map(move |(di, decl)| (mi, module, di, decl))
        })
        .collect();

    let found: Vec<Diagnostic> = jobs
        .par_iter()
        .flat_map_iter(|&(mi, module, di, decl)| check_function(mi, module, di, decl, env, config))
        .collect();

    debug!(
        functions = jobs.len(),
        diagnostics = found.len(),
        "exhaustiveness check finished"
    );
    sink.extend(found);
}
