/// Diagnostics produced by both checkers and the reporter that collects them.
///
/// Findings are values, never control flow: checkers push into a
/// [`DiagnosticSink`] (shared by worker threads) and the final [`Report`] is
/// produced once every producer is done, deduplicated and ordered by
/// module, declaration, source position and kind.
use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::ast::Span;
use crate::exhaustiveness::WitnessPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    PurityViolation,
    UnresolvedCallAssumedImpure,
    DeclaredEffectfulButPure,
    MalformedPattern,
    NonExhaustiveMatch,
    UnreachablePattern,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::PurityViolation
            | DiagnosticKind::NonExhaustiveMatch
            | DiagnosticKind::MalformedPattern => Severity::Error,
            DiagnosticKind::UnresolvedCallAssumedImpure
            | DiagnosticKind::DeclaredEffectfulButPure
            | DiagnosticKind::UnreachablePattern => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::PurityViolation => "purity-violation",
            DiagnosticKind::UnresolvedCallAssumedImpure => "unresolved-call-assumed-impure",
            DiagnosticKind::DeclaredEffectfulButPure => "declared-effectful-but-pure",
            DiagnosticKind::MalformedPattern => "malformed-pattern",
            DiagnosticKind::NonExhaustiveMatch => "non-exhaustive-match",
            DiagnosticKind::UnreachablePattern => "unreachable-pattern",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific structured data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Payload {
    None,
    /// Function names from the reported function to the offending leaf
    /// (intrinsic or unresolved name), with the call site of every hop.
    CallChain {
        chain: Vec<String>,
        call_sites: Vec<Span>,
    },
    Witnesses {
        witnesses: Vec<WitnessPattern>,
    },
    Shadowed {
        arm_index: usize,
    },
    Malformed {
        arm_index: usize,
    },
}

/// Position of the declaration a diagnostic belongs to, used for ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin {
    pub module_index: usize,
    pub decl_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    pub location: Span,
    pub message: String,
    pub payload: Payload,
    #[serde(skip)]
    pub origin: Origin,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        module: &str,
        origin: Origin,
        location: Span,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            severity: kind.severity(),
            kind,
            module: module.to_string(),
            function: None,
            location,
            message: message.into(),
            payload: Payload::None,
            origin,
        }
    }

    pub fn in_function(mut self, name: &str) -> Self {
        self.function = Some(name.to_string());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn sort_key(&self) -> (Origin, Span, DiagnosticKind, &str) {
        (self.origin, self.location, self.kind, self.message.as_str())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}:{}: {}",
            self.severity, self.kind, self.module, self.location, self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Append-only, many-writer diagnostic collection.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    inner: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(diagnostics);
    }

    /// Consume the sink once all producers are done.
    pub fn finish(self) -> Report {
        let diagnostics = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        Report::from_diagnostics(diagnostics)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    pub summary: Summary,
}

impl Report {
    /// Normalize: deterministic order, exact duplicates dropped.
    pub fn from_diagnostics(mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let mut seen = HashSet::new();
        diagnostics.retain(|d| seen.insert(d.clone()));

        let errors = diagnostics.iter().filter(|d| d.is_error()).count();
        let summary = Summary {
            errors,
            warnings: diagnostics.len() - errors,
        };
        Report {
            diagnostics,
            summary,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn to_json_pretty(&self) -> String {
        // Every field is plain data; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
