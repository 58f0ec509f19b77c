/// Effect propagation.
///
/// Effective purity is decided per strongly-connected component of the call
/// graph, callees before callers. A component is impure when any member calls
/// an intrinsic or an unresolved name, or calls out to an impure component.
/// Impurity is *proven* when an intrinsic is reachable and *assumed* when
/// only unresolved calls are.
///
/// Declared purity is a ceiling: a `Pure` function that is effectively impure
/// is an error, an `Effectful` function that turns out pure is at most a
/// hygiene warning.
use std::collections::VecDeque;

use tracing::{debug, instrument, trace};

use crate::ast::{Purity, Span};
use crate::call_graph::{CallGraph, FnId, FnNode};
use crate::config::AnalyzerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Origin, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectivePurity {
    Pure,
    Impure { proven: bool },
}

impl EffectivePurity {
    pub fn is_pure(self) -> bool {
        self == EffectivePurity::Pure
    }
}

/// The leaf a call chain ends in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainLeaf {
    Intrinsic { name: String, span: Span },
    Unresolved { name: String, span: Span },
}

impl ChainLeaf {
    pub fn name(&self) -> &str {
        match self {
            ChainLeaf::Intrinsic { name, .. } | ChainLeaf::Unresolved { name, .. } => name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ChainLeaf::Intrinsic { span, .. } | ChainLeaf::Unresolved { span, .. } => *span,
        }
    }
}

/// Shortest path from a function to the effect that makes it impure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallChain {
    /// Starts with the reported function, ends with the function that
    /// contains the leaf.
    pub functions: Vec<FnId>,
    /// One span per hop: the calls between consecutive functions, then the
    /// leaf call itself.
    pub call_sites: Vec<Span>,
    pub leaf: ChainLeaf,
}

#[derive(Debug, Clone)]
pub struct PurityAnalysis {
    effective: Vec<EffectivePurity>,
    component: Vec<usize>,
    sccs: Vec<Vec<FnId>>,
}

impl PurityAnalysis {
    #[instrument(skip_all, fields(functions = graph.len()))]
    pub fn compute(graph: &CallGraph) -> Self {
        let sccs = graph.sccs();
        let mut component = vec![0usize; graph.len()];
        for (ci, scc) in sccs.iter().enumerate() {
            for id in scc {
                component[id.0] = ci;
            }
        }

        let mut effective = vec![EffectivePurity::Pure; graph.len()];
        for (ci, scc) in sccs.iter().enumerate() {
            let mut proven = false;
            let mut assumed = false;
            for &id in scc {
                let node = graph.node(id);
                proven |= node.has_intrinsic_effect();
                assumed |= node.has_unknown_callee();
                for edge in graph.calls_from(id) {
                    if component[edge.callee.0] == ci {
                        continue;
                    }
                    match effective[edge.callee.0] {
                        EffectivePurity::Impure { proven: true } => proven = true,
                        EffectivePurity::Impure { proven: false } => assumed = true,
                        EffectivePurity::Pure => {}
                    }
                }
            }
            let value = if proven || assumed {
                EffectivePurity::Impure { proven }
            } else {
                EffectivePurity::Pure
            };
            trace!(component = ci, size = scc.len(), ?value, "component resolved");
            for &id in scc {
                effective[id.0] = value;
            }
        }

        debug!(components = sccs.len(), "effective purity computed");
        PurityAnalysis {
            effective,
            component,
            sccs,
        }
    }

    pub fn effective(&self, id: FnId) -> EffectivePurity {
        self.effective[id.0]
    }

    pub fn component_of(&self, id: FnId) -> usize {
        self.component[id.0]
    }

    /// Components in the order they were resolved (callees first).
    pub fn components(&self) -> &[Vec<FnId>] {
        &self.sccs
    }

    /// Breadth-first search for the nearest leaf explaining why `start` is
    /// impure. The search only walks functions sharing `start`'s verdict,
    /// so a proven function always gets a chain ending in an intrinsic.
    pub fn call_chain(&self, graph: &CallGraph, start: FnId) -> Option<CallChain> {
        let proven = match self.effective(start) {
            EffectivePurity::Pure => return None,
            EffectivePurity::Impure { proven } => proven,
        };
        let in_subgraph = |id: FnId| match self.effective(id) {
            EffectivePurity::Impure { proven: p } => p == proven,
            EffectivePurity::Pure => false,
        };

        let mut prev: Vec<Option<(FnId, Span)>> = vec![None; graph.len()];
        let mut visited = vec![false; graph.len()];
        let mut queue = VecDeque::new();
        visited[start.0] = true;
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let node = graph.node(current);
            let leaf = if proven {
                node.intrinsics.first().map(|site| ChainLeaf::Intrinsic {
                    name: site.name.clone(),
                    span: site.span,
                })
            } else {
                node.unknown_callees
                    .first()
                    .map(|u| ChainLeaf::Unresolved {
                        name: u.name.clone(),
                        span: u.span,
                    })
            };
            if let Some(leaf) = leaf {
                return Some(rebuild_chain(&prev, current, leaf));
            }
            for edge in graph.calls_from(current) {
                let next = edge.callee;
                if !visited[next.0] && in_subgraph(next) {
                    visited[next.0] = true;
                    prev[next.0] = Some((current, edge.span));
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

fn rebuild_chain(prev: &[Option<(FnId, Span)>], end: FnId, leaf: ChainLeaf) -> CallChain {
    let mut functions = vec![end];
    let mut call_sites = vec![leaf.span()];
    let mut cursor = end;
    while let Some((from, span)) = prev[cursor.0] {
        functions.push(from);
        call_sites.push(span);
        cursor = from;
    }
    functions.reverse();
    call_sites.reverse();
    CallChain {
        functions,
        call_sites,
        leaf,
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Run effect propagation over `graph` and report violations into `sink`.
#[instrument(skip_all)]
pub fn check_purity(
    graph: &CallGraph,
    config: &AnalyzerConfig,
    sink: &DiagnosticSink,
) -> PurityAnalysis {
    let analysis = PurityAnalysis::compute(graph);
    let mut out = Vec::new();

    for (id, node) in graph.nodes() {
        let origin = Origin {
            module_index: node.module_index,
            decl_index: node.decl_index,
        };
        let name = node.path.name.as_str();
        let module = node.path.module.as_str();

        match (node.purity, analysis.effective(id)) {
            (Purity::Pure, EffectivePurity::Impure { proven }) => {
                let chain = analysis.call_chain(graph, id);
                violation(graph, node, origin, proven, chain.as_ref(), &mut out);
            }
            (Purity::Effectful, EffectivePurity::Pure)
                if config.warn_declared_effectful_but_pure =>
            {
                out.push(
                    Diagnostic::new(
                        DiagnosticKind::DeclaredEffectfulButPure,
                        module,
                        origin,
                        node.span,
                        format!(
                            "function '{}' is declared effectful but performs no effects",
                            name
                        ),
                    )
                    .in_function(name),
                );
            }
            _ => {}
        }
    }

    debug!(diagnostics = out.len(), "purity check finished");
    sink.extend(out);
    analysis
}

/// Display names along a chain; functions outside `home` are qualified.
/// Diagnostics for a pure-declared function found to be impure. Without a
/// chain the violation is still reported, at the declaration.
fn violation(
    graph: &CallGraph,
    node: &FnNode,
    origin: Origin,
    proven: bool,
    chain: Option<&CallChain>,
    out: &mut Vec<Diagnostic>,
) {
    let name = node.path.name.as_str();
    let module = node.path.module.as_str();

    let Some(chain) = chain else {
        out.push(
            Diagnostic::new(
                DiagnosticKind::PurityViolation,
                module,
                origin,
                node.span,
                format!("function '{}' is declared pure but performs effects", name),
            )
            .in_function(name)
            .with_payload(Payload::CallChain {
                chain: vec![name.to_string()],
                call_sites: Vec::new(),
            }),
        );
        return;
    };

    let names = chain_names(graph, chain, module);
    let location = chain.call_sites.first().copied().unwrap_or(node.span);
    let payload = Payload::CallChain {
        chain: names.clone(),
        call_sites: chain.call_sites.clone(),
    };
    let message = if proven {
        format!(
            "function '{}' is declared pure but performs effects: {}",
            name,
            names.join(" → ")
        )
    } else {
        format!(
            "function '{}' is declared pure but calls unresolved '{}': {}",
            name,
            chain.leaf.name(),
            names.join(" → ")
        )
    };
    out.push(
        Diagnostic::new(
            DiagnosticKind::PurityViolation,
            module,
            origin,
            location,
            message,
        )
        .in_function(name)
        .with_payload(payload.clone()),
    );
    if !proven {
        out.push(
            Diagnostic::new(
                DiagnosticKind::UnresolvedCallAssumedImpure,
                module,
                origin,
                location,
                format!(
                    "call to unresolved '{}' is assumed to be effectful",
                    chain.leaf.name()
                ),
            )
            .in_function(name)
            .with_payload(payload),
        );
    }
}

fn chain_names(graph: &CallGraph, chain: &CallChain, home: &str) -> Vec<String> {
    let mut names: Vec<String> = chain
        .functions
        .iter()
        .map(|&id| {
            let path = &graph.node(id).path;
            if path.module == home {
                path.name.clone()
            } else {
                path.to_string()
            }
        })
        .collect();
    names.push(chain.leaf.name().to_string());
    names
}
