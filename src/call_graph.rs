/// Call-graph construction and Tarjan's SCC algorithm.
///
/// Nodes are the function declarations of a whole program, numbered in
/// module order then declaration order. Edges are individual call sites, so
/// two calls from `f` to `g` give two edges. The builder only records
/// structure: intrinsic leaves and unresolved callees are attached to the
/// calling node, and no judgement is made here.
use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::ast::{Callee, ExprKind, FnPath, Module, Program, Purity, Span};
use crate::config::AnalyzerConfig;
use crate::intrinsics::EffectCategory;

// ---------------------------------------------------------------------------
// Graph types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FnId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicSite {
    pub name: String,
    pub category: EffectCategory,
    pub span: Span,
}

/// A call whose target is not a declaration in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCallee {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnNode {
    pub path: FnPath,
    pub module_index: usize,
    pub decl_index: usize,
    pub purity: Purity,
    pub span: Span,
    /// Intrinsic calls made directly by the body, in call-site order.
    pub intrinsics: Vec<IntrinsicSite>,
    pub unknown_callees: Vec<UnknownCallee>,
}

impl FnNode {
    pub fn has_intrinsic_effect(&self) -> bool {
        !self.intrinsics.is_empty()
    }

    pub fn has_unknown_callee(&self) -> bool {
        !self.unknown_callees.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEdge {
    pub caller: FnId,
    pub callee: FnId,
    pub span: Span,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<FnNode>,
    edges: Vec<CallEdge>,
    /// Edge indices per caller, in call-site order.
    outgoing: Vec<Vec<usize>>,
    index: HashMap<FnPath, FnId>,
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Everything one module contributes to the graph.
struct ModuleCalls {
    nodes: Vec<FnNode>,
    edges: Vec<(FnId, FnId, Span)>,
}

impl CallGraph {
    #[instrument(skip_all, fields(modules = program.modules.len()))]
    pub fn build(program: &Program, config: &AnalyzerConfig) -> CallGraph {
        let mut index = HashMap::new();
        let mut offsets = Vec::with_capacity(program.modules.len());
        for module in &program.modules {
            offsets.push(index.len());
            for f in &module.functions {
                let id = FnId(index.len());
                index.insert(FnPath::new(module.name.as_str(), f.name.as_str()), id);
            }
        }

        // Modules are independent once the index exists.
        let per_module: Vec<ModuleCalls> = program
            .modules
            .par_iter()
            .enumerate()
            .map(|(mi, module)| collect_module_calls(mi, module, offsets[mi], &index, config))
            .collect();

        let mut nodes = Vec::with_capacity(index.len());
        let mut edges = Vec::new();
        for calls in per_module {
            nodes.extend(calls.nodes);
            for (caller, callee, span) in calls.edges {
                edges.push(CallEdge {
                    caller,
                    callee,
                    span,
                });
            }
        }

        let mut outgoing = vec![Vec::new(); nodes.len()];
        for (ix, edge) in edges.iter().enumerate() {
            outgoing[edge.caller.0].push(ix);
        }

        debug!(
            functions = nodes.len(),
            edges = edges.len(),
            "call graph built"
        );
        CallGraph {
            nodes,
            edges,
            outgoing,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: FnId) -> &FnNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = (FnId, &FnNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (FnId(i), n))
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn lookup(&self, path: &FnPath) -> Option<FnId> {
        self.index.get(path).copied()
    }

    /// Resolved calls made by `id`, in call-site order.
    pub fn calls_from(&self, id: FnId) -> impl Iterator<Item = &CallEdge> {
        self.outgoing[id.0].iter().map(move |&ix| &self.edges[ix])
    }

    pub fn calls(&self, caller: FnId, callee: FnId) -> bool {
        self.calls_from(caller).any(|e| e.callee == callee)
    }
}

fn collect_module_calls(
    module_index: usize,
    module: &Module,
    offset: usize,
    index: &HashMap<FnPath, FnId>,
    config: &AnalyzerConfig,
) -> ModuleCalls {
    let mut nodes = Vec::with_capacity(module.functions.len());
    let mut edges = Vec::new();

    for (decl_index, f) in module.functions.iter().enumerate() {
        let caller = FnId(offset + decl_index);
        let mut node = FnNode {
            path: FnPath::new(module.name.as_str(), f.name.as_str()),
            module_index,
            decl_index,
            purity: f.purity,
            span: f.span,
            intrinsics: Vec::new(),
            unknown_callees: Vec::new(),
        };

        for (_, expr) in module.descendants(f.body) {
            let ExprKind::Call { callee, .. } = &expr.kind else {
                continue;
            };
            match callee {
                Callee::Function(path) => match index.get(path) {
                    Some(&target) => edges.push((caller, target, expr.span)),
                    None => node.unknown_callees.push(UnknownCallee {
                        name: path.to_string(),
                        span: expr.span,
                    }),
                },
                Callee::External(name) => {
                    if let Some(category) = config.intrinsics.category(name) {
                        node.intrinsics.push(IntrinsicSite {
                            name: name.clone(),
                            category,
                            span: expr.span,
                        });
                    } else if !config.is_pure_external(name) {
                        node.unknown_callees.push(UnknownCallee {
                            name: name.clone(),
                            span: expr.span,
                        });
                    }
                }
            }
        }
        nodes.push(node);
    }

    ModuleCalls { nodes, edges }
}

// ---------------------------------------------------------------------------
// Tarjan's SCC algorithm (iterative)
// ---------------------------------------------------------------------------

impl CallGraph {
    /// Strongly-connected components in reverse topological order: every
    /// component comes after all components it calls into. Members of a
    /// component are sorted by id.
    pub fn sccs(&self) -> Vec<Vec<FnId>> {
        let n = self.nodes.len();
        let mut next_index = 0usize;
        let mut indices: Vec<Option<usize>> = vec![None; n];
        let mut lowlinks = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut sccs = Vec::new();

        // (node, position in its outgoing edge list)
        let mut work: Vec<(usize, usize)> = Vec::new();

        for root in 0..n {
            if indices[root].is_some() {
                continue;
            }
            indices[root] = Some(next_index);
            lowlinks[root] = next_index;
            next_index += 1;
            stack.push(root);
            on_stack[root] = true;
            work.push((root, 0));

            while let Some(frame) = work.last_mut() {
                let (v, pos) = *frame;
                if let Some(&edge_ix) = self.outgoing[v].get(pos) {
                    frame.1 += 1;
                    let w = self.edges[edge_ix].callee.0;
                    match indices[w] {
                        None => {
                            indices[w] = Some(next_index);
                            lowlinks[w] = next_index;
                            next_index += 1;
                            stack.push(w);
                            on_stack[w] = true;
                            work.push((w, 0));
                        }
                        Some(w_index) => {
                            if on_stack[w] && w_index < lowlinks[v] {
                                lowlinks[v] = w_index;
                            }
                        }
                    }
                    continue;
                }

                work.pop();
                if let Some(&(parent, _)) = work.last() {
                    if lowlinks[v] < lowlinks[parent] {
                        lowlinks[parent] = lowlinks[v];
                    }
                }

                if Some(lowlinks[v]) == indices[v] {
                    let mut scc = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        scc.push(FnId(w));
                        if w == v {
                            break;
                        }
                    }
                    scc.sort();
                    sccs.push(scc);
                }
            }
        }

        sccs
    }

    /// Functions that are recursive, directly or mutually.
    pub fn recursive_functions(&self) -> HashSet<FnId> {
        let mut recursive = HashSet::new();
        for scc in self.sccs() {
            if scc.len() > 1 {
                recursive.extend(scc);
            } else if let [id] = scc.as_slice() {
                if self.calls(*id, *id) {
                    recursive.insert(*id);
                }
            }
        }
        recursive
    }
}
