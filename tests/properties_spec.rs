/// Property-based tests for the analyzer.
///
/// 1. **Acyclic graphs**: a function is effectively pure exactly when no
///    function reachable from it (itself included) has an effect leaf.
/// 2. **Cycles**: one effect inside a call cycle makes every member impure.
/// 3. **Determinism**: analyzing the same program twice gives the same
///    report, byte for byte.
/// 4. **Enum coverage**: the witnesses of a match over a field-less sum
///    type are exactly the variants it does not mention.
use std::collections::HashSet;

use proptest::prelude::*;

use avow::analyzer::{analyze, run};
use avow::ast::{ModuleBuilder, Program};
use avow::config::AnalyzerConfig;
use avow::diagnostics::{DiagnosticKind, Payload};
use avow::purity::EffectivePurity;
use avow::types::TypeRef;

// ============================================================================
// Generators
// ============================================================================

/// Effect leaf placed in a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leaf {
    Nothing,
    Intrinsic,
    Unknown,
    Both,
}

fn leaf() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        3 => Just(Leaf::Nothing),
        1 => Just(Leaf::Intrinsic),
        1 => Just(Leaf::Unknown),
        1 => Just(Leaf::Both),
    ]
}

/// Function count, callee lists and effect leaves for a random call graph.
fn call_graph() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<Leaf>)> {
    (1usize..10).prop_flat_map(|n| {
        (
            prop::collection::vec(prop::collection::vec(0..n, 0..4), n),
            prop::collection::vec(leaf(), n),
        )
    })
}

fn name(i: usize) -> String {
    format!("f{}", i)
}

/// Every function is declared pure; its body calls the listed callees and
/// then performs its leaf effect.
fn build(calls: &[Vec<usize>], leaves: &[Leaf]) -> Program {
    let mut b = ModuleBuilder::new("p");
    for (i, callees) in calls.iter().enumerate() {
        let mut items = Vec::new();
        for &j in callees {
            items.push(b.call(&name(j), vec![]));
        }
        if matches!(leaves[i], Leaf::Intrinsic | Leaf::Both) {
            items.push(b.external("print", vec![]));
        }
        if matches!(leaves[i], Leaf::Unknown | Leaf::Both) {
            items.push(b.external("mystery", vec![]));
        }
        let body = b.block(items);
        b.pure_fn(&name(i), body);
    }
    Program::new(vec![b.finish()])
}

fn reachable(calls: &[Vec<usize>], start: usize) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack = vec![start];
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(calls[i].iter().copied());
        }
    }
    seen
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn acyclic_purity_matches_reachability((calls, leaves) in call_graph()) {
        // Keep only forward calls so the graph has no cycles.
        let calls: Vec<Vec<usize>> = calls
            .iter()
            .enumerate()
            .map(|(i, cs)| cs.iter().copied().filter(|&j| j > i).collect())
            .collect();
        let program = build(&calls, &leaves);
        let analysis = run(&program, &AnalyzerConfig::default());

        for i in 0..calls.len() {
            let reach = reachable(&calls, i);
            let intrinsic = reach
                .iter()
                .any(|&j| matches!(leaves[j], Leaf::Intrinsic | Leaf::Both));
            let unknown = reach
                .iter()
                .any(|&j| matches!(leaves[j], Leaf::Unknown | Leaf::Both));
            let expected = if intrinsic || unknown {
                EffectivePurity::Impure { proven: intrinsic }
            } else {
                EffectivePurity::Pure
            };

            let id = analysis
                .graph
                .lookup(&avow::ast::FnPath::new("p", name(i)))
                .expect("declared");
            prop_assert_eq!(analysis.purity.effective(id), expected, "function {}", name(i));
        }
    }

    #[test]
    fn an_effect_in_a_cycle_taints_every_member(
        n in 2usize..8,
        effectful in 0usize..8,
        extra in prop::collection::vec((0usize..8, 0usize..8), 0..6),
    ) {
        let effectful = effectful % n;
        let mut calls: Vec<Vec<usize>> = (0..n).map(|i| vec![(i + 1) % n]).collect();
        for (from, to) in extra {
            calls[from % n].push(to % n);
        }
        let mut leaves = vec![Leaf::Nothing; n];
        leaves[effectful] = Leaf::Intrinsic;

        let report = analyze(&build(&calls, &leaves), &AnalyzerConfig::default());
        let flagged: HashSet<String> = report
            .of_kind(DiagnosticKind::PurityViolation)
            .filter_map(|d| d.function.clone())
            .collect();
        let expected: HashSet<String> = (0..n).map(name).collect();
        prop_assert_eq!(flagged, expected);
    }

    #[test]
    fn analysis_is_deterministic((calls, leaves) in call_graph()) {
        let program = build(&calls, &leaves);
        let config = AnalyzerConfig::default();
        let first = analyze(&program, &config);
        let second = analyze(&program, &config);
        prop_assert_eq!(first.to_json_pretty(), second.to_json_pretty());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn enum_witnesses_are_the_unmentioned_variants(
        mentioned in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mut b = ModuleBuilder::new("m");
        let variants: Vec<(String, Vec<TypeRef>)> = (0..mentioned.len())
            .map(|i| (format!("V{}", i), vec![]))
            .collect();
        let borrowed: Vec<(&str, Vec<TypeRef>)> = variants
            .iter()
            .map(|(v, f)| (v.as_str(), f.clone()))
            .collect();
        let ty = TypeRef::Named(b.sum("E", &borrowed));

        let scrutinee = b.var("e");
        let mut arms = Vec::new();
        for (i, _) in mentioned.iter().enumerate().filter(|(_, m)| **m) {
            let p = b.ctor(&format!("V{}", i), vec![]);
            let body = b.int(0);
            arms.push(b.arm(p, None, body));
        }
        let m = b.match_(scrutinee, ty, arms);
        b.pure_fn("f", m);

        let config = AnalyzerConfig {
            max_witnesses: 8,
            ..AnalyzerConfig::default()
        };
        let report = analyze(&Program::new(vec![b.finish()]), &config);

        let expected: Vec<String> = mentioned
            .iter()
            .enumerate()
            .filter(|(_, m)| !**m)
            .map(|(i, _)| format!("V{}", i))
            .collect();
        let found: Vec<String> = report
            .of_kind(DiagnosticKind::NonExhaustiveMatch)
            .flat_map(|d| match &d.payload {
                Payload::Witnesses { witnesses } => {
                    witnesses.iter().map(|w| w.to_string()).collect::<Vec<_>>()
                }
                _ => Vec::new(),
            })
            .collect();
        prop_assert_eq!(found, expected);
        prop_assert!(report.of_kind(DiagnosticKind::UnreachablePattern).next().is_none());
    }
}
