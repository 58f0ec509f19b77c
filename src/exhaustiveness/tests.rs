use super::*;
use crate::ast::{ExprId, ModuleBuilder};
use crate::diagnostics::Report;

fn run(modules: Vec<Module>, config: &AnalyzerConfig) -> Report {
    let program = Program::new(modules);
    let env = TypeEnv::new(&program);
    let sink = DiagnosticSink::new();
    check_program(&program, &env, config, &sink);
    sink.finish()
}

fn check(module: Module) -> Report {
    run(vec![module], &AnalyzerConfig::default())
}

/// Finish `b` with a pure function `f` whose body is a single match on `ty`.
fn single_match(mut b: ModuleBuilder, ty: TypeRef, arms: Vec<(PatId, Option<ExprId>)>) -> Module {
    let scrutinee = b.var("x");
    let arms = arms
        .into_iter()
        .map(|(p, guard)| {
            let body = b.int(0);
            b.arm(p, guard, body)
        })
        .collect();
    let m = b.match_(scrutinee, ty, arms);
    b.pure_fn("f", m);
    b.finish()
}

fn witnesses(report: &Report) -> Vec<String> {
    report
        .of_kind(DiagnosticKind::NonExhaustiveMatch)
        .flat_map(|d| match &d.payload {
            Payload::Witnesses { witnesses } => {
                witnesses.iter().map(|w| w.to_string()).collect::<Vec<_>>()
            }
            other => panic!("unexpected payload {:?}", other),
        })
        .collect()
}

fn unreachable_arms(report: &Report) -> Vec<usize> {
    report
        .of_kind(DiagnosticKind::UnreachablePattern)
        .map(|d| match d.payload {
            Payload::Shadowed { arm_index } => arm_index,
            ref other => panic!("unexpected payload {:?}", other),
        })
        .collect()
}

fn abc(b: &mut ModuleBuilder) -> TypeRef {
    TypeRef::Named(b.sum(
        "T",
        &[
            ("A", vec![TypeRef::Int]),
            ("B", vec![TypeRef::Int]),
            ("C", vec![TypeRef::Int]),
        ],
    ))
}

fn shape(b: &mut ModuleBuilder) -> TypeRef {
    TypeRef::Named(b.sum(
        "Shape",
        &[
            ("Circle", vec![TypeRef::Float]),
            ("Rect", vec![TypeRef::Float, TypeRef::Float]),
        ],
    ))
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

#[test]
fn missing_variant_is_reported_with_wildcard_fields() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let r = b.bind("r");
    let circle = b.ctor("Circle", vec![r]);
    let report = check(single_match(b, ty, vec![(circle, None)]));

    assert_eq!(witnesses(&report), vec!["Rect(_, _)"]);
    let d = report
        .of_kind(DiagnosticKind::NonExhaustiveMatch)
        .next()
        .expect("diagnostic");
    assert_eq!(d.function.as_deref(), Some("f"));
    assert!(d.message.contains("`Rect(_, _)`"), "message: {}", d.message);
}

#[test]
fn one_diagnostic_names_the_single_missing_variant() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let a = b.ctor_wild("A", 1);
    let bb = b.ctor_wild("B", 1);
    let report = check(single_match(b, ty, vec![(a, None), (bb, None)]));

    assert_eq!(report.diagnostics.len(), 1, "{:?}", report.diagnostics);
    assert_eq!(witnesses(&report), vec!["C(_)"]);
}

#[test]
fn complete_match_is_clean() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let circle = b.ctor_wild("Circle", 1);
    let rect = b.ctor_wild("Rect", 2);
    let report = check(single_match(b, ty, vec![(circle, None), (rect, None)]));
    assert!(report.is_clean(), "{:?}", report.diagnostics);
}

#[test]
fn guarded_arms_do_not_cover() {
    let mut b = ModuleBuilder::new("m");
    let ty = TypeRef::Named(b.sum("T", &[("A", vec![]), ("B", vec![])]));
    let a = b.ctor("A", vec![]);
    let guard = b.var("ok");
    let rest = b.wild();
    let report = check(single_match(b, ty, vec![(a, None), (rest, Some(guard))]));

    assert_eq!(witnesses(&report), vec!["B"]);
    let d = report
        .of_kind(DiagnosticKind::NonExhaustiveMatch)
        .next()
        .expect("diagnostic");
    assert!(d.message.contains("guarded"), "message: {}", d.message);
    assert!(unreachable_arms(&report).is_empty());
}

#[test]
fn only_guarded_arms_list_every_variant() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let guard = b.var("ok");
    let any = b.bind("t");
    let report = check(single_match(b, ty, vec![(any, Some(guard))]));
    assert_eq!(witnesses(&report), vec!["A(_)", "B(_)", "C(_)"]);
}

#[test]
fn witnesses_are_capped() {
    let mut b = ModuleBuilder::new("m");
    let ty = TypeRef::Named(b.sum(
        "Five",
        &[
            ("V1", vec![]),
            ("V2", vec![]),
            ("V3", vec![]),
            ("V4", vec![]),
            ("V5", vec![]),
        ],
    ));
    let v1 = b.ctor("V1", vec![]);
    let module = single_match(b, ty, vec![(v1, None)]);

    let report = check(module.clone());
    assert_eq!(witnesses(&report), vec!["V2", "V3", "V4"]);

    let config = AnalyzerConfig {
        max_witnesses: 1,
        ..AnalyzerConfig::default()
    };
    let report = run(vec![module], &config);
    assert_eq!(witnesses(&report), vec!["V2"]);
}

#[test]
fn bool_needs_both_literals() {
    let mut b = ModuleBuilder::new("m");
    let t = b.pat_lit(Literal::Bool(true));
    let report = check(single_match(b, TypeRef::Bool, vec![(t, None)]));
    assert_eq!(witnesses(&report), vec!["false"]);
}

#[test]
fn tuple_witness_names_the_uncovered_combination() {
    let mut b = ModuleBuilder::new("m");
    let t1 = b.pat_lit(Literal::Bool(true));
    let w1 = b.wild();
    let first = b.pat_tuple(vec![t1, w1]);
    let f2 = b.pat_lit(Literal::Bool(false));
    let t2 = b.pat_lit(Literal::Bool(true));
    let second = b.pat_tuple(vec![f2, t2]);
    let ty = TypeRef::Tuple(vec![TypeRef::Bool, TypeRef::Bool]);
    let report = check(single_match(b, ty, vec![(first, None), (second, None)]));
    assert_eq!(witnesses(&report), vec!["(false, false)"]);
}

#[test]
fn record_pattern_omitted_fields_are_wildcards() {
    let mut b = ModuleBuilder::new("m");
    let ty = TypeRef::Named(b.record("Point", &[("x", TypeRef::Bool), ("y", TypeRef::Bool)]));
    let t = b.pat_lit(Literal::Bool(true));
    let only_x = b.pat_record(vec![("x", t)]);
    let report = check(single_match(b, ty, vec![(only_x, None)]));
    assert_eq!(witnesses(&report), vec!["Point { x: false, y: _ }"]);
}

#[test]
fn or_patterns_cover_each_alternative() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let a = b.ctor_wild("A", 1);
    let bb = b.ctor_wild("B", 1);
    let a_or_b = b.or(vec![a, bb]);
    let c = b.ctor_wild("C", 1);
    let report = check(single_match(b, ty, vec![(a_or_b, None), (c, None)]));
    assert!(report.is_clean(), "{:?}", report.diagnostics);
}

#[test]
fn nested_variants_are_checked_field_by_field() {
    let mut b = ModuleBuilder::new("geo");
    let shape_ty = shape(&mut b);
    let ty = TypeRef::Named(b.sum("Opt", &[("Some", vec![shape_ty]), ("None", vec![])]));
    let circle = b.ctor_wild("Circle", 1);
    let some = b.ctor("Some", vec![circle]);
    let none = b.ctor("None", vec![]);
    let report = check(single_match(b, ty, vec![(some, None), (none, None)]));
    assert_eq!(witnesses(&report), vec!["Some(Rect(_, _))"]);
}

#[test]
fn int_literals_need_a_catch_all() {
    let mut b = ModuleBuilder::new("m");
    let one = b.pat_lit(Literal::Int(1));
    let two = b.pat_lit(Literal::Int(2));
    let report = check(single_match(b, TypeRef::Int, vec![(one, None), (two, None)]));
    assert_eq!(witnesses(&report), vec!["_"]);

    let mut b = ModuleBuilder::new("m");
    let one = b.pat_lit(Literal::Int(1));
    let rest = b.bind("n");
    let report = check(single_match(b, TypeRef::Int, vec![(one, None), (rest, None)]));
    assert!(report.is_clean(), "{:?}", report.diagnostics);
}

#[test]
fn empty_sum_needs_no_arms() {
    let mut b = ModuleBuilder::new("m");
    let ty = TypeRef::Named(b.sum("Never", &[]));
    let module = single_match(b, ty.clone(), vec![]);
    assert!(check(module).is_clean());

    let mut b = ModuleBuilder::new("m");
    b.sum("Never", &[]);
    let w = b.wild();
    let report = check(single_match(b, ty, vec![(w, None)]));
    assert_eq!(unreachable_arms(&report), vec![0]);
    assert!(witnesses(&report).is_empty());
}

#[test]
fn variant_with_an_empty_field_is_neither_required_nor_reachable() {
    let build = |with_a: bool| {
        let mut b = ModuleBuilder::new("m");
        let never = TypeRef::Named(b.sum("Never", &[]));
        let ty = TypeRef::Named(b.sum("T", &[("A", vec![never]), ("B", vec![])]));
        let mut arms = Vec::new();
        if with_a {
            arms.push((b.ctor_wild("A", 1), None));
        }
        arms.push((b.ctor("B", vec![]), None));
        single_match(b, ty, arms)
    };

    let report = check(build(false));
    assert!(report.is_clean(), "{:?}", report.diagnostics);

    let report = check(build(true));
    assert!(witnesses(&report).is_empty());
    assert_eq!(unreachable_arms(&report), vec![0]);
}

#[test]
fn self_referencing_types_are_empty_only_without_a_base_case() {
    let mut b = ModuleBuilder::new("m");
    let looped = TypeRef::Named(TypePath::new("m", "Loop"));
    b.sum("Loop", &[("Again", vec![looped.clone()])]);
    let list = TypeRef::Named(TypePath::new("m", "List"));
    b.sum("List", &[("Nil", vec![]), ("Cons", vec![TypeRef::Int, list.clone()])]);
    let ty = TypeRef::Named(b.sum(
        "T",
        &[("Stuck", vec![looped]), ("Items", vec![list]), ("Done", vec![])],
    ));
    let done = b.ctor("Done", vec![]);
    let report = check(single_match(b, ty, vec![(done, None)]));
    assert_eq!(witnesses(&report), vec!["Items(_)"]);
}

#[test]
fn matches_inside_arm_bodies_are_checked() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);

    let inner_scrutinee = b.var("y");
    let circle = b.ctor_wild("Circle", 1);
    let inner_body = b.int(1);
    let inner_arm = b.arm(circle, None, inner_body);
    let inner = b.match_(inner_scrutinee, ty.clone(), vec![inner_arm]);

    let outer_scrutinee = b.var("x");
    let any = b.wild();
    let outer_arm = b.arm(any, None, inner);
    let outer = b.match_(outer_scrutinee, ty, vec![outer_arm]);
    b.pure_fn("f", outer);

    let report = check(b.finish());
    assert_eq!(witnesses(&report), vec!["Rect(_, _)"]);
}

// ---------------------------------------------------------------------------
// Reachability
// ---------------------------------------------------------------------------

#[test]
fn trailing_wildcard_after_full_coverage_is_unreachable() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let a = b.ctor_wild("A", 1);
    let bb = b.ctor_wild("B", 1);
    let c = b.ctor_wild("C", 1);
    let rest = b.at(40, 5).wild();
    let report = check(single_match(
        b,
        ty,
        vec![(a, None), (bb, None), (c, None), (rest, None)],
    ));

    assert_eq!(unreachable_arms(&report), vec![3]);
    let d = report
        .of_kind(DiagnosticKind::UnreachablePattern)
        .next()
        .expect("diagnostic");
    assert_eq!(d.location, Span::new(40, 5), "points at the shadowed arm");
    assert!(witnesses(&report).is_empty());
}

#[test]
fn guarded_arm_after_catch_all_is_unreachable() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let any = b.wild();
    let guard = b.var("ok");
    let a = b.ctor_wild("A", 1);
    let report = check(single_match(b, ty, vec![(any, None), (a, Some(guard))]));
    assert_eq!(unreachable_arms(&report), vec![1]);
}

#[test]
fn negative_zero_is_the_same_float_literal_as_zero() {
    let mut b = ModuleBuilder::new("m");
    let zero = b.pat_lit(Literal::Float(0.0));
    let neg = b.pat_lit(Literal::Float(-0.0));
    let rest = b.wild();
    let report = check(single_match(
        b,
        TypeRef::Float,
        vec![(zero, None), (neg, None), (rest, None)],
    ));
    assert_eq!(unreachable_arms(&report), vec![1]);
}

#[test]
fn unreachable_reporting_can_be_disabled() {
    let mut b = ModuleBuilder::new("m");
    let ty = abc(&mut b);
    let any = b.wild();
    let a = b.ctor_wild("A", 1);
    let module = single_match(b, ty, vec![(any, None), (a, None)]);
    let config = AnalyzerConfig {
        report_unreachable: false,
        ..AnalyzerConfig::default()
    };
    assert!(run(vec![module], &config).is_clean());
}

// ---------------------------------------------------------------------------
// Malformed patterns
// ---------------------------------------------------------------------------

fn malformed_messages(report: &Report) -> Vec<&str> {
    report
        .of_kind(DiagnosticKind::MalformedPattern)
        .map(|d| d.message.as_str())
        .collect()
}

#[test]
fn record_pattern_on_sum_is_malformed_and_stops_the_match() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let w = b.wild();
    let rec = b.pat_record(vec![("x", w)]);
    let report = check(single_match(b, ty, vec![(rec, None)]));

    let messages = malformed_messages(&report);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("record pattern"), "{}", messages[0]);
    assert!(witnesses(&report).is_empty(), "no coverage verdict for a malformed match");
}

#[test]
fn unknown_variant_is_malformed() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let tri = b.ctor_wild("Triangle", 3);
    let report = check(single_match(b, ty, vec![(tri, None)]));
    let messages = malformed_messages(&report);
    assert!(
        messages[0].contains("has no variant 'Triangle'"),
        "{}",
        messages[0]
    );
    match &report.diagnostics[0].payload {
        Payload::Malformed { arm_index } => assert_eq!(*arm_index, 0),
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn unresolved_variant_is_malformed() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let u = b.unresolved("Circel");
    let report = check(single_match(b, ty, vec![(u, None)]));
    assert!(malformed_messages(&report)[0].contains("unresolved variant 'Circel'"));
}

#[test]
fn patterns_on_an_undefined_type_name_it() {
    let ghost = TypeRef::Named(TypePath::new("m", "Ghost"));

    let mut b = ModuleBuilder::new("m");
    let boo = b.ctor("Boo", vec![]);
    let report = check(single_match(b, ghost.clone(), vec![(boo, None)]));
    assert_eq!(
        malformed_messages(&report),
        vec!["malformed pattern in arm 1: type 'm.Ghost' is not defined"]
    );

    let mut b = ModuleBuilder::new("m");
    let w = b.wild();
    let rec = b.pat_record(vec![("x", w)]);
    let report = check(single_match(b, ghost, vec![(rec, None)]));
    assert_eq!(
        malformed_messages(&report),
        vec!["malformed pattern in arm 1: type 'm.Ghost' is not defined"]
    );
}

#[test]
fn field_count_mismatch_is_malformed() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let rect = b.ctor_wild("Rect", 1);
    let report = check(single_match(b, ty, vec![(rect, None)]));
    let messages = malformed_messages(&report);
    assert!(
        messages[0].contains("variant 'Rect' has 2 field(s) but the pattern gives 1"),
        "{}",
        messages[0]
    );
}

#[test]
fn or_alternatives_must_bind_the_same_names() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);
    let r = b.bind("r");
    let circle = b.ctor("Circle", vec![r]);
    let w = b.bind("w");
    let h = b.wild();
    let rect = b.ctor("Rect", vec![w, h]);
    let either = b.or(vec![circle, rect]);
    let module = single_match(b, ty, vec![(either, None)]);

    let report = check(module.clone());
    let messages = malformed_messages(&report);
    assert!(
        messages[0].contains("bind different variables: {r} and {w}"),
        "{}",
        messages[0]
    );

    let config = AnalyzerConfig {
        check_or_bindings: false,
        ..AnalyzerConfig::default()
    };
    assert!(run(vec![module], &config).is_clean());
}

#[test]
fn malformed_match_does_not_hide_other_matches() {
    let mut b = ModuleBuilder::new("geo");
    let ty = shape(&mut b);

    let s1 = b.var("a");
    let bad = b.pat_lit(Literal::Str("circle".to_string()));
    let body1 = b.int(0);
    let arm1 = b.arm(bad, None, body1);
    let first = b.match_(s1, ty.clone(), vec![arm1]);

    let s2 = b.var("b");
    let circle = b.ctor_wild("Circle", 1);
    let body2 = b.int(0);
    let arm2 = b.arm(circle, None, body2);
    let second = b.match_(s2, ty, vec![arm2]);

    let body = b.block(vec![first, second]);
    b.pure_fn("f", body);
    let report = check(b.finish());

    assert_eq!(malformed_messages(&report).len(), 1);
    assert_eq!(witnesses(&report), vec!["Rect(_, _)"]);
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

#[test]
fn analyze_match_reports_verdict_directly() {
    let mut b = ModuleBuilder::new("m");
    let ty = TypeRef::Unit;
    let unit = b.pat_tuple(vec![]);
    let module = single_match(b, ty, vec![(unit, None)]);
    let program = Program::new(vec![module]);
    let env = TypeEnv::new(&program);
    let module = &program.modules[0];
    let body = module.functions[0].body;
    let ExprKind::Match(m) = &module.expr(body).kind else {
        panic!("body is a match");
    };

    let verdict = analyze_match(module, &env, m, &AnalyzerConfig::default());
    assert!(verdict.is_exhaustive());
    assert_eq!(
        verdict,
        MatchVerdict::Checked {
            missing: vec![],
            unreachable: vec![],
        }
    );
}
