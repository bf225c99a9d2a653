//! Error collection and configuration behavior.
//!
//! Non-fatal problems are batched so one run reports everything; unsupported
//! constructs stop the analysis and suppress typed output.

use molt_ast::{BinaryOp, Program};
use molt_common::{AnalysisOptions, DiagnosticKind, Severity};
use molt_infer::analyze;

#[test]
fn multiple_problems_are_collected_in_one_run() {
    // a = missing_name
    // d = {}; d[1] = "x"; d["y"] = 2
    let mut program = Program::new();
    let mut m = program.module("main");
    let missing = m.name("missing_name");
    let s1 = m.assign_name("a", missing);
    m.stmt(s1);
    let d = m.dict(&[], &[]);
    let s2 = m.assign_name("d", d);
    m.stmt(s2);
    let dn = m.name("d");
    let k1 = m.int(1);
    let sub1 = m.subscript(dn, k1);
    let v1 = m.str_("x");
    let s3 = m.assign(sub1, v1);
    m.stmt(s3);
    let dn2 = m.name("d");
    let k2 = m.str_("y");
    let sub2 = m.subscript(dn2, k2);
    let v2 = m.int(2);
    let s4 = m.assign(sub2, v2);
    m.stmt(s4);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(analysis.has_errors());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::InferenceFailure)
    );
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::TypeConflict)
    );
    // Analysis proceeded past the first problem.
    assert!(analysis.diagnostics.len() >= 2);
}

#[test]
fn nested_function_definitions_are_fatal() {
    // def outer():
    //     def inner(): pass
    //     return 1
    // r = outer()
    let mut program = Program::new();
    let mut m = program.module("main");
    let pass = m.pass();
    let inner = m.def("inner", &[], vec![pass]);
    let one = m.int(1);
    let ret = m.ret(Some(one));
    let outer = m.def("outer", &[], vec![inner, ret]);
    m.stmt(outer);
    let call = m.call_name("outer", &[]);
    let s = m.assign_name("r", call);
    m.stmt(s);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnsupportedConstruct)
    );
    // Fatal: no typed program is produced.
    assert!(analysis.typed.functions.is_empty());
}

#[test]
fn unknown_imports_are_fatal() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let imp = m.import("nowhere");
    m.stmt(imp);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnsupportedConstruct
                && d.severity == Severity::Error)
    );
    assert!(analysis.typed.functions.is_empty());
}

#[test]
fn disabled_assertions_are_not_traversed() {
    // assert missing_name
    let mut program = Program::new();
    let mut m = program.module("main");
    let missing = m.name("missing_name");
    let assert_stmt = m.assert_(missing, None);
    m.stmt(assert_stmt);
    m.finish();

    let options = AnalysisOptions {
        assertions_enabled: false,
        ..AnalysisOptions::default()
    };
    let analysis = analyze(program, options);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
}

#[test]
fn enabled_assertions_are_traversed() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let missing = m.name("missing_name");
    let assert_stmt = m.assert_(missing, None);
    m.stmt(assert_stmt);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::InferenceFailure)
    );
}

#[test]
fn unknown_builtin_methods_are_reported() {
    // x = 1; x.append(2)
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let s1 = m.assign_name("x", one);
    m.stmt(s1);
    let x = m.name("x");
    let two = m.int(2);
    let call = m.method(x, "append", &[two]);
    let s2 = m.expr_stmt(call);
    m.stmt(s2);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(analysis.has_errors());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::InferenceFailure && d.message.contains("append"))
    );
}

#[test]
fn out_of_range_literals_depend_on_bounds_mode() {
    let build = |v: i64| {
        let mut program = Program::new();
        let mut m = program.module("main");
        let lit = m.int(v);
        let s = m.assign_name("x", lit);
        m.stmt(s);
        m.finish();
        program
    };

    let strict = analyze(build(1 << 40), AnalysisOptions::default());
    assert!(
        strict
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::TypeConflict)
    );

    let relaxed = analyze(
        build(1 << 40),
        AnalysisOptions {
            assume_bounds_checked: true,
            ..AnalysisOptions::default()
        },
    );
    assert!(relaxed.diagnostics.is_empty(), "{:?}", relaxed.diagnostics);

    let wide = analyze(
        build(1 << 40),
        AnalysisOptions {
            integer_width: molt_common::IntWidth::I64,
            ..AnalysisOptions::default()
        },
    );
    assert!(wide.diagnostics.is_empty(), "{:?}", wide.diagnostics);
}

#[test]
fn conflicting_scalar_assignments_widen_or_conflict() {
    // n = 1; n = 2.5  -> widens to float, no error
    // s = 1; s = "x"  -> conflict
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let a1 = m.assign_name("n", one);
    m.stmt(a1);
    let f = m.float(2.5);
    let a2 = m.assign_name("n", f);
    m.stmt(a2);
    let i = m.int(1);
    let b1 = m.assign_name("s", i);
    m.stmt(b1);
    let x = m.str_("x");
    let b2 = m.assign_name("s", x);
    m.stmt(b2);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    let conflicts: Vec<_> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::TypeConflict)
        .collect();
    assert_eq!(conflicts.len(), 1, "{:?}", analysis.diagnostics);
    assert!(conflicts[0].message.contains("`s`"));
}

#[test]
fn operator_misuse_surfaces_as_inference_failure() {
    // y = 1 + "s": the numeric operator drops the non-numeric operand, so
    // the result never receives a type.
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let s = m.str_("s");
    let sum = m.binary(BinaryOp::Add, one, s);
    let a = m.assign_name("y", sum);
    m.stmt(a);
    m.finish();

    let analysis = analyze(program, AnalysisOptions::default());
    assert!(analysis.has_errors());
    assert!(
        analysis
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::InferenceFailure)
    );
}
