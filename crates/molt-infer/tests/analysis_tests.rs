//! Whole-program inference scenarios driven through the public driver.

use molt_ast::{BinaryOp, CompareOp, Program};
use molt_common::{AnalysisOptions, DiagnosticKind};
use molt_infer::{Analysis, TypedFunction, analyze};

fn run(program: Program) -> Analysis {
    analyze(program, AnalysisOptions::default())
}

fn global<'a>(analysis: &'a Analysis, module: &str, name: &str) -> &'a str {
    analysis
        .typed
        .modules
        .iter()
        .find(|m| m.name == module)
        .and_then(|m| m.globals.get(name))
        .map(String::as_str)
        .unwrap_or_else(|| panic!("no global `{name}` in module `{module}`"))
}

fn function<'a>(analysis: &'a Analysis, name: &str) -> &'a TypedFunction {
    analysis
        .typed
        .functions
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no function `{name}` in the typed program"))
}

#[test]
fn integers_flow_through_arithmetic() {
    // x = 1; y = x + 2
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let s1 = m.assign_name("x", one);
    let x = m.name("x");
    let two = m.int(2);
    let sum = m.binary(BinaryOp::Add, x, two);
    let s2 = m.assign_name("y", sum);
    m.stmt(s1);
    m.stmt(s2);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "x"), "int");
    assert_eq!(global(&analysis, "main", "y"), "int");
}

#[test]
fn distinct_list_literals_keep_distinct_element_types() {
    // a = []; a.append(1); b = []; b.append("s")
    let mut program = Program::new();
    let mut m = program.module("main");
    let a = m.list(&[]);
    let s1 = m.assign_name("a", a);
    let an = m.name("a");
    let one = m.int(1);
    let append_a = m.method(an, "append", &[one]);
    let s2 = m.expr_stmt(append_a);
    let b = m.list(&[]);
    let s3 = m.assign_name("b", b);
    let bn = m.name("b");
    let s = m.str_("s");
    let append_b = m.method(bn, "append", &[s]);
    let s4 = m.expr_stmt(append_b);
    for stmt in [s1, s2, s3, s4] {
        m.stmt(stmt);
    }
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "a"), "list[int]");
    assert_eq!(global(&analysis, "main", "b"), "list[str]");
    // Syntactically distinct literals are distinct sites; no splitting is
    // needed to keep them apart.
    assert_eq!(analysis.stats.splits, 0);
}

#[test]
fn identity_function_specializes_per_argument_class() {
    // def ident(x): return x
    // r1 = ident(1); r2 = ident("s")
    let mut program = Program::new();
    let mut m = program.module("main");
    let x = m.name("x");
    let ret = m.ret(Some(x));
    let def = m.def("ident", &["x"], vec![ret]);
    m.stmt(def);
    let one = m.int(1);
    let c1 = m.call_name("ident", &[one]);
    let s1 = m.assign_name("r1", c1);
    m.stmt(s1);
    let s = m.str_("s");
    let c2 = m.call_name("ident", &[s]);
    let s2 = m.assign_name("r2", c2);
    m.stmt(s2);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(function(&analysis, "ident").instantiations.len(), 2);
    assert_eq!(global(&analysis, "main", "r1"), "int");
    assert_eq!(global(&analysis, "main", "r2"), "str");
}

#[test]
fn sibling_subclasses_share_one_instantiation() {
    // class A: def m(self): return 1
    // class B(A): def m(self): return 2
    // def f(x): return x.m()
    // r1 = f(A()); r2 = f(B())
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let ra = m.ret(Some(one));
    let ma = m.def("m", &["self"], vec![ra]);
    let class_a = m.class("A", &[], vec![ma]);
    m.stmt(class_a);
    let two = m.int(2);
    let rb = m.ret(Some(two));
    let mb = m.def("m", &["self"], vec![rb]);
    let class_b = m.class("B", &["A"], vec![mb]);
    m.stmt(class_b);
    let x = m.name("x");
    let call_m = m.method(x, "m", &[]);
    let rf = m.ret(Some(call_m));
    let f = m.def("f", &["x"], vec![rf]);
    m.stmt(f);
    let ctor_a = m.call_name("A", &[]);
    let s1 = m.assign_name("a", ctor_a);
    m.stmt(s1);
    let ctor_b = m.call_name("B", &[]);
    let s2 = m.assign_name("b", ctor_b);
    m.stmt(s2);
    let a = m.name("a");
    let c1 = m.call_name("f", &[a]);
    let s3 = m.assign_name("r1", c1);
    m.stmt(s3);
    let b = m.name("b");
    let c2 = m.call_name("f", &[b]);
    let s4 = m.assign_name("r2", c2);
    m.stmt(s4);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    let f = function(&analysis, "f");
    assert_eq!(f.instantiations.len(), 1);
    let inst = &f.instantiations[0];
    assert_eq!(inst.params[0], ("x".to_string(), "A | B".to_string()));
    assert_eq!(inst.returns, "int");
    assert_eq!(global(&analysis, "main", "r1"), "int");
    assert_eq!(global(&analysis, "main", "r2"), "int");
}

#[test]
fn mixed_dict_keys_and_values_conflict() {
    // d = {}; d[1] = "x"; d["y"] = 2
    let mut program = Program::new();
    let mut m = program.module("main");
    let d = m.dict(&[], &[]);
    let s1 = m.assign_name("d", d);
    m.stmt(s1);
    let dn = m.name("d");
    let k1 = m.int(1);
    let sub1 = m.subscript(dn, k1);
    let v1 = m.str_("x");
    let s2 = m.assign(sub1, v1);
    m.stmt(s2);
    let dn2 = m.name("d");
    let k2 = m.str_("y");
    let sub2 = m.subscript(dn2, k2);
    let v2 = m.int(2);
    let s3 = m.assign(sub2, v2);
    m.stmt(s3);
    m.finish();

    let analysis = run(program);
    assert!(analysis.has_errors());
    let conflicts: Vec<_> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::TypeConflict)
        .collect();
    // Both the key slot and the value slot are polluted.
    assert_eq!(conflicts.len(), 2, "{:?}", analysis.diagnostics);
}

#[test]
fn recursion_reaches_a_fixed_point() {
    // def fact(n): return 1 if n < 2 else n * fact(n - 1)
    // r = fact(5)
    let mut program = Program::new();
    let mut m = program.module("main");
    let n1 = m.name("n");
    let two = m.int(2);
    let test = m.compare(CompareOp::Lt, n1, two);
    let one = m.int(1);
    let n2 = m.name("n");
    let one2 = m.int(1);
    let sub = m.binary(BinaryOp::Sub, n2, one2);
    let rec = m.call_name("fact", &[sub]);
    let n3 = m.name("n");
    let mul = m.binary(BinaryOp::Mul, n3, rec);
    let cond = m.cond(test, one, mul);
    let ret = m.ret(Some(cond));
    let def = m.def("fact", &["n"], vec![ret]);
    m.stmt(def);
    let five = m.int(5);
    let call = m.call_name("fact", &[five]);
    let assign = m.assign_name("r", call);
    m.stmt(assign);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    let fact = function(&analysis, "fact");
    assert_eq!(fact.instantiations.len(), 1);
    assert_eq!(fact.instantiations[0].returns, "int");
    assert_eq!(global(&analysis, "main", "r"), "int");
}
