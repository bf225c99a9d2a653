//! Coverage for the wider statement and expression surface: loops,
//! comprehensions, tuples, generators, defaults, exceptions, imports, and
//! built-in methods.

use molt_ast::{BinaryOp, CompKind, CompareOp, Program};
use molt_common::AnalysisOptions;
use molt_infer::{Analysis, analyze};

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
        .unwrap_or_else(|| panic!("no global `{name}` in `{module}`"))
}

#[test]
fn for_over_range_yields_integers() {
    // total = 0
    // for v in range(3): total = total + v
    let mut program = Program::new();
    let mut m = program.module("main");
    let zero = m.int(0);
    let s1 = m.assign_name("total", zero);
    m.stmt(s1);
    let three = m.int(3);
    let rng = m.call_name("range", &[three]);
    let t = m.name("total");
    let v = m.name("v");
    let sum = m.binary(BinaryOp::Add, t, v);
    let body = m.assign_name("total", sum);
    let loop_stmt = m.for_named("v", rng, vec![body]);
    m.stmt(loop_stmt);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "total"), "int");
    assert_eq!(global(&analysis, "main", "v"), "int");
}

#[test]
fn list_comprehension_collects_element_types() {
    // xs = [i * i for i in range(5)]
    let mut program = Program::new();
    let mut m = program.module("main");
    let five = m.int(5);
    let rng = m.call_name("range", &[five]);
    let i1 = m.name("i");
    let i2 = m.name("i");
    let sq = m.binary(BinaryOp::Mul, i1, i2);
    let comp = m.comp(CompKind::List, sq, "i", rng, &[]);
    let s = m.assign_name("xs", comp);
    m.stmt(s);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "xs"), "list[int]");
}

#[test]
fn dict_comprehension_types_keys_and_values() {
    // d = {s: 1 for s in ["a", "b"]}
    let mut program = Program::new();
    let mut m = program.module("main");
    let a = m.str_("a");
    let b = m.str_("b");
    let items = m.list(&[a, b]);
    let key = m.name("s");
    let one = m.int(1);
    let comp = m.dict_comp(key, one, "s", items, &[]);
    let stmt = m.assign_name("d", comp);
    m.stmt(stmt);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "d"), "dict[str, int]");
}

#[test]
fn tuples_project_per_slot() {
    // t = (1, "s"); a = t[0]; b = t[1]
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let s = m.str_("s");
    let t = m.tuple(&[one, s]);
    let s1 = m.assign_name("t", t);
    m.stmt(s1);
    let tn = m.name("t");
    let zero = m.int(0);
    let sub0 = m.subscript(tn, zero);
    let s2 = m.assign_name("a", sub0);
    m.stmt(s2);
    let tn2 = m.name("t");
    let one2 = m.int(1);
    let sub1 = m.subscript(tn2, one2);
    let s3 = m.assign_name("b", sub1);
    m.stmt(s3);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "t"), "tuple[int, str]");
    assert_eq!(global(&analysis, "main", "a"), "int");
    assert_eq!(global(&analysis, "main", "b"), "str");
}

#[test]
fn generators_yield_their_element_type() {
    // def gen(n):
    //     i = 0
    //     while i < n:
    //         yield i
    //         i += 1
    // total = 0
    // for v in gen(3): total += v
    let mut program = Program::new();
    let mut m = program.module("main");
    let zero = m.int(0);
    let init = m.assign_name("i", zero);
    let i1 = m.name("i");
    let n = m.name("n");
    let test = m.compare(CompareOp::Lt, i1, n);
    let i2 = m.name("i");
    let y = m.yield_(Some(i2));
    let ys = m.expr_stmt(y);
    let one = m.int(1);
    let bump = m.aug_assign_name("i", BinaryOp::Add, one);
    let w = m.while_(test, vec![ys, bump]);
    let def = m.def("gen", &["n"], vec![init, w]);
    m.stmt(def);
    let zero2 = m.int(0);
    let s1 = m.assign_name("total", zero2);
    m.stmt(s1);
    let three = m.int(3);
    let call = m.call_name("gen", &[three]);
    let v = m.name("v");
    let body = m.aug_assign_name("total", BinaryOp::Add, v);
    let loop_stmt = m.for_named("v", call, vec![body]);
    m.stmt(loop_stmt);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "total"), "int");
    assert_eq!(global(&analysis, "main", "v"), "int");
}

#[test]
fn default_parameter_values_feed_omitted_arguments() {
    // def greet(name, punct="!"): return name + punct
    // g = greet("hi")
    let mut program = Program::new();
    let mut m = program.module("main");
    let bang = m.str_("!");
    let nref = m.name("name");
    let pref = m.name("punct");
    let cat = m.binary(BinaryOp::Add, nref, pref);
    let ret = m.ret(Some(cat));
    let def = m.def_with_defaults("greet", &[("name", None), ("punct", Some(bang))], vec![ret]);
    m.stmt(def);
    let hi = m.str_("hi");
    let call = m.call_name("greet", &[hi]);
    let s = m.assign_name("g", call);
    m.stmt(s);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "g"), "str");
}

#[test]
fn raised_exceptions_reach_matching_handlers() {
    // def boom(x):
    //     if x > 10: raise ValueError("too big")
    //     return x
    // try: r = boom(5)
    // except ValueError as e: r = 0
    let mut program = Program::new();
    let mut m = program.module("main");
    let x1 = m.name("x");
    let ten = m.int(10);
    let test = m.compare(CompareOp::Gt, x1, ten);
    let msg = m.str_("too big");
    let exc = m.call_name("ValueError", &[msg]);
    let raise = m.raise(Some(exc));
    let branch = m.if_(test, vec![raise], vec![]);
    let x2 = m.name("x");
    let ret = m.ret(Some(x2));
    let def = m.def("boom", &["x"], vec![branch, ret]);
    m.stmt(def);
    let five = m.int(5);
    let call = m.call_name("boom", &[five]);
    let try_assign = m.assign_name("r", call);
    let zero = m.int(0);
    let handler_assign = m.assign_name("r", zero);
    let handler = m.handler(Some("ValueError"), Some("e"), vec![handler_assign]);
    let try_stmt = m.try_(vec![try_assign], vec![handler], vec![], vec![]);
    m.stmt(try_stmt);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "r"), "int");
    assert_eq!(global(&analysis, "main", "e"), "ValueError");
}

#[test]
fn imported_module_functions_are_callable() {
    // util.py: def double(x): return x + x
    // main.py: import util; z = util.double(21)
    let mut program = Program::new();
    let mut util = program.module("util");
    let x1 = util.name("x");
    let x2 = util.name("x");
    let sum = util.binary(BinaryOp::Add, x1, x2);
    let ret = util.ret(Some(sum));
    let def = util.def("double", &["x"], vec![ret]);
    util.stmt(def);
    util.finish();

    let mut main = program.module("main");
    let imp = main.import("util");
    main.stmt(imp);
    let twenty_one = main.int(21);
    let util_name = main.name("util");
    let double = main.attr(util_name, "double");
    let call = main.call(double, &[twenty_one]);
    let s = main.assign_name("z", call);
    main.stmt(s);
    main.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "z"), "int");
    let double = analysis
        .typed
        .functions
        .iter()
        .find(|f| f.name == "double")
        .expect("double is live");
    assert_eq!(double.module, "util");
    assert_eq!(double.instantiations.len(), 1);
}

#[test]
fn string_methods_and_fresh_list_results() {
    // parts = "a,b".split(","); up = parts[0].upper()
    let mut program = Program::new();
    let mut m = program.module("main");
    let lit = m.str_("a,b");
    let sep = m.str_(",");
    let split = m.method(lit, "split", &[sep]);
    let s1 = m.assign_name("parts", split);
    m.stmt(s1);
    let parts = m.name("parts");
    let zero = m.int(0);
    let first = m.subscript(parts, zero);
    let upper = m.method(first, "upper", &[]);
    let s2 = m.assign_name("up", upper);
    m.stmt(s2);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "parts"), "list[str]");
    assert_eq!(global(&analysis, "main", "up"), "str");
}

#[test]
fn augmented_assignment_falls_back_through_inplace_methods() {
    // c = 0; c += 5
    // xs = [1]; xs += [2]
    let mut program = Program::new();
    let mut m = program.module("main");
    let zero = m.int(0);
    let s1 = m.assign_name("c", zero);
    m.stmt(s1);
    let five = m.int(5);
    let s2 = m.aug_assign_name("c", BinaryOp::Add, five);
    m.stmt(s2);
    let one = m.int(1);
    let xs = m.list(&[one]);
    let s3 = m.assign_name("xs", xs);
    m.stmt(s3);
    let two = m.int(2);
    let other = m.list(&[two]);
    let s4 = m.aug_assign_name("xs", BinaryOp::Add, other);
    m.stmt(s4);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "c"), "int");
    assert_eq!(global(&analysis, "main", "xs"), "list[int]");
}

#[test]
fn numeric_widening_promotes_to_float() {
    // h = 1 + 2.5
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let half = m.float(2.5);
    let sum = m.binary(BinaryOp::Add, one, half);
    let s = m.assign_name("h", sum);
    m.stmt(s);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(global(&analysis, "main", "h"), "float");
}
