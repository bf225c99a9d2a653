//! Iterative flow analysis: allocation-site splitting scenarios.

use molt_ast::Program;
use molt_common::AnalysisOptions;
use molt_infer::{Analysis, analyze};

fn run(program: Program) -> Analysis {
    analyze(program, AnalysisOptions::default())
}

fn global<'a>(analysis: &'a Analysis, name: &'a str) -> &'a str {
    analysis.typed.modules[0]
        .globals
        .get(name)
        .map(String::as_str)
        .unwrap_or_else(|| panic!("no global `{name}`"))
}

/// A fresh-container factory shared by two call sites: one allocation site
/// serves both callers until the split restores per-caller precision.
fn factory_program() -> Program {
    // def make(): return []
    // a = make(); b = make()
    // a.append(1); b.append("s")
    let mut program = Program::new();
    let mut m = program.module("main");
    let lit = m.list(&[]);
    let ret = m.ret(Some(lit));
    let def = m.def("make", &[], vec![ret]);
    m.stmt(def);
    let c1 = m.call_name("make", &[]);
    let s1 = m.assign_name("a", c1);
    m.stmt(s1);
    let c2 = m.call_name("make", &[]);
    let s2 = m.assign_name("b", c2);
    m.stmt(s2);
    let a = m.name("a");
    let one = m.int(1);
    let ap = m.method(a, "append", &[one]);
    let s3 = m.expr_stmt(ap);
    m.stmt(s3);
    let b = m.name("b");
    let s = m.str_("s");
    let bp = m.method(b, "append", &[s]);
    let s4 = m.expr_stmt(bp);
    m.stmt(s4);
    m.finish();
    program
}

#[test]
fn shared_factory_site_is_split_per_caller() {
    let analysis = run(factory_program());
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert_eq!(analysis.stats.splits, 1);
    assert_eq!(global(&analysis, "a"), "list[int]");
    assert_eq!(global(&analysis, "b"), "list[str]");
}

#[test]
fn factory_keeps_one_instantiation_after_split() {
    let analysis = run(factory_program());
    let make = analysis
        .typed
        .functions
        .iter()
        .find(|f| f.name == "make")
        .expect("make is live");
    // Splitting refines the allocation site, not the call signature.
    assert_eq!(make.instantiations.len(), 1);
    assert_eq!(make.instantiations[0].returns, "list[int] | list[str]");
}

#[test]
fn per_instance_attribute_containers_are_split() {
    // class Box:
    //     def __init__(self): self.items = []
    //     def add(self, v): self.items.append(v)
    // x = Box(); y = Box()
    // x.add(1); y.add("s")
    let mut program = Program::new();
    let mut m = program.module("main");
    let self1 = m.name("self");
    let items_attr = m.attr(self1, "items");
    let lit = m.list(&[]);
    let init_assign = m.assign(items_attr, lit);
    let init = m.def("__init__", &["self"], vec![init_assign]);
    let self2 = m.name("self");
    let items_read = m.attr(self2, "items");
    let v = m.name("v");
    let append = m.method(items_read, "append", &[v]);
    let append_stmt = m.expr_stmt(append);
    let add = m.def("add", &["self", "v"], vec![append_stmt]);
    let class_box = m.class("Box", &[], vec![init, add]);
    m.stmt(class_box);
    let cx = m.call_name("Box", &[]);
    let sx = m.assign_name("x", cx);
    m.stmt(sx);
    let cy = m.call_name("Box", &[]);
    let sy = m.assign_name("y", cy);
    m.stmt(sy);
    let x = m.name("x");
    let one = m.int(1);
    let call_x = m.method(x, "add", &[one]);
    let s1 = m.expr_stmt(call_x);
    m.stmt(s1);
    let y = m.name("y");
    let s = m.str_("s");
    let call_y = m.method(y, "add", &[s]);
    let s2 = m.expr_stmt(call_y);
    m.stmt(s2);
    m.finish();

    let analysis = run(program);
    assert!(analysis.diagnostics.is_empty(), "{:?}", analysis.diagnostics);
    assert!(analysis.stats.splits >= 1);
    let class = analysis
        .typed
        .classes
        .iter()
        .find(|c| c.name == "Box")
        .expect("Box is emitted");
    assert_eq!(
        class.attributes.get("items").map(String::as_str),
        Some("list[int] | list[str]")
    );
}

#[test]
fn analysis_is_confluent_and_idempotent() {
    let first = run(factory_program());
    let second = run(factory_program());
    assert_eq!(first.typed, second.typed);
    assert_eq!(first.stats, second.stats);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn one_instantiation_per_observed_signature() {
    // def ident(x): return x
    // r1 = ident(1); r2 = ident(2)
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
    let two = m.int(2);
    let c2 = m.call_name("ident", &[two]);
    let s2 = m.assign_name("r2", c2);
    m.stmt(s2);
    m.finish();

    let analysis = run(program);
    let ident = analysis
        .typed
        .functions
        .iter()
        .find(|f| f.name == "ident")
        .expect("ident is live");
    assert_eq!(ident.instantiations.len(), 1);
    assert_eq!(global(&analysis, "r1"), "int");
    assert_eq!(global(&analysis, "r2"), "int");
}
