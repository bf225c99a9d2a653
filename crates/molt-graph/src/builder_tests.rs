use crate::context::Context;
use crate::builder::GraphBuilder;
use crate::program::Binding;
use molt_ast::Program;
use molt_common::AnalysisOptions;

fn context_for(program: Program) -> Context {
    let mut ctx = Context::new(program, AnalysisOptions::default());
    GraphBuilder::new(&mut ctx).build_top_levels();
    ctx
}

#[test]
fn declaration_registers_functions_classes_and_methods() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let pass1 = m.pass();
    let f = m.def("f", &["x"], vec![pass1]);
    m.stmt(f);
    let pass2 = m.pass();
    let meth = m.def("m", &["self"], vec![pass2]);
    let class = m.class("C", &[], vec![meth]);
    m.stmt(class);
    m.finish();

    let ctx = context_for(program);
    let module = &ctx.program.modules[0];
    let f_atom = ctx.interner.get("f").unwrap();
    let c_atom = ctx.interner.get("C").unwrap();
    let m_atom = ctx.interner.get("m").unwrap();
    assert!(matches!(module.bindings.get(&f_atom), Some(Binding::Func(_))));
    let class = match module.bindings.get(&c_atom) {
        Some(Binding::Class(c)) => *c,
        other => panic!("expected class binding, got {other:?}"),
    };
    assert!(ctx.program.methods.contains_key(&(class, m_atom)));
    // The uncalled function has no instantiations yet; only the module's
    // top level is built eagerly.
    let f_id = match module.bindings.get(&f_atom) {
        Some(Binding::Func(id)) => *id,
        _ => unreachable!(),
    };
    assert!(ctx.program.func(f_id).insts.is_empty());
    assert_eq!(ctx.program.func(module.top_func).insts.len(), 1);
}

#[test]
fn container_literals_allocate_sites_with_seeded_creators() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let lst = m.list(&[one]);
    let s = m.assign_name("xs", lst);
    m.stmt(s);
    m.finish();

    let ctx = context_for(program);
    assert_eq!(ctx.graph.site_count(), 1);
    let site = ctx.graph.site_ids().next().unwrap();
    let creator = ctx.graph.site(site).creator;
    assert!(!ctx.graph.node(creator).seed.is_empty());
    // One element slot, fed by the literal element.
    assert_eq!(ctx.graph.site(site).elems.len(), 1);
}

#[test]
fn self_attribute_stores_declare_attributes() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let self_ref = m.name("self");
    let attr = m.attr(self_ref, "count");
    let zero = m.int(0);
    let assign = m.assign(attr, zero);
    let init = m.def("__init__", &["self"], vec![assign]);
    let class = m.class("Counter", &[], vec![init]);
    m.stmt(class);
    m.finish();

    let ctx = context_for(program);
    let c_atom = ctx.interner.get("Counter").unwrap();
    let count_atom = ctx.interner.get("count").unwrap();
    let class = match ctx.program.modules[0].bindings.get(&c_atom) {
        Some(Binding::Class(c)) => *c,
        other => panic!("expected class binding, got {other:?}"),
    };
    assert!(
        ctx.program
            .declared_attrs
            .get(&class)
            .is_some_and(|attrs| attrs.contains(&count_atom))
    );
}

#[test]
fn every_expression_gets_a_constraint_node() {
    let mut program = Program::new();
    let mut m = program.module("main");
    let one = m.int(1);
    let two = m.int(2);
    let sum = m.binary(molt_ast::BinaryOp::Add, one, two);
    let s = m.assign_name("x", sum);
    m.stmt(s);
    m.finish();

    let ctx = context_for(program);
    let top = ctx.program.modules[0].top_func;
    let inst = ctx.program.func(top).inst(crate::program::InstId(0));
    for node in [one, two, sum] {
        assert!(inst.exprs.contains_key(&node), "missing node for {node:?}");
    }
}
