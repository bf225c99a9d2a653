//! The constraint graph builder.
//!
//! Two passes over each module:
//!
//! 1. **Declaration** (`declare_modules`): registers classes, functions,
//!    methods, declared attributes, and import bindings, so names resolve
//!    across modules before any body is walked.
//! 2. **Body construction** (`build_top_levels` / `instantiate`): walks
//!    statements and expressions, creating one constraint node per
//!    expression per instantiation, data-flow edges for the structure that
//!    is static, and [`DynConstraint`]s for everything that depends on type
//!    sets (calls, attribute access, iteration, operators).
//!
//! Module top levels are the bodies of synthetic zero-argument functions
//! with exactly one instantiation each. Function bodies proper are only
//! built when the specializer observes a call signature.

use crate::constraints::{ConstraintKind, DynConstraint, ExcTargets};
use crate::context::Context;
use crate::graph::{CnId, CnOrigin, Edge, Transform};
use crate::program::{
    Binding, FuncData, FuncId, InstId, Instantiation, ModuleData, ModuleId, Signature,
};
use crate::scan;
use molt_ast::{BinaryOp, CompKind, ModuleAst, NodeId, NodeKind, Param};
use molt_common::{Atom, DiagnosticKind, Span};
use molt_types::{ClassId, FreeFunc, Ty, free_func};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Per-body walk state.
struct BodyCtx {
    module: ModuleId,
    ast: Arc<ModuleAst>,
    func: FuncId,
    inst: InstId,
    top_level: bool,
    /// Enclosing `try` frames, innermost last; each entry is the handler's
    /// class filter and binding node.
    handlers: Vec<SmallVec<[(Option<ClassId>, CnId); 2]>>,
    /// Comprehension iteration variables, innermost last.
    comp_scopes: Vec<(Atom, CnId)>,
}

/// What a name load resolves to.
enum Resolved {
    Node(CnId),
    Func(FuncId),
    Class(ClassId),
    Module(ModuleId),
    Missing,
}

pub struct GraphBuilder<'a> {
    pub ctx: &'a mut Context,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(ctx: &'a mut Context) -> Self {
        GraphBuilder { ctx }
    }

    // =========================================================================
    // Declaration pass
    // =========================================================================

    pub fn declare_modules(&mut self, modules: Vec<molt_ast::ModuleAst>) {
        for ast in modules {
            let module = ModuleId(self.ctx.program.modules.len() as u32);
            let top_func = FuncId(self.ctx.program.funcs.len() as u32);
            self.ctx.program.funcs.push(FuncData {
                name: ast.name,
                module,
                owner: None,
                params: Vec::new(),
                default_nodes: Vec::new(),
                body: ast.body.clone(),
                span: Span::dummy(),
                is_generator: false,
                is_top_level: true,
                insts: Vec::new(),
                inst_by_sig: FxHashMap::default(),
            });
            self.ctx.program.modules.push(ModuleData {
                name: ast.name,
                ast: Arc::new(ast),
                bindings: FxHashMap::default(),
                top_func,
            });
        }
        for module in self.ctx.program.module_ids().collect::<Vec<_>>() {
            self.declare_module(module);
        }
    }

    fn declare_module(&mut self, module: ModuleId) {
        let ast = self.ctx.program.module(module).ast.clone();
        for &stmt in &ast.body {
            let span = ast.arena.span(stmt);
            match ast.arena.kind(stmt).clone() {
                NodeKind::FunctionDef { name, params, body } => {
                    let func = self.declare_function(module, &ast, name, params, body, span, None);
                    self.ctx.program.modules[module.index()]
                        .bindings
                        .insert(name, Binding::Func(func));
                }
                NodeKind::ClassDef { name, bases, body } => {
                    self.declare_class(module, &ast, name, &bases, &body, span);
                }
                NodeKind::Import { module: target } => {
                    let resolved = self
                        .ctx
                        .program
                        .modules
                        .iter()
                        .position(|m| m.name == target)
                        .map(|i| ModuleId(i as u32));
                    match resolved {
                        Some(mid) => {
                            self.ctx.program.modules[module.index()]
                                .bindings
                                .insert(target, Binding::Module(mid));
                        }
                        None => {
                            let name = self.ctx.interner.resolve(target).to_string();
                            self.ctx.error(
                                DiagnosticKind::UnsupportedConstruct,
                                module,
                                span,
                                format!("module `{name}` is not part of the compilation"),
                            );
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_class(
        &mut self,
        module: ModuleId,
        ast: &Arc<ModuleAst>,
        name: Atom,
        bases: &[Atom],
        body: &[NodeId],
        span: Span,
    ) {
        let mut base_ids: Vec<ClassId> = Vec::with_capacity(bases.len());
        for &base in bases {
            let resolved = match self.ctx.program.modules[module.index()].bindings.get(&base) {
                Some(Binding::Class(c)) => Some(*c),
                _ => self.ctx.registry.lookup(base),
            };
            match resolved {
                Some(c) => base_ids.push(c),
                None => {
                    let base_name = self.ctx.interner.resolve(base).to_string();
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        module,
                        span,
                        format!("unknown base class `{base_name}`"),
                    );
                }
            }
        }
        let class = self.ctx.registry.register(name, &base_ids);
        self.ctx.program.modules[module.index()]
            .bindings
            .insert(name, Binding::Class(class));
        self.ctx.program.declared_attrs.entry(class).or_default();

        let mut methods: Vec<FuncId> = Vec::new();
        for &stmt in body {
            let stmt_span = ast.arena.span(stmt);
            match ast.arena.kind(stmt).clone() {
                NodeKind::FunctionDef {
                    name: method_name,
                    params,
                    body: method_body,
                } => {
                    let func = self.declare_function(
                        module,
                        ast,
                        method_name,
                        params,
                        method_body,
                        stmt_span,
                        Some(class),
                    );
                    self.ctx.program.methods.insert((class, method_name), func);
                    methods.push(func);
                }
                NodeKind::Assign { target, .. } => {
                    if let NodeKind::Name(attr) = ast.arena.kind(target) {
                        self.ctx
                            .program
                            .declared_attrs
                            .entry(class)
                            .or_default()
                            .insert(*attr);
                    }
                }
                NodeKind::ExprStmt(_) | NodeKind::Pass => {}
                _ => {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        module,
                        stmt_span,
                        "only methods and attribute assignments are supported in class bodies",
                    );
                }
            }
        }

        // `self.x = ...` in any of the class's own methods declares `x`.
        for func in methods {
            let (body, self_name) = {
                let f = self.ctx.program.func(func);
                (f.body.clone(), f.params.first().map(|p| p.name))
            };
            if let Some(self_name) = self_name {
                let mut stores = FxHashSet::default();
                scan::self_attr_stores(ast, &body, self_name, &mut stores);
                self.ctx
                    .program
                    .declared_attrs
                    .entry(class)
                    .or_default()
                    .extend(stores);
            }
        }
    }

    fn declare_function(
        &mut self,
        module: ModuleId,
        ast: &Arc<ModuleAst>,
        name: Atom,
        params: Vec<Param>,
        body: Vec<NodeId>,
        span: Span,
        owner: Option<ClassId>,
    ) -> FuncId {
        let is_generator = scan::contains_yield(ast, &body);
        let func = FuncId(self.ctx.program.funcs.len() as u32);
        let default_count = params.len();
        self.ctx.program.funcs.push(FuncData {
            name,
            module,
            owner,
            params,
            default_nodes: vec![None; default_count],
            body,
            span,
            is_generator,
            is_top_level: false,
            insts: Vec::new(),
            inst_by_sig: FxHashMap::default(),
        });
        func
    }

    // =========================================================================
    // Body construction
    // =========================================================================

    /// Build the single instantiation of every module's top-level body.
    pub fn build_top_levels(&mut self) {
        for module in self.ctx.program.module_ids().collect::<Vec<_>>() {
            let top = self.ctx.program.module(module).top_func;
            self.instantiate(top, Signature::new());
        }
    }

    /// Create a fresh instantiation of `func` for `sig` and walk its body.
    pub fn instantiate(&mut self, func: FuncId, sig: Signature) -> InstId {
        let (module, params, body, span, is_generator, top_level) = {
            let f = self.ctx.program.func(func);
            (
                f.module,
                f.params.clone(),
                f.body.clone(),
                f.span,
                f.is_generator,
                f.is_top_level,
            )
        };
        let ast = self.ctx.program.module(module).ast.clone();
        let inst = InstId(self.ctx.program.func(func).insts.len() as u32);
        debug!(func = func.0, inst = inst.0, "instantiate");

        let formals: Vec<CnId> = params
            .iter()
            .enumerate()
            .map(|(index, p)| {
                self.ctx.graph.add_node(
                    CnOrigin::Formal {
                        func,
                        inst,
                        index: index as u32,
                    },
                    module,
                    p.span,
                )
            })
            .collect();
        let ret = self
            .ctx
            .graph
            .add_node(CnOrigin::Return { func, inst }, module, span);
        let exc_out = self
            .ctx
            .graph
            .add_node(CnOrigin::ExcOut { func, inst }, module, span);

        let mut locals: FxHashMap<Atom, CnId> = FxHashMap::default();
        if !top_level {
            for (i, p) in params.iter().enumerate() {
                locals.insert(p.name, formals[i]);
            }
            let mut assigned = FxHashSet::default();
            scan::assigned_names(&ast, &body, &mut assigned);
            for name in assigned {
                locals.entry(name).or_insert_with(|| {
                    self.ctx.graph.add_node(
                        CnOrigin::Local { func, inst, name },
                        module,
                        Span::dummy(),
                    )
                });
            }
        }

        let (gen_site, gen_object) = if is_generator {
            let object = self
                .ctx
                .graph
                .add_node(CnOrigin::GenObject { func, inst }, module, span);
            let class = self.ctx.registry.builtins.generator;
            let site = self.ctx.graph.add_site(class, 1, module, span, object);
            self.ctx.graph.seed(object, Ty::at(class, site));
            self.ctx.graph.add_edge(object, Edge::copy(ret));
            (Some(site), Some(object))
        } else {
            (None, None)
        };

        self.ctx.program.func_mut(func).insts.push(Instantiation {
            sig: sig.clone(),
            formals,
            ret,
            exc_out,
            locals,
            exprs: FxHashMap::default(),
            gen_site,
            gen_object,
        });
        self.ctx
            .program
            .func_mut(func)
            .inst_by_sig
            .insert(sig, inst);

        let mut b = BodyCtx {
            module,
            ast: ast.clone(),
            func,
            inst,
            top_level,
            handlers: Vec::new(),
            comp_scopes: Vec::new(),
        };
        for &stmt in &body {
            self.stmt(&mut b, stmt);
        }

        // A function that never returns a value yields None to its callers.
        if !is_generator && !top_level && !scan::has_value_return(&ast, &body) {
            let none = self.ctx.registry.builtins.none;
            self.ctx.graph.seed(ret, Ty::scalar(none));
        }
        inst
    }

    // ---- statements ----

    fn stmt(&mut self, b: &mut BodyCtx, node: NodeId) {
        let span = b.ast.arena.span(node);
        match b.ast.arena.kind(node).clone() {
            NodeKind::ExprStmt(e) => {
                self.expr(b, e);
            }
            NodeKind::Assign { target, value } => {
                let v = self.expr(b, value);
                self.assign_to(b, target, v, span);
            }
            NodeKind::AugAssign { target, op, value } => {
                self.aug_assign(b, target, op, value, span);
            }
            NodeKind::If { test, body, orelse } | NodeKind::While { test, body, orelse } => {
                self.expr(b, test);
                for &s in &body {
                    self.stmt(b, s);
                }
                for &s in &orelse {
                    self.stmt(b, s);
                }
            }
            NodeKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iter_cn = self.expr(b, iter);
                match b.ast.arena.kind(target).clone() {
                    NodeKind::Name(name) => {
                        let t = self.resolve_store(b, name, span);
                        self.push_constraint(
                            b,
                            span,
                            ConstraintKind::Iterate {
                                iter: iter_cn,
                                target: t,
                                seen: FxHashSet::default(),
                                links: FxHashSet::default(),
                            },
                        );
                    }
                    NodeKind::TupleLit(items) => {
                        let elem = self.synth_node(b, span);
                        self.push_constraint(
                            b,
                            span,
                            ConstraintKind::Iterate {
                                iter: iter_cn,
                                target: elem,
                                seen: FxHashSet::default(),
                                links: FxHashSet::default(),
                            },
                        );
                        self.unpack_into(b, elem, &items, span);
                    }
                    _ => {
                        self.ctx.error(
                            DiagnosticKind::UnsupportedConstruct,
                            b.module,
                            span,
                            "unsupported loop target",
                        );
                    }
                }
                for &s in &body {
                    self.stmt(b, s);
                }
                for &s in &orelse {
                    self.stmt(b, s);
                }
            }
            NodeKind::Return(value) => {
                if b.top_level {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "return outside of a function",
                    );
                    return;
                }
                let inst = self.inst(b);
                let (ret, is_gen) = (inst.ret, inst.gen_site.is_some());
                match value {
                    Some(v) => {
                        let cn = self.expr(b, v);
                        // Generators deliver values through yield; a valued
                        // return only stops the iteration.
                        if !is_gen {
                            self.ctx.graph.add_edge(cn, Edge::copy(ret));
                        }
                    }
                    None => {
                        if !is_gen {
                            let none = self.ctx.registry.builtins.none;
                            self.ctx.graph.seed(ret, Ty::scalar(none));
                        }
                    }
                }
            }
            NodeKind::FunctionDef { name, params, .. } => {
                if b.top_level {
                    // Declared already; build the default-value expressions
                    // in the defining scope.
                    if let Some(Binding::Func(func)) = self.lookup_binding(b.module, name) {
                        self.build_defaults(b, func, &params);
                    }
                } else {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "nested function definitions are not supported",
                    );
                }
            }
            NodeKind::ClassDef { name, body, .. } => {
                if b.top_level {
                    if let Some(Binding::Class(class)) = self.lookup_binding(b.module, name) {
                        self.class_body(b, class, &body);
                    }
                } else {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "class definitions inside functions are not supported",
                    );
                }
            }
            NodeKind::Import { .. } => {
                if !b.top_level {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "imports inside functions are not supported",
                    );
                }
            }
            NodeKind::Assert { test, msg } => {
                if self.ctx.options.assertions_enabled {
                    self.expr(b, test);
                    if let Some(m) = msg {
                        self.expr(b, m);
                    }
                }
            }
            NodeKind::Raise { exc } => {
                if let Some(e) = exc {
                    let cn = self.expr(b, e);
                    self.wire_exception(b, cn);
                }
            }
            NodeKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                let mut frame: SmallVec<[(Option<ClassId>, CnId); 2]> = SmallVec::new();
                let mut handler_bodies: Vec<Vec<NodeId>> = Vec::new();
                for h in &handlers {
                    let class = match h.class {
                        Some(atom) => {
                            let resolved = match self.lookup_binding(b.module, atom) {
                                Some(Binding::Class(c)) => Some(c),
                                _ => self.ctx.registry.lookup(atom),
                            };
                            if resolved.is_none() {
                                let name = self.ctx.interner.resolve(atom).to_string();
                                self.ctx.error(
                                    DiagnosticKind::UnsupportedConstruct,
                                    b.module,
                                    h.span,
                                    format!("unknown exception class `{name}`"),
                                );
                            }
                            resolved
                        }
                        None => None,
                    };
                    let binding = match h.name {
                        Some(name) => self.resolve_store(b, name, h.span),
                        None => self.synth_node(b, h.span),
                    };
                    frame.push((class, binding));
                    handler_bodies.push(h.body.clone());
                }
                b.handlers.push(frame);
                for &s in &body {
                    self.stmt(b, s);
                }
                b.handlers.pop();
                for body in handler_bodies {
                    for &s in &body {
                        self.stmt(b, s);
                    }
                }
                for &s in &orelse {
                    self.stmt(b, s);
                }
                for &s in &finalbody {
                    self.stmt(b, s);
                }
            }
            NodeKind::Pass | NodeKind::Break | NodeKind::Continue => {}
            _ => {
                // An expression in statement position.
                self.expr(b, node);
            }
        }
    }

    fn build_defaults(&mut self, b: &mut BodyCtx, func: FuncId, params: &[Param]) {
        for (i, p) in params.iter().enumerate() {
            if let Some(default) = p.default {
                let cn = self.expr(b, default);
                self.ctx.program.func_mut(func).default_nodes[i] = Some(cn);
            }
        }
    }

    fn class_body(&mut self, b: &mut BodyCtx, class: ClassId, body: &[NodeId]) {
        for &stmt in body {
            match b.ast.arena.kind(stmt).clone() {
                NodeKind::Assign { target, value } => {
                    let attr = match b.ast.arena.kind(target) {
                        NodeKind::Name(attr) => Some(*attr),
                        _ => None,
                    };
                    if let Some(attr) = attr {
                        let v = self.expr(b, value);
                        let slot = self.attr_node(b.module, class, attr);
                        self.ctx.graph.add_edge(v, Edge::copy(slot));
                    }
                }
                NodeKind::FunctionDef { name, params, .. } => {
                    if let Some(&func) = self.ctx.program.methods.get(&(class, name)) {
                        self.build_defaults(b, func, &params);
                    }
                }
                NodeKind::ExprStmt(e) => {
                    self.expr(b, e);
                }
                _ => {}
            }
        }
    }

    fn assign_to(&mut self, b: &mut BodyCtx, target: NodeId, value: CnId, span: Span) {
        match b.ast.arena.kind(target).clone() {
            NodeKind::Name(name) => {
                let t = self.resolve_store(b, name, span);
                self.ctx.graph.add_edge(value, Edge::copy(t));
            }
            NodeKind::Attribute { value: obj, attr } => {
                let recv = self.expr(b, obj);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::AttrWrite {
                        recv,
                        attr,
                        value,
                        seen: FxHashSet::default(),
                    },
                );
            }
            NodeKind::Subscript { value: obj, index } => {
                let recv = self.expr(b, obj);
                let idx = self.expr(b, index);
                let sink = self.synth_node(b, span);
                let const_index = self.const_index(b, index);
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv,
                        name: self.ctx.atoms.setitem,
                        inplace: None,
                        args: vec![idx, value],
                        result: sink,
                        exc,
                        const_index,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
            }
            NodeKind::TupleLit(items) => {
                self.unpack_into(b, value, &items, span);
            }
            _ => {
                self.ctx.error(
                    DiagnosticKind::UnsupportedConstruct,
                    b.module,
                    span,
                    "unsupported assignment target",
                );
            }
        }
    }

    fn aug_assign(&mut self, b: &mut BodyCtx, target: NodeId, op: BinaryOp, value: NodeId, span: Span) {
        let v = self.expr(b, value);
        let name = self.ctx.atom(op.dunder());
        let inplace = Some(self.ctx.atom(op.inplace_dunder()));
        match b.ast.arena.kind(target).clone() {
            NodeKind::Name(n) => {
                let t = self.resolve_store(b, n, span);
                let result = self.synth_node(b, span);
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv: t,
                        name,
                        inplace,
                        args: vec![v],
                        result,
                        exc,
                        const_index: None,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                self.ctx.graph.add_edge(result, Edge::copy(t));
            }
            NodeKind::Attribute { value: obj, attr } => {
                let recv = self.expr(b, obj);
                let current = self.synth_node(b, span);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::AttrRead {
                        recv,
                        attr,
                        result: current,
                        seen: FxHashSet::default(),
                    },
                );
                let result = self.synth_node(b, span);
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv: current,
                        name,
                        inplace,
                        args: vec![v],
                        result,
                        exc,
                        const_index: None,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::AttrWrite {
                        recv,
                        attr,
                        value: result,
                        seen: FxHashSet::default(),
                    },
                );
            }
            NodeKind::Subscript { value: obj, index } => {
                let recv = self.expr(b, obj);
                let idx = self.expr(b, index);
                let const_index = self.const_index(b, index);
                let current = self.synth_node(b, span);
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv,
                        name: self.ctx.atoms.getitem,
                        inplace: None,
                        args: vec![idx],
                        result: current,
                        exc: exc.clone(),
                        const_index,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                let result = self.synth_node(b, span);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv: current,
                        name,
                        inplace,
                        args: vec![v],
                        result,
                        exc: exc.clone(),
                        const_index: None,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                let sink = self.synth_node(b, span);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv,
                        name: self.ctx.atoms.setitem,
                        inplace: None,
                        args: vec![idx, result],
                        result: sink,
                        exc,
                        const_index,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
            }
            _ => {
                self.ctx.error(
                    DiagnosticKind::UnsupportedConstruct,
                    b.module,
                    span,
                    "unsupported augmented-assignment target",
                );
            }
        }
    }

    /// `a, b, ... = value`: each target receives a constant-index subscript
    /// projection of the value.
    fn unpack_into(&mut self, b: &mut BodyCtx, value: CnId, targets: &[NodeId], span: Span) {
        for (i, &target) in targets.iter().enumerate() {
            match b.ast.arena.kind(target).clone() {
                NodeKind::Name(name) => {
                    let t = self.resolve_store(b, name, span);
                    let idx = self.synth_node(b, span);
                    let int = self.ctx.registry.builtins.int_;
                    self.ctx.graph.seed(idx, Ty::scalar(int));
                    let exc = self.exc_targets(b);
                    self.push_constraint(
                        b,
                        span,
                        ConstraintKind::CallMethod {
                            recv: value,
                            name: self.ctx.atoms.getitem,
                            inplace: None,
                            args: vec![idx],
                            result: t,
                            exc,
                            const_index: Some(i as i64),
                            seen: FxHashSet::default(),
                            linked: FxHashSet::default(),
                            current: FxHashSet::default(),
                            list_site: None,
                        },
                    );
                }
                _ => {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "unsupported unpacking target",
                    );
                }
            }
        }
    }

    // ---- expressions ----

    fn expr(&mut self, b: &mut BodyCtx, node: NodeId) -> CnId {
        let span = b.ast.arena.span(node);
        let bt = self.ctx.registry.builtins;
        match b.ast.arena.kind(node).clone() {
            NodeKind::Int(v) => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.int_));
                let width = self.ctx.options.integer_width;
                if !self.ctx.options.assume_bounds_checked
                    && (v > width.max_literal() || v < width.min_literal())
                {
                    self.ctx.error(
                        DiagnosticKind::TypeConflict,
                        b.module,
                        span,
                        format!("integer literal {v} does not fit the target integer width"),
                    );
                }
                cn
            }
            NodeKind::Float(_) => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.float_));
                cn
            }
            NodeKind::Bool(_) => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.bool_));
                cn
            }
            NodeKind::Str(_) => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.str_));
                cn
            }
            NodeKind::Bytes(_) => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.bytes_));
                cn
            }
            NodeKind::NoneLit => {
                let cn = self.new_expr_node(b, node);
                self.ctx.graph.seed(cn, Ty::scalar(bt.none));
                cn
            }
            NodeKind::Name(name) => match self.resolve_load(b, name) {
                Resolved::Node(cn) => {
                    self.register_expr(b, node, cn);
                    cn
                }
                Resolved::Func(_) | Resolved::Class(_) | Resolved::Module(_) => {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "functions, classes, and modules are not first-class values",
                    );
                    self.new_expr_node(b, node)
                }
                Resolved::Missing => {
                    let text = self.ctx.interner.resolve(name).to_string();
                    self.ctx.error(
                        DiagnosticKind::InferenceFailure,
                        b.module,
                        span,
                        format!("undefined name `{text}`"),
                    );
                    self.new_expr_node(b, node)
                }
            },
            NodeKind::Attribute { value, attr } => {
                let base_name = match b.ast.arena.kind(value) {
                    NodeKind::Name(m) => Some(*m),
                    _ => None,
                };
                if let Some(m) = base_name {
                    if let Resolved::Module(mid) = self.resolve_load(b, m) {
                        return self.module_attr(b, node, mid, attr, span);
                    }
                }
                let recv = self.expr(b, value);
                let result = self.new_expr_node(b, node);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::AttrRead {
                        recv,
                        attr,
                        result,
                        seen: FxHashSet::default(),
                    },
                );
                result
            }
            NodeKind::Subscript { value, index } => {
                let recv = self.expr(b, value);
                let idx = self.expr(b, index);
                let result = self.new_expr_node(b, node);
                let const_index = self.const_index(b, index);
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv,
                        name: self.ctx.atoms.getitem,
                        inplace: None,
                        args: vec![idx],
                        result,
                        exc,
                        const_index,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                result
            }
            NodeKind::Call { func, args } => self.call_expr(b, node, func, &args, span),
            NodeKind::Unary { op, operand } => {
                let operand_cn = self.expr(b, operand);
                let result = self.new_expr_node(b, node);
                match op.dunder() {
                    Some(dunder) => {
                        let name = self.ctx.atom(dunder);
                        let exc = self.exc_targets(b);
                        self.push_constraint(
                            b,
                            span,
                            ConstraintKind::CallMethod {
                                recv: operand_cn,
                                name,
                                inplace: None,
                                args: Vec::new(),
                                result,
                                exc,
                                const_index: None,
                                seen: FxHashSet::default(),
                                linked: FxHashSet::default(),
                                current: FxHashSet::default(),
                                list_site: None,
                            },
                        );
                    }
                    None => {
                        self.ctx.graph.seed(result, Ty::scalar(bt.bool_));
                    }
                }
                result
            }
            NodeKind::Binary { op, left, right } => {
                let l = self.expr(b, left);
                let r = self.expr(b, right);
                let result = self.new_expr_node(b, node);
                let name = self.ctx.atom(op.dunder());
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv: l,
                        name,
                        inplace: None,
                        args: vec![r],
                        result,
                        exc,
                        const_index: None,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
                result
            }
            NodeKind::BoolOp { values, .. } => {
                let result = self.new_expr_node(b, node);
                for &v in &values {
                    let cn = self.expr(b, v);
                    self.ctx.graph.add_edge(cn, Edge::copy(result));
                }
                result
            }
            NodeKind::Compare { left, right, .. } => {
                self.expr(b, left);
                self.expr(b, right);
                let result = self.new_expr_node(b, node);
                self.ctx.graph.seed(result, Ty::scalar(bt.bool_));
                result
            }
            NodeKind::Conditional { test, then, orelse } => {
                self.expr(b, test);
                let t = self.expr(b, then);
                let e = self.expr(b, orelse);
                let result = self.new_expr_node(b, node);
                self.ctx.graph.add_edge(t, Edge::copy(result));
                self.ctx.graph.add_edge(e, Edge::copy(result));
                result
            }
            NodeKind::ListLit(items) => self.container_literal(b, node, bt.list, &items, span),
            NodeKind::SetLit(items) => self.container_literal(b, node, bt.set, &items, span),
            NodeKind::TupleLit(items) => {
                let result = self.new_expr_node(b, node);
                let site = self
                    .ctx
                    .graph
                    .add_site(bt.tuple, items.len(), b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(bt.tuple, site));
                for (slot, &item) in items.iter().enumerate() {
                    let cn = self.expr(b, item);
                    let elem = self.ctx.graph.site(site).elems[slot];
                    self.ctx
                        .graph
                        .add_edge(cn, Edge::with_provenance(elem, Transform::Copy, result));
                }
                result
            }
            NodeKind::DictLit { keys, values } => {
                let result = self.new_expr_node(b, node);
                let site = self.ctx.graph.add_site(bt.dict, 2, b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(bt.dict, site));
                for (&k, &v) in keys.iter().zip(values.iter()) {
                    let kc = self.expr(b, k);
                    let vc = self.expr(b, v);
                    let key_slot = self.ctx.graph.site(site).elems[0];
                    let value_slot = self.ctx.graph.site(site).elems[1];
                    self.ctx
                        .graph
                        .add_edge(kc, Edge::with_provenance(key_slot, Transform::Copy, result));
                    self.ctx
                        .graph
                        .add_edge(vc, Edge::with_provenance(value_slot, Transform::Copy, result));
                }
                result
            }
            NodeKind::Comp {
                kind,
                elem,
                target,
                iter,
                conds,
            } => {
                let class = match kind {
                    CompKind::List => bt.list,
                    CompKind::Set => bt.set,
                };
                let iter_cn = self.expr(b, iter);
                let result = self.new_expr_node(b, node);
                let site = self.ctx.graph.add_site(class, 1, b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(class, site));
                let loop_var = self.synth_node(b, span);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::Iterate {
                        iter: iter_cn,
                        target: loop_var,
                        seen: FxHashSet::default(),
                        links: FxHashSet::default(),
                    },
                );
                b.comp_scopes.push((target, loop_var));
                for &cond in &conds {
                    self.expr(b, cond);
                }
                let elem_cn = self.expr(b, elem);
                b.comp_scopes.pop();
                let slot = self.ctx.graph.site(site).elems[0];
                self.ctx
                    .graph
                    .add_edge(elem_cn, Edge::with_provenance(slot, Transform::Copy, result));
                result
            }
            NodeKind::DictComp {
                key,
                value,
                target,
                iter,
                conds,
            } => {
                let iter_cn = self.expr(b, iter);
                let result = self.new_expr_node(b, node);
                let site = self.ctx.graph.add_site(bt.dict, 2, b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(bt.dict, site));
                let loop_var = self.synth_node(b, span);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::Iterate {
                        iter: iter_cn,
                        target: loop_var,
                        seen: FxHashSet::default(),
                        links: FxHashSet::default(),
                    },
                );
                b.comp_scopes.push((target, loop_var));
                for &cond in &conds {
                    self.expr(b, cond);
                }
                let key_cn = self.expr(b, key);
                let value_cn = self.expr(b, value);
                b.comp_scopes.pop();
                let key_slot = self.ctx.graph.site(site).elems[0];
                let value_slot = self.ctx.graph.site(site).elems[1];
                self.ctx
                    .graph
                    .add_edge(key_cn, Edge::with_provenance(key_slot, Transform::Copy, result));
                self.ctx.graph.add_edge(
                    value_cn,
                    Edge::with_provenance(value_slot, Transform::Copy, result),
                );
                result
            }
            NodeKind::Yield(value) => {
                let result = self.new_expr_node(b, node);
                self.ctx.graph.seed(result, Ty::scalar(bt.none));
                let inst = self.inst(b);
                let (gen_site, gen_object) = (inst.gen_site, inst.gen_object);
                if let (Some(site), Some(object)) = (gen_site, gen_object) {
                    let slot = self.ctx.graph.site(site).elems[0];
                    match value {
                        Some(v) => {
                            let cn = self.expr(b, v);
                            self.ctx
                                .graph
                                .add_edge(cn, Edge::with_provenance(slot, Transform::Copy, object));
                        }
                        None => {
                            self.ctx.graph.seed(slot, Ty::scalar(bt.none));
                        }
                    }
                }
                result
            }
            // Statement kinds never reach here.
            _ => self.new_expr_node(b, node),
        }
    }

    fn container_literal(
        &mut self,
        b: &mut BodyCtx,
        node: NodeId,
        class: ClassId,
        items: &[NodeId],
        span: Span,
    ) -> CnId {
        let result = self.new_expr_node(b, node);
        let site = self.ctx.graph.add_site(class, 1, b.module, span, result);
        self.ctx.graph.seed(result, Ty::at(class, site));
        for &item in items {
            let cn = self.expr(b, item);
            let slot = self.ctx.graph.site(site).elems[0];
            self.ctx
                .graph
                .add_edge(cn, Edge::with_provenance(slot, Transform::Copy, result));
        }
        result
    }

    fn module_attr(
        &mut self,
        b: &mut BodyCtx,
        node: NodeId,
        module: ModuleId,
        attr: Atom,
        span: Span,
    ) -> CnId {
        let result = self.new_expr_node(b, node);
        match self.lookup_binding(module, attr) {
            Some(Binding::Global(g)) => {
                self.ctx.graph.add_edge(g, Edge::copy(result));
            }
            Some(_) => {
                self.ctx.error(
                    DiagnosticKind::UnsupportedConstruct,
                    b.module,
                    span,
                    "functions, classes, and modules are not first-class values",
                );
            }
            None => {
                let text = self.ctx.interner.resolve(attr).to_string();
                let mod_name = self.ctx.module_name(module).to_string();
                self.ctx.error(
                    DiagnosticKind::InferenceFailure,
                    b.module,
                    span,
                    format!("module `{mod_name}` has no member `{text}`"),
                );
            }
        }
        result
    }

    // ---- calls ----

    fn call_expr(
        &mut self,
        b: &mut BodyCtx,
        node: NodeId,
        func: NodeId,
        args: &[NodeId],
        span: Span,
    ) -> CnId {
        let result = self.new_expr_node(b, node);
        match b.ast.arena.kind(func).clone() {
            NodeKind::Name(name) => match self.resolve_load(b, name) {
                Resolved::Func(f) => {
                    let args_cn: Vec<CnId> = args.iter().map(|&a| self.expr(b, a)).collect();
                    let exc = self.exc_targets(b);
                    self.push_constraint(
                        b,
                        span,
                        ConstraintKind::CallFunc {
                            func: f,
                            args: args_cn,
                            result,
                            exc,
                            linked: FxHashSet::default(),
                            current: None,
                        },
                    );
                }
                Resolved::Class(class) => {
                    self.ctor_call(b, result, class, args, span);
                }
                Resolved::Node(_) => {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "calling a value is not supported",
                    );
                    for &a in args {
                        self.expr(b, a);
                    }
                }
                Resolved::Module(_) => {
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        "modules are not callable",
                    );
                    for &a in args {
                        self.expr(b, a);
                    }
                }
                Resolved::Missing => {
                    let text = self.ctx.interner.resolve(name).to_string();
                    if let Some(f) = free_func(&text) {
                        self.free_call(b, result, f, args, span);
                    } else if let Some(class) = self.ctx.registry.lookup(name) {
                        self.ctor_call(b, result, class, args, span);
                    } else {
                        self.ctx.error(
                            DiagnosticKind::InferenceFailure,
                            b.module,
                            span,
                            format!("undefined name `{text}`"),
                        );
                        for &a in args {
                            self.expr(b, a);
                        }
                    }
                }
            },
            NodeKind::Attribute { value, attr } => {
                let base_name = match b.ast.arena.kind(value) {
                    NodeKind::Name(m) => Some(*m),
                    _ => None,
                };
                if let Some(m) = base_name {
                    if let Resolved::Module(mid) = self.resolve_load(b, m) {
                        match self.lookup_binding(mid, attr) {
                            Some(Binding::Func(f)) => {
                                let args_cn: Vec<CnId> =
                                    args.iter().map(|&a| self.expr(b, a)).collect();
                                let exc = self.exc_targets(b);
                                self.push_constraint(
                                    b,
                                    span,
                                    ConstraintKind::CallFunc {
                                        func: f,
                                        args: args_cn,
                                        result,
                                        exc,
                                        linked: FxHashSet::default(),
                                        current: None,
                                    },
                                );
                            }
                            Some(Binding::Class(class)) => {
                                self.ctor_call(b, result, class, args, span);
                            }
                            _ => {
                                let text = self.ctx.interner.resolve(attr).to_string();
                                self.ctx.error(
                                    DiagnosticKind::InferenceFailure,
                                    b.module,
                                    span,
                                    format!("cannot call `{text}` on this module"),
                                );
                                for &a in args {
                                    self.expr(b, a);
                                }
                            }
                        }
                        return result;
                    }
                }
                let recv = self.expr(b, value);
                let args_cn: Vec<CnId> = args.iter().map(|&a| self.expr(b, a)).collect();
                let exc = self.exc_targets(b);
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::CallMethod {
                        recv,
                        name: attr,
                        inplace: None,
                        args: args_cn,
                        result,
                        exc,
                        const_index: None,
                        seen: FxHashSet::default(),
                        linked: FxHashSet::default(),
                        current: FxHashSet::default(),
                        list_site: None,
                    },
                );
            }
            _ => {
                self.ctx.error(
                    DiagnosticKind::UnsupportedConstruct,
                    b.module,
                    span,
                    "unsupported call target",
                );
                for &a in args {
                    self.expr(b, a);
                }
            }
        }
        result
    }

    fn ctor_call(
        &mut self,
        b: &mut BodyCtx,
        result: CnId,
        class: ClassId,
        args: &[NodeId],
        span: Span,
    ) {
        let args_cn: Vec<CnId> = args.iter().map(|&a| self.expr(b, a)).collect();
        let arity = self.ctx.registry.class(class).arity;
        let site = self
            .ctx
            .graph
            .add_site(class, arity.slots(0), b.module, span, result);
        self.ctx.graph.seed(result, Ty::at(class, site));
        if self.ctx.registry.class(class).builtin.is_none() {
            let exc = self.exc_targets(b);
            self.push_constraint(
                b,
                span,
                ConstraintKind::CallCtor {
                    class,
                    site,
                    args: args_cn,
                    result,
                    exc,
                    linked: FxHashSet::default(),
                    current: None,
                },
            );
        }
    }

    fn free_call(
        &mut self,
        b: &mut BodyCtx,
        result: CnId,
        func: FreeFunc,
        args: &[NodeId],
        span: Span,
    ) {
        let bt = self.ctx.registry.builtins;
        // isinstance names a class in argument position; resolve it without
        // treating the class as a value.
        if func == FreeFunc::IsInstance {
            if let Some(&value) = args.first() {
                self.expr(b, value);
            }
            self.ctx.graph.seed(result, Ty::scalar(bt.bool_));
            return;
        }

        let args_cn: Vec<CnId> = args.iter().map(|&a| self.expr(b, a)).collect();
        match func {
            FreeFunc::Len | FreeFunc::Ord => {
                self.ctx.graph.seed(result, Ty::scalar(bt.int_));
            }
            FreeFunc::Print => {
                self.ctx.graph.seed(result, Ty::scalar(bt.none));
            }
            FreeFunc::Input | FreeFunc::Str_ | FreeFunc::Repr | FreeFunc::Chr => {
                self.ctx.graph.seed(result, Ty::scalar(bt.str_));
            }
            FreeFunc::Int_ => {
                self.ctx.graph.seed(result, Ty::scalar(bt.int_));
            }
            FreeFunc::Float_ => {
                self.ctx.graph.seed(result, Ty::scalar(bt.float_));
            }
            FreeFunc::Bool_ => {
                self.ctx.graph.seed(result, Ty::scalar(bt.bool_));
            }
            FreeFunc::Range => {
                let site = self.ctx.graph.add_site(bt.range, 1, b.module, span, result);
                let slot = self.ctx.graph.site(site).elems[0];
                self.ctx.graph.seed(slot, Ty::scalar(bt.int_));
                self.ctx.graph.seed(result, Ty::at(bt.range, site));
            }
            FreeFunc::Open => {
                let site = self.ctx.graph.add_site(bt.file, 0, b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(bt.file, site));
            }
            FreeFunc::Min | FreeFunc::Max => {
                if args_cn.len() >= 2 {
                    for &a in &args_cn {
                        self.ctx.graph.add_edge(a, Edge::copy(result));
                    }
                } else {
                    self.push_constraint(
                        b,
                        span,
                        ConstraintKind::FreeCall {
                            func,
                            args: args_cn,
                            result,
                            site: None,
                            seen: FxHashSet::default(),
                        },
                    );
                }
            }
            FreeFunc::Sum => {
                if let Some(&start) = args_cn.get(1) {
                    self.ctx.graph.add_edge(start, Edge::copy(result));
                }
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::FreeCall {
                        func,
                        args: args_cn,
                        result,
                        site: None,
                        seen: FxHashSet::default(),
                    },
                );
            }
            FreeFunc::Abs => {
                self.push_constraint(
                    b,
                    span,
                    ConstraintKind::FreeCall {
                        func,
                        args: args_cn,
                        result,
                        site: None,
                        seen: FxHashSet::default(),
                    },
                );
            }
            FreeFunc::Sorted | FreeFunc::List_ | FreeFunc::Set_ | FreeFunc::Dict_ => {
                let (class, slots) = match func {
                    FreeFunc::Set_ => (bt.set, 1),
                    FreeFunc::Dict_ => (bt.dict, 2),
                    _ => (bt.list, 1),
                };
                let site = self.ctx.graph.add_site(class, slots, b.module, span, result);
                self.ctx.graph.seed(result, Ty::at(class, site));
                if !args_cn.is_empty() {
                    self.push_constraint(
                        b,
                        span,
                        ConstraintKind::FreeCall {
                            func,
                            args: args_cn,
                            result,
                            site: Some(site),
                            seen: FxHashSet::default(),
                        },
                    );
                }
            }
            FreeFunc::IsInstance => unreachable!("handled above"),
        }
    }

    // ---- name resolution ----

    fn resolve_load(&mut self, b: &BodyCtx, name: Atom) -> Resolved {
        for &(n, cn) in b.comp_scopes.iter().rev() {
            if n == name {
                return Resolved::Node(cn);
            }
        }
        if !b.top_level {
            if let Some(&cn) = self.inst(b).locals.get(&name) {
                return Resolved::Node(cn);
            }
        }
        match self.lookup_binding(b.module, name) {
            Some(Binding::Global(cn)) => Resolved::Node(cn),
            Some(Binding::Func(f)) => Resolved::Func(f),
            Some(Binding::Class(c)) => Resolved::Class(c),
            Some(Binding::Module(m)) => Resolved::Module(m),
            None => Resolved::Missing,
        }
    }

    fn resolve_store(&mut self, b: &BodyCtx, name: Atom, span: Span) -> CnId {
        if b.top_level {
            match self.lookup_binding(b.module, name) {
                Some(Binding::Global(cn)) => cn,
                Some(_) => {
                    let text = self.ctx.interner.resolve(name).to_string();
                    self.ctx.error(
                        DiagnosticKind::UnsupportedConstruct,
                        b.module,
                        span,
                        format!("`{text}` is already bound to a function, class, or module"),
                    );
                    self.ctx
                        .graph
                        .add_node(CnOrigin::Synthetic, b.module, span)
                }
                None => {
                    let cn = self.ctx.graph.add_node(
                        CnOrigin::Global {
                            module: b.module,
                            name,
                        },
                        b.module,
                        span,
                    );
                    self.ctx.program.modules[b.module.index()]
                        .bindings
                        .insert(name, Binding::Global(cn));
                    cn
                }
            }
        } else {
            if let Some(&cn) = self.inst(b).locals.get(&name) {
                return cn;
            }
            let cn = self.ctx.graph.add_node(
                CnOrigin::Local {
                    func: b.func,
                    inst: b.inst,
                    name,
                },
                b.module,
                span,
            );
            self.inst_mut(b).locals.insert(name, cn);
            cn
        }
    }

    fn lookup_binding(&self, module: ModuleId, name: Atom) -> Option<Binding> {
        self.ctx.program.modules[module.index()]
            .bindings
            .get(&name)
            .copied()
    }

    // ---- helpers ----

    fn inst(&self, b: &BodyCtx) -> &Instantiation {
        self.ctx.program.func(b.func).inst(b.inst)
    }

    fn inst_mut(&mut self, b: &BodyCtx) -> &mut Instantiation {
        self.ctx.program.func_mut(b.func).inst_mut(b.inst)
    }

    fn new_expr_node(&mut self, b: &BodyCtx, node: NodeId) -> CnId {
        let span = b.ast.arena.span(node);
        let cn = self.ctx.graph.add_node(
            CnOrigin::Expr {
                func: b.func,
                inst: b.inst,
                node,
            },
            b.module,
            span,
        );
        self.register_expr(b, node, cn);
        cn
    }

    fn register_expr(&mut self, b: &BodyCtx, node: NodeId, cn: CnId) {
        self.inst_mut(b).exprs.insert(node, cn);
    }

    fn synth_node(&mut self, b: &BodyCtx, span: Span) -> CnId {
        self.ctx
            .graph
            .add_node(CnOrigin::Synthetic, b.module, span)
    }

    fn const_index(&self, b: &BodyCtx, index: NodeId) -> Option<i64> {
        match b.ast.arena.kind(index) {
            NodeKind::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Exception targets at the current program point.
    fn exc_targets(&self, b: &BodyCtx) -> ExcTargets {
        let mut handlers = SmallVec::new();
        for frame in &b.handlers {
            for &(class, cn) in frame {
                handlers.push((class, cn));
            }
        }
        ExcTargets {
            handlers,
            out: self.inst(b).exc_out,
        }
    }

    /// Route a raised exception value to every enclosing handler (filtered
    /// by handler class) and to the function's exception-out node.
    fn wire_exception(&mut self, b: &BodyCtx, value: CnId) {
        let targets = self.exc_targets(b);
        for (class, binding) in targets.handlers {
            let transform = match class {
                Some(c) => Transform::SubclassOf(c),
                None => Transform::Copy,
            };
            self.ctx.graph.add_edge(
                value,
                Edge {
                    to: binding,
                    transform,
                    provenance: None,
                },
            );
        }
        self.ctx.graph.add_edge(value, Edge::copy(targets.out));
    }

    pub(crate) fn attr_node(&mut self, module: ModuleId, class: ClassId, attr: Atom) -> CnId {
        let owner = self
            .ctx
            .program
            .attr_owner(&self.ctx.registry, class, attr)
            .unwrap_or(class);
        if let Some(&cn) = self.ctx.program.attr_nodes.get(&(owner, attr)) {
            return cn;
        }
        let cn = self.ctx.graph.add_node(
            CnOrigin::Attr {
                class: owner,
                name: attr,
            },
            module,
            Span::dummy(),
        );
        self.ctx.program.attr_nodes.insert((owner, attr), cn);
        cn
    }

    fn push_constraint(&mut self, b: &BodyCtx, span: Span, kind: ConstraintKind) {
        self.ctx.program.constraints.push(DynConstraint {
            kind,
            module: b.module,
            span,
            owner: (b.func, b.inst),
        });
    }
}
