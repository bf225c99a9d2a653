//! Programmatic tree construction.
//!
//! The front-end glue (and the test suites) build trees through this API
//! instead of hand-allocating nodes. Spans are synthesized as unique
//! single-byte ranges in allocation order, which keeps diagnostics stable
//! and distinct per program point even for trees that never had source text.

use crate::node::{
    AstArena, BinaryOp, BoolOpKind, CompKind, CompareOp, ExceptHandler, NodeId, NodeKind, Param,
    UnaryOp,
};
use crate::program::{ModuleAst, Program};
use molt_common::{Atom, Span};

pub struct ModuleBuilder<'p> {
    program: &'p mut Program,
    name: Atom,
    arena: AstArena,
    body: Vec<NodeId>,
}

impl<'p> ModuleBuilder<'p> {
    pub(crate) fn new(program: &'p mut Program, name: &str) -> Self {
        let name = program.interner.intern(name);
        ModuleBuilder {
            program,
            name,
            arena: AstArena::new(),
            body: Vec::new(),
        }
    }

    pub fn atom(&mut self, s: &str) -> Atom {
        self.program.interner.intern(s)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let n = self.arena.len() as u32;
        self.arena.alloc(kind, Span::new(n, n + 1))
    }

    // ---- expressions ----

    pub fn int(&mut self, v: i64) -> NodeId {
        self.push(NodeKind::Int(v))
    }

    pub fn float(&mut self, v: f64) -> NodeId {
        self.push(NodeKind::Float(v))
    }

    pub fn bool_(&mut self, v: bool) -> NodeId {
        self.push(NodeKind::Bool(v))
    }

    pub fn str_(&mut self, v: &str) -> NodeId {
        let atom = self.atom(v);
        self.push(NodeKind::Str(atom))
    }

    pub fn bytes(&mut self, v: &str) -> NodeId {
        let atom = self.atom(v);
        self.push(NodeKind::Bytes(atom))
    }

    pub fn none(&mut self) -> NodeId {
        self.push(NodeKind::NoneLit)
    }

    pub fn name(&mut self, n: &str) -> NodeId {
        let atom = self.atom(n);
        self.push(NodeKind::Name(atom))
    }

    pub fn attr(&mut self, value: NodeId, attr: &str) -> NodeId {
        let attr = self.atom(attr);
        self.push(NodeKind::Attribute { value, attr })
    }

    pub fn subscript(&mut self, value: NodeId, index: NodeId) -> NodeId {
        self.push(NodeKind::Subscript { value, index })
    }

    pub fn call(&mut self, func: NodeId, args: &[NodeId]) -> NodeId {
        self.push(NodeKind::Call {
            func,
            args: args.to_vec(),
        })
    }

    pub fn call_name(&mut self, func: &str, args: &[NodeId]) -> NodeId {
        let f = self.name(func);
        self.call(f, args)
    }

    /// `recv.name(args...)`
    pub fn method(&mut self, recv: NodeId, name: &str, args: &[NodeId]) -> NodeId {
        let f = self.attr(recv, name);
        self.call(f, args)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.push(NodeKind::Unary { op, operand })
    }

    pub fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::Binary { op, left, right })
    }

    pub fn bool_op(&mut self, op: BoolOpKind, values: &[NodeId]) -> NodeId {
        self.push(NodeKind::BoolOp {
            op,
            values: values.to_vec(),
        })
    }

    pub fn compare(&mut self, op: CompareOp, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::Compare { op, left, right })
    }

    pub fn cond(&mut self, test: NodeId, then: NodeId, orelse: NodeId) -> NodeId {
        self.push(NodeKind::Conditional { test, then, orelse })
    }

    pub fn list(&mut self, items: &[NodeId]) -> NodeId {
        self.push(NodeKind::ListLit(items.to_vec()))
    }

    pub fn tuple(&mut self, items: &[NodeId]) -> NodeId {
        self.push(NodeKind::TupleLit(items.to_vec()))
    }

    pub fn set_(&mut self, items: &[NodeId]) -> NodeId {
        self.push(NodeKind::SetLit(items.to_vec()))
    }

    pub fn dict(&mut self, keys: &[NodeId], values: &[NodeId]) -> NodeId {
        assert_eq!(keys.len(), values.len());
        self.push(NodeKind::DictLit {
            keys: keys.to_vec(),
            values: values.to_vec(),
        })
    }

    pub fn comp(
        &mut self,
        kind: CompKind,
        elem: NodeId,
        target: &str,
        iter: NodeId,
        conds: &[NodeId],
    ) -> NodeId {
        let target = self.atom(target);
        self.push(NodeKind::Comp {
            kind,
            elem,
            target,
            iter,
            conds: conds.to_vec(),
        })
    }

    pub fn dict_comp(
        &mut self,
        key: NodeId,
        value: NodeId,
        target: &str,
        iter: NodeId,
        conds: &[NodeId],
    ) -> NodeId {
        let target = self.atom(target);
        self.push(NodeKind::DictComp {
            key,
            value,
            target,
            iter,
            conds: conds.to_vec(),
        })
    }

    pub fn yield_(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Yield(value))
    }

    // ---- statements ----

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExprStmt(expr))
    }

    pub fn assign(&mut self, target: NodeId, value: NodeId) -> NodeId {
        self.push(NodeKind::Assign { target, value })
    }

    /// `name = value`
    pub fn assign_name(&mut self, name: &str, value: NodeId) -> NodeId {
        let target = self.name(name);
        self.assign(target, value)
    }

    pub fn aug_assign_name(&mut self, name: &str, op: BinaryOp, value: NodeId) -> NodeId {
        let target = self.name(name);
        self.push(NodeKind::AugAssign { target, op, value })
    }

    pub fn if_(&mut self, test: NodeId, body: Vec<NodeId>, orelse: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::If { test, body, orelse })
    }

    pub fn while_(&mut self, test: NodeId, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::While {
            test,
            body,
            orelse: Vec::new(),
        })
    }

    pub fn for_(&mut self, target: NodeId, iter: NodeId, body: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::For {
            target,
            iter,
            body,
            orelse: Vec::new(),
        })
    }

    /// `for name in iter: body`
    pub fn for_named(&mut self, name: &str, iter: NodeId, body: Vec<NodeId>) -> NodeId {
        let target = self.name(name);
        self.for_(target, iter, body)
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Return(value))
    }

    pub fn def(&mut self, name: &str, params: &[&str], body: Vec<NodeId>) -> NodeId {
        let params: Vec<Param> = params
            .iter()
            .map(|p| Param {
                name: self.atom(p),
                default: None,
                span: Span::dummy(),
            })
            .collect();
        let name = self.atom(name);
        self.push(NodeKind::FunctionDef { name, params, body })
    }

    pub fn def_with_defaults(
        &mut self,
        name: &str,
        params: &[(&str, Option<NodeId>)],
        body: Vec<NodeId>,
    ) -> NodeId {
        let params: Vec<Param> = params
            .iter()
            .map(|(p, default)| Param {
                name: self.atom(p),
                default: *default,
                span: Span::dummy(),
            })
            .collect();
        let name = self.atom(name);
        self.push(NodeKind::FunctionDef { name, params, body })
    }

    pub fn class(&mut self, name: &str, bases: &[&str], body: Vec<NodeId>) -> NodeId {
        let bases: Vec<Atom> = bases.iter().map(|b| self.atom(b)).collect();
        let name = self.atom(name);
        self.push(NodeKind::ClassDef { name, bases, body })
    }

    pub fn import(&mut self, module: &str) -> NodeId {
        let module = self.atom(module);
        self.push(NodeKind::Import { module })
    }

    pub fn assert_(&mut self, test: NodeId, msg: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Assert { test, msg })
    }

    pub fn raise(&mut self, exc: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Raise { exc })
    }

    pub fn try_(
        &mut self,
        body: Vec<NodeId>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<NodeId>,
        finalbody: Vec<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    pub fn handler(&mut self, class: Option<&str>, name: Option<&str>, body: Vec<NodeId>) -> ExceptHandler {
        ExceptHandler {
            class: class.map(|c| self.atom(c)),
            name: name.map(|n| self.atom(n)),
            body,
            span: Span::dummy(),
        }
    }

    pub fn pass(&mut self) -> NodeId {
        self.push(NodeKind::Pass)
    }

    pub fn break_(&mut self) -> NodeId {
        self.push(NodeKind::Break)
    }

    pub fn continue_(&mut self) -> NodeId {
        self.push(NodeKind::Continue)
    }

    /// Append a statement to the module's top-level body.
    pub fn stmt(&mut self, statement: NodeId) {
        self.body.push(statement);
    }

    /// Finish the module and append it to the program.
    pub fn finish(self) -> usize {
        let index = self.program.modules.len();
        self.program.modules.push(ModuleAst {
            name: self.name,
            arena: self.arena,
            body: self.body,
        });
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_allocates_unique_spans() {
        let mut program = Program::new();
        let mut m = program.module("main");
        let a = m.int(1);
        let b = m.int(2);
        let sum = m.binary(BinaryOp::Add, a, b);
        let stmt = m.assign_name("x", sum);
        m.stmt(stmt);
        m.finish();

        let module = &program.modules[0];
        assert_eq!(module.body.len(), 1);
        assert_ne!(module.arena.span(a), module.arena.span(b));
        match module.arena.kind(stmt) {
            NodeKind::Assign { value, .. } => assert_eq!(*value, sum),
            other => panic!("expected assignment, got {other:?}"),
        }
    }
}
