//! Syntax pre-scans used by the declaration pass and by instantiation.
//!
//! These walkers stay within one function body: nested `def`/`class`
//! statements are not descended into (they are rejected later by the body
//! walk, and their names never belong to the enclosing scope).

use molt_ast::{ModuleAst, NodeId, NodeKind};
use molt_common::Atom;
use rustc_hash::FxHashSet;

/// Push every child node of `kind` onto `stack`, excluding nested
/// definitions.
fn push_children(kind: &NodeKind, stack: &mut Vec<NodeId>) {
    match kind {
        NodeKind::Int(_)
        | NodeKind::Float(_)
        | NodeKind::Bool(_)
        | NodeKind::Str(_)
        | NodeKind::Bytes(_)
        | NodeKind::NoneLit
        | NodeKind::Name(_)
        | NodeKind::Import { .. }
        | NodeKind::Pass
        | NodeKind::Break
        | NodeKind::Continue
        | NodeKind::FunctionDef { .. }
        | NodeKind::ClassDef { .. } => {}
        NodeKind::Attribute { value, .. } => stack.push(*value),
        NodeKind::Subscript { value, index } => {
            stack.push(*value);
            stack.push(*index);
        }
        NodeKind::Call { func, args } => {
            stack.push(*func);
            stack.extend(args.iter().copied());
        }
        NodeKind::Unary { operand, .. } => stack.push(*operand),
        NodeKind::Binary { left, right, .. } | NodeKind::Compare { left, right, .. } => {
            stack.push(*left);
            stack.push(*right);
        }
        NodeKind::BoolOp { values, .. } => stack.extend(values.iter().copied()),
        NodeKind::Conditional { test, then, orelse } => {
            stack.push(*test);
            stack.push(*then);
            stack.push(*orelse);
        }
        NodeKind::ListLit(items) | NodeKind::TupleLit(items) | NodeKind::SetLit(items) => {
            stack.extend(items.iter().copied());
        }
        NodeKind::DictLit { keys, values } => {
            stack.extend(keys.iter().copied());
            stack.extend(values.iter().copied());
        }
        NodeKind::Comp {
            elem, iter, conds, ..
        } => {
            stack.push(*elem);
            stack.push(*iter);
            stack.extend(conds.iter().copied());
        }
        NodeKind::DictComp {
            key,
            value,
            iter,
            conds,
            ..
        } => {
            stack.push(*key);
            stack.push(*value);
            stack.push(*iter);
            stack.extend(conds.iter().copied());
        }
        NodeKind::Yield(value) => {
            if let Some(v) = value {
                stack.push(*v);
            }
        }
        NodeKind::ExprStmt(e) => stack.push(*e),
        NodeKind::Assign { target, value } => {
            stack.push(*target);
            stack.push(*value);
        }
        NodeKind::AugAssign { target, value, .. } => {
            stack.push(*target);
            stack.push(*value);
        }
        NodeKind::If { test, body, orelse } | NodeKind::While { test, body, orelse } => {
            stack.push(*test);
            stack.extend(body.iter().copied());
            stack.extend(orelse.iter().copied());
        }
        NodeKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            stack.push(*target);
            stack.push(*iter);
            stack.extend(body.iter().copied());
            stack.extend(orelse.iter().copied());
        }
        NodeKind::Return(value) => {
            if let Some(v) = value {
                stack.push(*v);
            }
        }
        NodeKind::Assert { test, msg } => {
            stack.push(*test);
            if let Some(m) = msg {
                stack.push(*m);
            }
        }
        NodeKind::Raise { exc } => {
            if let Some(e) = exc {
                stack.push(*e);
            }
        }
        NodeKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            stack.extend(body.iter().copied());
            for h in handlers {
                stack.extend(h.body.iter().copied());
            }
            stack.extend(orelse.iter().copied());
            stack.extend(finalbody.iter().copied());
        }
    }
}

fn walk(ast: &ModuleAst, roots: &[NodeId], mut f: impl FnMut(&NodeKind)) {
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(node) = stack.pop() {
        let kind = ast.arena.kind(node);
        f(kind);
        push_children(kind, &mut stack);
    }
}

/// True if the body contains a `yield` (the function is a generator).
pub fn contains_yield(ast: &ModuleAst, body: &[NodeId]) -> bool {
    let mut found = false;
    walk(ast, body, |kind| {
        if matches!(kind, NodeKind::Yield(_)) {
            found = true;
        }
    });
    found
}

/// True if the body contains a `return` with a value.
pub fn has_value_return(ast: &ModuleAst, body: &[NodeId]) -> bool {
    let mut found = false;
    walk(ast, body, |kind| {
        if matches!(kind, NodeKind::Return(Some(_))) {
            found = true;
        }
    });
    found
}

fn collect_target_names(ast: &ModuleAst, target: NodeId, out: &mut FxHashSet<Atom>) {
    match ast.arena.kind(target) {
        NodeKind::Name(name) => {
            out.insert(*name);
        }
        NodeKind::TupleLit(items) => {
            for &item in items {
                collect_target_names(ast, item, out);
            }
        }
        // Attribute and subscript targets do not bind names.
        _ => {}
    }
}

/// Names assigned anywhere in the body: these are the function's locals.
/// Comprehension targets scope to the comprehension and are not collected.
pub fn assigned_names(ast: &ModuleAst, body: &[NodeId], out: &mut FxHashSet<Atom>) {
    let mut stack: Vec<NodeId> = body.to_vec();
    while let Some(node) = stack.pop() {
        let kind = ast.arena.kind(node);
        match kind {
            NodeKind::Assign { target, .. }
            | NodeKind::AugAssign { target, .. }
            | NodeKind::For { target, .. } => {
                collect_target_names(ast, *target, out);
            }
            NodeKind::Try { handlers, .. } => {
                for h in handlers {
                    if let Some(name) = h.name {
                        out.insert(name);
                    }
                }
            }
            _ => {}
        }
        push_children(kind, &mut stack);
    }
}

/// Attributes stored on `self_name` anywhere in a method body.
pub fn self_attr_stores(
    ast: &ModuleAst,
    body: &[NodeId],
    self_name: Atom,
    out: &mut FxHashSet<Atom>,
) {
    let mut stack: Vec<NodeId> = body.to_vec();
    while let Some(node) = stack.pop() {
        let kind = ast.arena.kind(node);
        if let NodeKind::Assign { target, .. } | NodeKind::AugAssign { target, .. } = kind {
            if let NodeKind::Attribute { value, attr } = ast.arena.kind(*target) {
                if matches!(ast.arena.kind(*value), NodeKind::Name(n) if *n == self_name) {
                    out.insert(*attr);
                }
            }
        }
        push_children(kind, &mut stack);
    }
}
