//! Completeness and conflict checks over the solved graph.
//!
//! Runs after the driver loop converges. Problems are collected, never
//! raised: the emitter refuses to produce output when any error-severity
//! diagnostic exists, but one analysis run reports everything it can find.
//!
//! Instantiations that were superseded by a wider call signature stay in the
//! graph (growth is monotone) but are excluded here through a liveness walk
//! from the module top levels over each call site's current links.

use molt_common::DiagnosticKind;
use molt_graph::{CnId, CnOrigin, ConstraintKind, Context, FuncId, InstId};
use molt_types::{ClassId, TypeSet};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Instantiations reachable from the module top levels.
#[derive(Debug, Default)]
pub struct Liveness {
    pub insts: FxHashSet<(FuncId, InstId)>,
}

impl Liveness {
    pub fn contains(&self, func: FuncId, inst: InstId) -> bool {
        self.insts.contains(&(func, inst))
    }
}

pub fn compute_liveness(ctx: &Context) -> Liveness {
    let mut live = Liveness::default();
    let mut queue: Vec<(FuncId, InstId)> = Vec::new();
    for module in ctx.program.module_ids() {
        let top = ctx.program.module(module).top_func;
        if !ctx.program.func(top).insts.is_empty() {
            queue.push((top, InstId(0)));
        }
    }
    while let Some(entry) = queue.pop() {
        if !live.insts.insert(entry) {
            continue;
        }
        for constraint in &ctx.program.constraints {
            if constraint.owner != entry {
                continue;
            }
            match &constraint.kind {
                ConstraintKind::CallFunc { func, current, .. } => {
                    if let Some(inst) = current {
                        queue.push((*func, *inst));
                    }
                }
                ConstraintKind::CallCtor { current, .. } => {
                    if let Some(link) = current {
                        queue.push(*link);
                    }
                }
                ConstraintKind::CallMethod { current, .. } => {
                    queue.extend(current.iter().copied());
                }
                ConstraintKind::Iterate { links, .. } => {
                    queue.extend(links.iter().copied());
                }
                _ => {}
            }
        }
    }
    live
}

/// How a type set maps onto one emitted type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmissionTy {
    Empty,
    Single(ClassId),
    Conflict(Vec<ClassId>),
}

/// Resolve a type set to the single class the emitter would declare.
///
/// `None` unifies with anything (emitted as nullability); numerics widen;
/// otherwise the classes must share a superclass, preferring one present in
/// the set itself.
pub fn emission_class(ctx: &Context, types: &TypeSet) -> EmissionTy {
    let mut classes: Vec<ClassId> = types.classes().collect();
    if classes.is_empty() {
        return EmissionTy::Empty;
    }
    let none = ctx.registry.builtins.none;
    classes.retain(|&c| c != none);
    if classes.is_empty() {
        return EmissionTy::Single(none);
    }
    if classes.len() == 1 {
        return EmissionTy::Single(classes[0]);
    }
    if classes.iter().all(|&c| ctx.registry.is_numeric(c)) {
        if let Some(widened) = ctx.registry.widen_numeric(classes.iter().copied()) {
            return EmissionTy::Single(widened);
        }
    }
    for candidate in ctx.registry.mro(classes[0]).collect::<Vec<_>>() {
        if classes
            .iter()
            .all(|&c| ctx.registry.is_subclass(c, candidate))
        {
            return EmissionTy::Single(candidate);
        }
    }
    EmissionTy::Conflict(classes)
}

fn conflict_message(ctx: &Context, what: &str, classes: &[ClassId]) -> String {
    let names: Vec<&str> = classes.iter().map(|&c| ctx.class_name(c)).collect();
    format!("conflicting types for {what}: {}", names.join(" | "))
}

/// Validate every live instantiation and allocation site.
pub fn validate(ctx: &mut Context) -> Liveness {
    let live = compute_liveness(ctx);
    debug!(live = live.insts.len(), "validating typed graph");

    let mut entries: Vec<(FuncId, InstId)> = live.insts.iter().copied().collect();
    entries.sort();
    for (func, inst) in entries {
        // Expression nodes: must be non-empty and emission-resolvable.
        let mut exprs: Vec<(molt_ast::NodeId, CnId)> = ctx
            .program
            .func(func)
            .inst(inst)
            .exprs
            .iter()
            .map(|(&n, &c)| (n, c))
            .collect();
        exprs.sort();
        for (_, cn) in exprs {
            let (types, module, span) = {
                let node = ctx.graph.node(cn);
                (node.types.clone(), node.module, node.span)
            };
            if types.is_empty() {
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    "cannot infer type",
                );
            } else if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
                let message = conflict_message(ctx, "expression", &classes);
                ctx.error(DiagnosticKind::TypeConflict, module, span, message);
            }
        }

        // Locals: conflicts only. Emptiness surfaces at the reads, which are
        // expression nodes; an unread handler binding is allowed to stay
        // empty.
        let mut locals: Vec<(molt_common::Atom, CnId)> = ctx
            .program
            .func(func)
            .inst(inst)
            .locals
            .iter()
            .map(|(&a, &c)| (a, c))
            .collect();
        locals.sort();
        for (name, cn) in locals {
            let (types, module, span) = {
                let node = ctx.graph.node(cn);
                (node.types.clone(), node.module, node.span)
            };
            if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
                let text = ctx.interner.resolve(name).to_string();
                let message = conflict_message(ctx, &format!("`{text}`"), &classes);
                ctx.error(DiagnosticKind::TypeConflict, module, span, message);
            }
        }

        let ret = ctx.program.func(func).inst(inst).ret;
        let (types, module, span) = {
            let node = ctx.graph.node(ret);
            (node.types.clone(), node.module, node.span)
        };
        if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
            let message = conflict_message(ctx, "return value", &classes);
            ctx.error(DiagnosticKind::TypeConflict, module, span, message);
        }
    }

    // Module-level variables.
    for module in ctx.program.module_ids().collect::<Vec<_>>() {
        let mut globals: Vec<(molt_common::Atom, CnId)> = ctx
            .program
            .module(module)
            .bindings
            .iter()
            .filter_map(|(&name, binding)| match binding {
                molt_graph::Binding::Global(cn) => Some((name, *cn)),
                _ => None,
            })
            .collect();
        globals.sort();
        for (name, cn) in globals {
            let (types, module, span) = {
                let node = ctx.graph.node(cn);
                (node.types.clone(), node.module, node.span)
            };
            if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
                let text = ctx.interner.resolve(name).to_string();
                let message = conflict_message(ctx, &format!("`{text}`"), &classes);
                ctx.error(DiagnosticKind::TypeConflict, module, span, message);
            }
        }
    }

    // Allocation sites: every element slot of a live site must resolve to a
    // single declared element class.
    for site in ctx.graph.site_ids().collect::<Vec<_>>() {
        let (retired, creator, class, elems, module, span) = {
            let s = ctx.graph.site(site);
            (
                s.retired,
                s.creator,
                s.class,
                s.elems.clone(),
                s.module,
                s.span,
            )
        };
        if retired {
            continue;
        }
        let creator_live = match ctx.graph.node(creator).origin {
            CnOrigin::Expr { func, inst, .. } | CnOrigin::GenObject { func, inst } => {
                live.contains(func, inst)
            }
            _ => !ctx.graph.node(creator).types.is_empty(),
        };
        if !creator_live {
            continue;
        }
        let class_text = ctx.class_name(class).to_string();
        for (slot, &elem) in elems.iter().enumerate() {
            let types = ctx.graph.node(elem).types.clone();
            if types.is_empty() {
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("cannot infer the element type of this `{class_text}`"),
                );
            } else if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
                let what = format!("`{class_text}` element {slot}");
                let message = conflict_message(ctx, &what, &classes);
                ctx.error(DiagnosticKind::TypeConflict, module, span, message);
            }
        }
    }

    // Class attribute slots, finalized across all instantiations.
    let attr_entries: Vec<((ClassId, molt_common::Atom), CnId)> = ctx
        .program
        .attr_nodes
        .iter()
        .map(|(&k, &v)| (k, v))
        .collect();
    for ((class, name), cn) in attr_entries {
        let (types, module, span) = {
            let node = ctx.graph.node(cn);
            (node.types.clone(), node.module, node.span)
        };
        if let EmissionTy::Conflict(classes) = emission_class(ctx, &types) {
            let cname = ctx.class_name(class).to_string();
            let aname = ctx.interner.resolve(name).to_string();
            let message = conflict_message(ctx, &format!("attribute `{cname}.{aname}`"), &classes);
            ctx.error(DiagnosticKind::TypeConflict, module, span, message);
        }
    }

    live
}
