//! The typed program handed to the emitter.
//!
//! Everything the code generator needs, with types rendered in source-level
//! notation (`list[int]`, `dict[str, int]`, unions joined with `|`).
//! Serializable so an out-of-process emitter can consume it as JSON.

use crate::validate::Liveness;
use molt_common::limits::MAX_TYPE_RENDER_DEPTH;
use molt_graph::Context;
use molt_types::{Ty, TypeSet};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TypedExpr {
    pub start: u32,
    pub end: u32,
    pub ty: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TypedInstantiation {
    /// Argument root classes this instantiation was specialized for.
    pub signature: Vec<String>,
    pub params: Vec<(String, String)>,
    pub locals: BTreeMap<String, String>,
    pub returns: String,
    pub expressions: Vec<TypedExpr>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TypedFunction {
    pub module: String,
    pub name: String,
    pub instantiations: Vec<TypedInstantiation>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TypedClass {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct TypedModule {
    pub name: String,
    pub globals: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TypedProgram {
    pub modules: Vec<TypedModule>,
    pub functions: Vec<TypedFunction>,
    pub classes: Vec<TypedClass>,
}

/// Render a type set in source notation.
pub fn render_types(ctx: &Context, types: &TypeSet) -> String {
    render_set(ctx, types, 0)
}

fn render_set(ctx: &Context, types: &TypeSet, depth: u32) -> String {
    if types.is_empty() {
        return "<unknown>".to_string();
    }
    if depth > MAX_TYPE_RENDER_DEPTH {
        return "...".to_string();
    }
    let mut parts: BTreeSet<String> = BTreeSet::new();
    for ty in types.iter() {
        push_renders(ctx, ty, depth, &mut parts);
    }
    parts.into_iter().collect::<Vec<_>>().join(" | ")
}

fn push_renders(ctx: &Context, ty: Ty, depth: u32, out: &mut BTreeSet<String>) {
    // A retired site was split; render its live descendants instead.
    if !ty.site.is_scalar() {
        let site = ctx.graph.site(ty.site);
        if site.retired && !site.children.is_empty() {
            for &child in &site.children.clone() {
                push_renders(ctx, Ty::at(ty.class, child), depth, out);
            }
            return;
        }
    }
    out.insert(render_one(ctx, ty, depth));
}

fn render_one(ctx: &Context, ty: Ty, depth: u32) -> String {
    let name = ctx.class_name(ty.class).to_string();
    if ty.site.is_scalar() {
        return name;
    }
    let slots = ctx.graph.site(ty.site).elems.clone();
    if slots.is_empty() {
        return name;
    }
    let rendered: Vec<String> = slots
        .iter()
        .map(|&elem| render_set(ctx, &ctx.graph.node(elem).types, depth + 1))
        .collect();
    format!("{name}[{}]", rendered.join(", "))
}

/// Assemble the typed program for every live instantiation.
pub fn typed_program(ctx: &Context, live: &Liveness) -> TypedProgram {
    let mut modules = Vec::new();
    for module in ctx.program.module_ids() {
        let mut globals: BTreeMap<String, String> = BTreeMap::new();
        for (&name, binding) in &ctx.program.module(module).bindings {
            if let molt_graph::Binding::Global(cn) = binding {
                globals.insert(
                    ctx.interner.resolve(name).to_string(),
                    render_types(ctx, &ctx.graph.node(*cn).types),
                );
            }
        }
        modules.push(TypedModule {
            name: ctx.module_name(module).to_string(),
            globals,
        });
    }

    let mut functions = Vec::new();
    for func in ctx.program.func_ids() {
        let f = ctx.program.func(func);
        let mut instantiations = Vec::new();
        for inst in f.inst_ids() {
            if !live.contains(func, inst) {
                continue;
            }
            let i = f.inst(inst);
            let signature: Vec<String> = i
                .sig
                .iter()
                .map(|arg| {
                    arg.iter()
                        .map(|&c| ctx.class_name(c).to_string())
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect();
            let params: Vec<(String, String)> = f
                .params
                .iter()
                .zip(i.formals.iter())
                .map(|(p, &formal)| {
                    (
                        ctx.interner.resolve(p.name).to_string(),
                        render_types(ctx, &ctx.graph.node(formal).types),
                    )
                })
                .collect();
            let mut locals: BTreeMap<String, String> = BTreeMap::new();
            for (&name, &cn) in &i.locals {
                locals.insert(
                    ctx.interner.resolve(name).to_string(),
                    render_types(ctx, &ctx.graph.node(cn).types),
                );
            }
            let returns = render_types(ctx, &ctx.graph.node(i.ret).types);
            let mut exprs: Vec<(molt_ast::NodeId, molt_graph::CnId)> =
                i.exprs.iter().map(|(&n, &c)| (n, c)).collect();
            exprs.sort();
            let expressions: Vec<TypedExpr> = exprs
                .into_iter()
                .map(|(_, cn)| {
                    let node = ctx.graph.node(cn);
                    TypedExpr {
                        start: node.span.start,
                        end: node.span.end,
                        ty: render_types(ctx, &node.types),
                    }
                })
                .collect();
            instantiations.push(TypedInstantiation {
                signature,
                params,
                locals,
                returns,
                expressions,
            });
        }
        if !instantiations.is_empty() {
            functions.push(TypedFunction {
                module: ctx.module_name(f.module).to_string(),
                name: ctx.interner.resolve(f.name).to_string(),
                instantiations,
            });
        }
    }

    let mut classes = Vec::new();
    for index in 0..ctx.registry.len() {
        let class = molt_types::ClassId(index as u32);
        if ctx.registry.class(class).builtin.is_some() {
            continue;
        }
        let mut attributes: BTreeMap<String, String> = BTreeMap::new();
        for ((owner, name), &cn) in &ctx.program.attr_nodes {
            if *owner == class {
                attributes.insert(
                    ctx.interner.resolve(*name).to_string(),
                    render_types(ctx, &ctx.graph.node(cn).types),
                );
            }
        }
        classes.push(TypedClass {
            name: ctx.class_name(class).to_string(),
            attributes,
        });
    }

    TypedProgram {
        modules,
        functions,
        classes,
    }
}
