//! The work-list fixed-point solver.
//!
//! Dequeue a dirty node, push its full type set across each outbound edge
//! applying the edge's transform, and enqueue any destination that grew.
//! Termination follows from monotone growth over a finite lattice; the step
//! cap only guards against implementation bugs.
//!
//! The `Element` transform is special: it does not map types, it installs a
//! copy edge from the relevant element slot the first time a container type
//! crosses. That keeps projection monotone even though element sets keep
//! growing after the container type first arrives.

use molt_common::limits::MAX_PROPAGATION_STEPS;
use molt_graph::{CnFlags, Context, Edge, Transform};
use molt_types::{Ty, TypeSet};
use tracing::trace;

/// Outcome of one propagation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropagateOutcome {
    pub steps: usize,
    /// True if the pass hit the step cap and gave up.
    pub capped: bool,
}

pub fn propagate(ctx: &mut Context) -> PropagateOutcome {
    let mut steps = 0usize;
    while let Some(id) = ctx.graph.dirty.pop() {
        ctx.graph.node_mut(id).flags.remove(CnFlags::QUEUED);
        steps += 1;
        if steps > MAX_PROPAGATION_STEPS {
            return PropagateOutcome { steps, capped: true };
        }

        let edges = ctx.graph.node(id).edges.clone();
        let src = ctx.graph.node(id).types.clone();
        for edge in edges {
            match edge.transform {
                Transform::Copy => {
                    flow(ctx, &src, edge.to);
                }
                Transform::SubclassOf(class) => {
                    let filtered: TypeSet = src
                        .iter()
                        .filter(|ty| ctx.registry.is_subclass(ty.class, class))
                        .collect();
                    flow(ctx, &filtered, edge.to);
                }
                Transform::SiteSplit { orig, repl } => {
                    let mapped: TypeSet = src
                        .iter()
                        .map(|ty| {
                            if ty.site == orig {
                                Ty::at(ty.class, repl)
                            } else {
                                ty
                            }
                        })
                        .collect();
                    flow(ctx, &mapped, edge.to);
                }
                Transform::Element(slot) => {
                    for ty in src.iter() {
                        if let Some(elem) = ctx.graph.elem_of(ty, slot as usize) {
                            ctx.graph.add_edge(
                                elem,
                                Edge {
                                    to: edge.to,
                                    transform: Transform::Copy,
                                    provenance: edge.provenance,
                                },
                            );
                        }
                    }
                }
                Transform::Numeric { receiver } => {
                    let mut widened = TypeSet::new();
                    for ty in src.iter() {
                        if let Some(class) = ctx.registry.widen_numeric([receiver, ty.class]) {
                            widened.insert(Ty::scalar(class));
                        }
                    }
                    flow(ctx, &widened, edge.to);
                }
            }
        }
    }
    trace!(steps, "propagation pass finished");
    PropagateOutcome {
        steps,
        capped: false,
    }
}

fn flow(ctx: &mut Context, types: &TypeSet, to: molt_graph::CnId) {
    if types.is_empty() {
        return;
    }
    if ctx.graph.node_mut(to).types.union_with(types) {
        ctx.graph.mark_dirty(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molt_ast::Program;
    use molt_common::AnalysisOptions;
    use molt_graph::{CnOrigin, Context, GraphBuilder, ModuleId};
    use molt_types::SiteId;

    fn built_context() -> Context {
        let mut program = Program::new();
        let mut m = program.module("main");
        let one = m.int(1);
        let s1 = m.assign_name("x", one);
        m.stmt(s1);
        let x = m.name("x");
        let s2 = m.assign_name("y", x);
        m.stmt(s2);
        m.finish();
        let mut ctx = Context::new(program, AnalysisOptions::default());
        GraphBuilder::new(&mut ctx).build_top_levels();
        ctx
    }

    #[test]
    fn propagation_is_monotone_and_idempotent() {
        let mut ctx = built_context();
        let first = propagate(&mut ctx);
        assert!(!first.capped);
        let sizes: Vec<usize> = ctx
            .graph
            .node_ids()
            .map(|id| ctx.graph.node(id).types.len())
            .collect();

        let second = propagate(&mut ctx);
        assert_eq!(second.steps, 0);
        let after: Vec<usize> = ctx
            .graph
            .node_ids()
            .map(|id| ctx.graph.node(id).types.len())
            .collect();
        assert_eq!(sizes, after);
    }

    #[test]
    fn subclass_edges_filter_in_transit() {
        let mut ctx = Context::new(Program::new(), AnalysisOptions::default());
        let bt = ctx.registry.builtins;
        let src = ctx
            .graph
            .add_node(CnOrigin::Synthetic, ModuleId(0), molt_common::Span::dummy());
        let dst = ctx
            .graph
            .add_node(CnOrigin::Synthetic, ModuleId(0), molt_common::Span::dummy());
        ctx.graph.add_edge(
            src,
            molt_graph::Edge {
                to: dst,
                transform: Transform::SubclassOf(bt.exception),
                provenance: None,
            },
        );
        ctx.graph.seed(src, Ty::scalar(bt.value_error));
        ctx.graph.seed(src, Ty::scalar(bt.int_));
        let outcome = propagate(&mut ctx);
        assert!(!outcome.capped);
        let types = &ctx.graph.node(dst).types;
        assert!(types.contains(Ty::scalar(bt.value_error)));
        assert!(!types.contains(Ty::scalar(bt.int_)));
    }

    #[test]
    fn site_split_edges_rewrite_identity() {
        let mut ctx = Context::new(Program::new(), AnalysisOptions::default());
        let bt = ctx.registry.builtins;
        let creator = ctx
            .graph
            .add_node(CnOrigin::Synthetic, ModuleId(0), molt_common::Span::dummy());
        let site = ctx
            .graph
            .add_site(bt.list, 1, ModuleId(0), molt_common::Span::dummy(), creator);
        let child = ctx.graph.split_site(site, creator);
        let dst = ctx
            .graph
            .add_node(CnOrigin::Synthetic, ModuleId(0), molt_common::Span::dummy());
        ctx.graph.add_edge(
            creator,
            molt_graph::Edge {
                to: dst,
                transform: Transform::SiteSplit {
                    orig: site,
                    repl: child,
                },
                provenance: None,
            },
        );
        ctx.graph.seed(creator, Ty::at(bt.list, site));
        let outcome = propagate(&mut ctx);
        assert!(!outcome.capped);
        assert!(ctx.graph.node(dst).types.contains(Ty::at(bt.list, child)));
        assert!(!ctx.graph.node(dst).types.contains(Ty::at(bt.list, site)));
        assert_ne!(child, SiteId::SCALAR);
    }
}
