//! The constraint graph: nodes, edges, and allocation sites.
//!
//! A constraint node carries the monotone type set of one program entity
//! (expression, local, formal, return value, attribute slot, or element slot
//! of an allocation site). A directed edge `src → dst` means every type
//! inferred at `src` must also appear at `dst`, possibly through a transform.
//!
//! Each node stores its seed types separately from its propagated types:
//! when iterative flow analysis retires and re-fans an allocation site
//! between rounds, the driver resets every node back to its seeds and
//! re-propagates, so no stale type from a retired site survives a round
//! boundary. Within a round, growth is strictly monotone.

use crate::program::{FuncId, InstId, ModuleId};
use bitflags::bitflags;
use molt_ast::NodeId;
use molt_common::{Atom, Span};
use molt_types::{ClassId, SiteId, Ty, TypeSet};
use smallvec::SmallVec;

/// Index of a constraint node in the [`Graph`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CnId(pub u32);

impl CnId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct CnFlags: u8 {
        /// Node is on the propagation work list.
        const QUEUED = 1 << 0;
    }
}

/// What a constraint node stands for. Used for diagnostics and for the
/// liveness walk over the final graph; propagation itself never looks at it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CnOrigin {
    /// An expression, per function instantiation.
    Expr {
        func: FuncId,
        inst: InstId,
        node: NodeId,
    },
    /// A local variable of one instantiation.
    Local {
        func: FuncId,
        inst: InstId,
        name: Atom,
    },
    /// A module-level variable.
    Global { module: ModuleId, name: Atom },
    /// A formal parameter of one instantiation.
    Formal {
        func: FuncId,
        inst: InstId,
        index: u32,
    },
    /// The return value of one instantiation.
    Return { func: FuncId, inst: InstId },
    /// The implicit exception-out node of one instantiation.
    ExcOut { func: FuncId, inst: InstId },
    /// An attribute slot of a class.
    Attr { class: ClassId, name: Atom },
    /// Element slot `slot` of an allocation site.
    ElemSlot { site: SiteId, slot: u8 },
    /// The generator object a generator instantiation hands to its callers.
    GenObject { func: FuncId, inst: InstId },
    /// Helper nodes with no direct source counterpart.
    Synthetic,
}

/// Edge transforms. `Copy` is plain flow; the others rewrite or filter the
/// types in transit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transform {
    Copy,
    /// For each container type crossing, splice in a copy edge from slot `k`
    /// of its allocation site to the destination. Used for operations that
    /// consume the elements of an argument container (`extend`, `update`,
    /// `list(xs)`).
    Element(u8),
    /// Pass only types whose class is a subclass of the given class.
    /// Used for `except`-clause bindings.
    SubclassOf(ClassId),
    /// Numeric widening for arithmetic operator results: each numeric class
    /// crossing is widened against the receiver's class; non-numerics are
    /// dropped.
    Numeric { receiver: ClassId },
    /// Rewrite `orig` to `repl` in transit. Installed by iterative flow
    /// analysis when an allocation site is split along a fan-out edge.
    SiteSplit { orig: SiteId, repl: SiteId },
}

/// A directed data-flow edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge {
    pub to: CnId,
    pub transform: Transform,
    /// The receiver node a store or read flowed through, when there is one.
    /// Iterative flow analysis partitions element contributions by this.
    pub provenance: Option<CnId>,
}

impl Edge {
    pub fn copy(to: CnId) -> Self {
        Edge {
            to,
            transform: Transform::Copy,
            provenance: None,
        }
    }

    pub fn with_provenance(to: CnId, transform: Transform, provenance: CnId) -> Self {
        Edge {
            to,
            transform,
            provenance: Some(provenance),
        }
    }
}

/// One constraint node.
#[derive(Clone, Debug)]
pub struct CnData {
    pub origin: CnOrigin,
    pub module: ModuleId,
    pub span: Span,
    /// Types planted at graph-construction time (literals, allocation
    /// sites, scalar results of built-in signatures). Survive round resets.
    pub seed: TypeSet,
    /// The propagated type set; a superset of `seed` once solved.
    pub types: TypeSet,
    pub edges: SmallVec<[Edge; 2]>,
    pub flags: CnFlags,
}

/// One allocation site.
#[derive(Clone, Debug)]
pub struct SiteData {
    pub class: ClassId,
    pub module: ModuleId,
    pub span: Span,
    /// One element constraint node per type parameter.
    pub elems: SmallVec<[CnId; 2]>,
    /// The node whose seed introduces this site's type into the graph.
    pub creator: CnId,
    /// Split lineage.
    pub parent: Option<SiteId>,
    pub children: SmallVec<[SiteId; 2]>,
    pub depth: u32,
    /// Retired sites were split; their types are resolved through
    /// `children` for output and skipped by validation.
    pub retired: bool,
}

/// Node arena plus allocation-site table.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<CnData>,
    sites: Vec<SiteData>,
    /// Nodes whose type set changed since the propagator last ran.
    pub dirty: Vec<CnId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, origin: CnOrigin, module: ModuleId, span: Span) -> CnId {
        let id = CnId(self.nodes.len() as u32);
        self.nodes.push(CnData {
            origin,
            module,
            span,
            seed: TypeSet::new(),
            types: TypeSet::new(),
            edges: SmallVec::new(),
            flags: CnFlags::default(),
        });
        id
    }

    #[inline]
    pub fn node(&self, id: CnId) -> &CnData {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn node_mut(&mut self, id: CnId) -> &mut CnData {
        &mut self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = CnId> {
        (0..self.nodes.len() as u32).map(CnId)
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.edges.len()).sum()
    }

    /// Plant a seed type: it enters both the seed set and the live set, and
    /// the node is marked dirty if it grew.
    pub fn seed(&mut self, id: CnId, ty: Ty) {
        let node = &mut self.nodes[id.index()];
        node.seed.insert(ty);
        if node.types.insert(ty) {
            self.mark_dirty(id);
        }
    }

    /// Add an edge if an identical one is not already present; returns true
    /// if the edge is new. The source is marked dirty so existing types
    /// flow across the new edge.
    pub fn add_edge(&mut self, from: CnId, edge: Edge) -> bool {
        let node = &mut self.nodes[from.index()];
        if node.edges.contains(&edge) {
            return false;
        }
        node.edges.push(edge);
        if !self.nodes[from.index()].types.is_empty() {
            self.mark_dirty(from);
        }
        true
    }

    pub fn mark_dirty(&mut self, id: CnId) {
        let node = &mut self.nodes[id.index()];
        if !node.flags.contains(CnFlags::QUEUED) {
            node.flags.insert(CnFlags::QUEUED);
            self.dirty.push(id);
        }
    }

    // ---- allocation sites ----

    /// Create a fresh allocation site with `slots` element nodes.
    pub fn add_site(
        &mut self,
        class: ClassId,
        slots: usize,
        module: ModuleId,
        span: Span,
        creator: CnId,
    ) -> SiteId {
        let id = SiteId(self.sites.len() as u32);
        let elems: SmallVec<[CnId; 2]> = (0..slots)
            .map(|slot| {
                self.add_node(
                    CnOrigin::ElemSlot {
                        site: id,
                        slot: slot as u8,
                    },
                    module,
                    Span::dummy(),
                )
            })
            .collect();
        self.sites.push(SiteData {
            class,
            module,
            span,
            elems,
            creator,
            parent: None,
            children: SmallVec::new(),
            depth: 0,
            retired: false,
        });
        id
    }

    /// Create a split child of `parent`, with the same class and slot count.
    pub fn split_site(&mut self, parent: SiteId, creator: CnId) -> SiteId {
        let (class, slots, module, span, depth) = {
            let p = &self.sites[parent.index()];
            (p.class, p.elems.len(), p.module, p.span, p.depth)
        };
        let child = self.add_site(class, slots, module, span, creator);
        self.sites[child.index()].parent = Some(parent);
        self.sites[child.index()].depth = depth + 1;
        // Upstream element contributions land on the parent's slots and flow
        // down into each split.
        for slot in 0..slots {
            let from = self.sites[parent.index()].elems[slot];
            let to = self.sites[child.index()].elems[slot];
            self.add_edge(from, Edge::copy(to));
        }
        self.sites[parent.index()].children.push(child);
        child
    }

    #[inline]
    pub fn site(&self, id: SiteId) -> &SiteData {
        &self.sites[id.index()]
    }

    #[inline]
    pub fn site_mut(&mut self, id: SiteId) -> &mut SiteData {
        &mut self.sites[id.index()]
    }

    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    pub fn site_ids(&self) -> impl Iterator<Item = SiteId> {
        (0..self.sites.len() as u32).map(SiteId)
    }

    /// Element slot `slot` of the site behind `ty`, if it has one.
    pub fn elem_of(&self, ty: Ty, slot: usize) -> Option<CnId> {
        if ty.site.is_scalar() {
            return None;
        }
        self.sites[ty.site.index()].elems.get(slot).copied()
    }

    /// Subtype query over concrete types: `a`'s class inherits from `b`'s and
    /// every element slot of `a`'s site is pointwise subtype-compatible with
    /// the corresponding slot of `b`'s. Exposed for the emitter, which needs
    /// it when deciding whether an inferred type fits a declared one.
    pub fn is_subtype(&self, registry: &molt_types::ClassRegistry, a: Ty, b: Ty) -> bool {
        self.is_subtype_at(registry, a, b, 0)
    }

    // Containers can reach themselves through their own element slots, so
    // the pointwise descent is depth-bounded; past the bound the answer is
    // the optimistic one, matching the renderer's cutoff.
    fn is_subtype_at(
        &self,
        registry: &molt_types::ClassRegistry,
        a: Ty,
        b: Ty,
        depth: u32,
    ) -> bool {
        if !registry.is_subclass(a.class, b.class) {
            return false;
        }
        if a.site.is_scalar() || b.site.is_scalar() || a.site == b.site {
            return true;
        }
        if depth > molt_common::limits::MAX_TYPE_RENDER_DEPTH {
            return true;
        }
        let left = &self.sites[a.site.index()].elems;
        let right = &self.sites[b.site.index()].elems;
        if left.len() != right.len() {
            return false;
        }
        left.iter().zip(right.iter()).all(|(&la, &rb)| {
            let sub = &self.nodes[la.index()].types;
            let sup = &self.nodes[rb.index()].types;
            sub.iter().all(|elem_a| {
                sup.iter()
                    .any(|elem_b| self.is_subtype_at(registry, elem_a, elem_b, depth + 1))
            })
        })
    }

    /// Reset every node's live set back to its seeds and queue the seeded
    /// nodes. Called between rounds after allocation-site splits.
    pub fn reset_to_seeds(&mut self) {
        self.dirty.clear();
        for id in 0..self.nodes.len() {
            let node = &mut self.nodes[id];
            node.types = node.seed.clone();
            node.flags.remove(CnFlags::QUEUED);
        }
        for id in self.node_ids().collect::<Vec<_>>() {
            if !self.node(id).types.is_empty() {
                self.mark_dirty(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use molt_types::ClassId;

    fn scalar(class: u32) -> Ty {
        Ty::scalar(ClassId(class))
    }

    #[test]
    fn seeds_survive_reset() {
        let mut graph = Graph::new();
        let a = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let b = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        graph.seed(a, scalar(1));
        graph.node_mut(b).types.insert(scalar(1));

        graph.reset_to_seeds();
        assert!(!graph.node(a).types.is_empty());
        assert!(graph.node(b).types.is_empty());
        assert_eq!(graph.dirty, vec![a]);
    }

    #[test]
    fn add_edge_deduplicates() {
        let mut graph = Graph::new();
        let a = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let b = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        assert!(graph.add_edge(a, Edge::copy(b)));
        assert!(!graph.add_edge(a, Edge::copy(b)));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn subtype_is_pointwise_over_elements() {
        let mut interner = molt_common::Interner::new();
        let registry = molt_types::ClassRegistry::new(&mut interner);
        let bt = registry.builtins;
        let mut graph = Graph::new();
        let c1 = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let s1 = graph.add_site(bt.list, 1, ModuleId(0), Span::dummy(), c1);
        let c2 = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let s2 = graph.add_site(bt.list, 1, ModuleId(0), Span::dummy(), c2);
        let e1 = graph.site(s1).elems[0];
        let e2 = graph.site(s2).elems[0];
        graph.seed(e1, Ty::scalar(bt.bool_));
        graph.seed(e2, Ty::scalar(bt.int_));

        // list[bool] fits list[int] because bool inherits from int.
        assert!(graph.is_subtype(&registry, Ty::at(bt.list, s1), Ty::at(bt.list, s2)));
        assert!(!graph.is_subtype(&registry, Ty::at(bt.list, s2), Ty::at(bt.list, s1)));
        assert!(!graph.is_subtype(&registry, Ty::scalar(bt.int_), Ty::scalar(bt.str_)));
        assert!(graph.is_subtype(&registry, Ty::scalar(bt.bool_), Ty::scalar(bt.int_)));
    }

    #[test]
    fn split_site_forwards_parent_elements() {
        let mut graph = Graph::new();
        let creator = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let site = graph.add_site(ClassId(7), 1, ModuleId(0), Span::dummy(), creator);
        let child_creator = graph.add_node(CnOrigin::Synthetic, ModuleId(0), Span::dummy());
        let child = graph.split_site(site, child_creator);

        assert_eq!(graph.site(child).parent, Some(site));
        assert_eq!(graph.site(child).depth, 1);
        let parent_elem = graph.site(site).elems[0];
        let child_elem = graph.site(child).elems[0];
        assert!(graph.node(parent_elem).edges.iter().any(|e| e.to == child_elem));
    }
}
