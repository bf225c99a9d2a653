//! Iterative flow analysis: allocation-site splitting.
//!
//! After propagation converges, a container allocation site can be polluted:
//! one site shared by several independent consumers (a fresh-container
//! factory called from two places, a per-instance container created in a
//! shared `__init__` instantiation) merges all their element types. This
//! pass detects such sites, partitions their downstream users into disjoint
//! container-flow regions, and splits the site one child per region. The
//! split is installed as `SiteSplit` transforms on the fan-out edges, the
//! original site is retired, and the driver resets the graph to seeds and
//! re-propagates, so each region then sees only its own element types.
//!
//! The split criterion, in full:
//!
//! 1. The site's element slots have stores from at least two distinct
//!    receivers.
//! 2. Walking forward from the creating node, the site's holders form a
//!    single chain (the *trunk*) up to one node with several holder
//!    successors (the *frontier*), all reached over plain copy edges.
//! 3. The non-trunk holders fall into at least two disjoint regions (union
//!    find over copy edges between holders), every one anchored at a
//!    frontier successor, with no reads from the trunk or from outside the
//!    regions.
//! 4. The per-region element contributions actually differ - otherwise the
//!    split would refine nothing.

use ena::unify::{InPlaceUnificationTable, NoError, UnifyKey, UnifyValue};
use fixedbitset::FixedBitSet;
use molt_common::limits::MAX_SPLIT_DEPTH;
use molt_graph::{CnId, Context, Transform};
use molt_types::{ClassId, SiteId, Ty};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::{debug, trace};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct RegionKey(u32);

#[derive(Clone, Copy, Debug, PartialEq)]
struct NoValue;

impl UnifyValue for NoValue {
    type Error = NoError;
    fn unify_values(_: &Self, _: &Self) -> Result<Self, NoError> {
        Ok(NoValue)
    }
}

impl UnifyKey for RegionKey {
    type Value = NoValue;
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(i: u32) -> Self {
        RegionKey(i)
    }
    fn tag() -> &'static str {
        "RegionKey"
    }
}

/// Per-pass indexes over the solved graph.
struct SiteIndex {
    /// Nodes whose type set contains each site.
    holders: FxHashMap<SiteId, Vec<CnId>>,
    /// Element-slot stores: (slot, source node, provenance receiver).
    stores: FxHashMap<SiteId, Vec<(u8, CnId, Option<CnId>)>>,
    /// Element-slot reads: (slot, destination node, provenance receiver).
    reads: FxHashMap<SiteId, Vec<(u8, CnId, Option<CnId>)>>,
}

fn build_index(ctx: &Context) -> SiteIndex {
    let mut elem_owner: FxHashMap<CnId, (SiteId, u8)> = FxHashMap::default();
    for site in ctx.graph.site_ids() {
        for (slot, &elem) in ctx.graph.site(site).elems.iter().enumerate() {
            elem_owner.insert(elem, (site, slot as u8));
        }
    }

    let mut index = SiteIndex {
        holders: FxHashMap::default(),
        stores: FxHashMap::default(),
        reads: FxHashMap::default(),
    };
    for id in ctx.graph.node_ids() {
        let node = ctx.graph.node(id);
        for ty in node.types.iter() {
            if !ty.site.is_scalar() {
                index.holders.entry(ty.site).or_default().push(id);
            }
        }
        let src_is_elem = elem_owner.contains_key(&id);
        for edge in &node.edges {
            if let Some(&(site, slot)) = elem_owner.get(&edge.to) {
                // Element-to-element forwarding (split children, fresh-list
                // results) is internal plumbing, not a store.
                if !src_is_elem {
                    index
                        .stores
                        .entry(site)
                        .or_default()
                        .push((slot, id, edge.provenance));
                }
            }
            if src_is_elem && !elem_owner.contains_key(&edge.to) {
                let (site, slot) = elem_owner[&id];
                index
                    .reads
                    .entry(site)
                    .or_default()
                    .push((slot, edge.to, edge.provenance));
            }
        }
    }
    index
}

fn passes(ctx: &Context, transform: Transform, ty: Ty) -> bool {
    match transform {
        Transform::Copy => true,
        Transform::SubclassOf(class) => ctx.registry.is_subclass(ty.class, class),
        Transform::SiteSplit { orig, .. } => orig != ty.site,
        Transform::Element(_) | Transform::Numeric { .. } => false,
    }
}

fn holder_successors(
    ctx: &Context,
    node: CnId,
    ty: Ty,
    holder_set: &FixedBitSet,
    exclude: &FxHashSet<CnId>,
) -> Vec<CnId> {
    let mut out: Vec<CnId> = Vec::new();
    for edge in &ctx.graph.node(node).edges {
        if edge.to != node
            && passes(ctx, edge.transform, ty)
            && holder_set.contains(edge.to.index())
            && !exclude.contains(&edge.to)
            && !out.contains(&edge.to)
        {
            out.push(edge.to);
        }
    }
    out
}

/// Run one splitting pass. Returns the number of sites split; the caller
/// resets the graph to seeds and re-propagates when it is nonzero.
pub fn run_ifa(ctx: &mut Context) -> usize {
    let index = build_index(ctx);
    let mut splits = 0;
    for site in ctx.graph.site_ids().collect::<Vec<_>>() {
        if try_split(ctx, &index, site) {
            splits += 1;
        }
    }
    if splits > 0 {
        debug!(splits, "allocation sites split");
    }
    splits
}

fn try_split(ctx: &mut Context, index: &SiteIndex, site: SiteId) -> bool {
    let (class, creator, depth, retired) = {
        let s = ctx.graph.site(site);
        (s.class, s.creator, s.depth, s.retired)
    };
    if retired
        || depth >= MAX_SPLIT_DEPTH
        || !ctx.registry.class(class).arity.is_container()
    {
        return false;
    }
    let Some(holders) = index.holders.get(&site) else {
        return false;
    };
    let Some(stores) = index.stores.get(&site) else {
        return false;
    };
    let provs: FxHashSet<CnId> = stores.iter().filter_map(|&(_, _, p)| p).collect();
    if provs.len() < 2 {
        return false;
    }

    let ty = Ty::at(class, site);
    let mut holder_set = FixedBitSet::with_capacity(ctx.graph.node_count());
    for &h in holders {
        holder_set.insert(h.index());
    }

    // Trunk walk: follow the single-successor chain from the creator.
    let mut trunk: FxHashSet<CnId> = FxHashSet::default();
    trunk.insert(creator);
    let mut cur = creator;
    let (frontier, branch_succs) = loop {
        let succs = holder_successors(ctx, cur, ty, &holder_set, &trunk);
        match succs.len() {
            0 => return false,
            1 => {
                cur = succs[0];
                if !trunk.insert(cur) {
                    return false;
                }
            }
            _ => break (cur, succs),
        }
    };

    // The fan-out must be plain copies; a filtered or rewriting edge cannot
    // carry a split marker.
    for edge in &ctx.graph.node(frontier).edges {
        if branch_succs.contains(&edge.to)
            && passes(ctx, edge.transform, ty)
            && edge.transform != Transform::Copy
        {
            return false;
        }
    }

    // Disjoint-region check over the non-trunk holders.
    let mut table: InPlaceUnificationTable<RegionKey> = InPlaceUnificationTable::new();
    let mut keys: FxHashMap<CnId, RegionKey> = FxHashMap::default();
    for &h in holders {
        if !trunk.contains(&h) {
            keys.entry(h).or_insert_with(|| table.new_key(NoValue));
        }
    }
    let key_pairs: Vec<(CnId, RegionKey)> = keys.iter().map(|(&h, &k)| (h, k)).collect();
    for (h, k) in &key_pairs {
        for edge in ctx.graph.node(*h).edges.clone() {
            if passes(ctx, edge.transform, ty) {
                if let Some(&other) = keys.get(&edge.to) {
                    table.union(*k, other);
                }
            }
        }
    }
    let mut branch_roots: Vec<RegionKey> = Vec::new();
    for &succ in &branch_succs {
        let root = table.find(keys[&succ]);
        if !branch_roots.contains(&root) {
            branch_roots.push(root);
        }
    }
    if branch_roots.len() < 2 {
        return false;
    }
    // Every holder must sit in one of the branch regions; a disconnected
    // holder (an aliasing result seeded with this site) would lose the
    // region stores after a split.
    for (_, k) in &key_pairs {
        if !branch_roots.contains(&table.find(*k)) {
            return false;
        }
    }
    // Reads through the trunk (or from outside the regions) would observe
    // only upstream stores after the split.
    if let Some(reads) = index.reads.get(&site) {
        for &(_, _, prov) in reads {
            match prov {
                Some(p) if keys.contains_key(&p) => {}
                _ => return false,
            }
        }
    }

    // Attribute stores to regions and check the split buys precision.
    let mut upstream: BTreeSet<(u8, ClassId)> = BTreeSet::new();
    let mut per_root: FxHashMap<RegionKey, BTreeSet<(u8, ClassId)>> = FxHashMap::default();
    for &(slot, src, prov) in stores {
        let classes: Vec<ClassId> = ctx.graph.node(src).types.classes().collect();
        let bucket = match prov {
            Some(p) if trunk.contains(&p) => &mut upstream,
            Some(p) if keys.contains_key(&p) => per_root.entry(table.find(keys[&p])).or_default(),
            _ => &mut upstream,
        };
        for c in classes {
            bucket.insert((slot, c));
        }
    }
    // A storeless region would be left reading only the upstream stores, so
    // every region must contribute, and at least two must disagree.
    if branch_roots
        .iter()
        .any(|root| per_root.get(root).is_none_or(|s| s.is_empty()))
    {
        return false;
    }
    let effective: Vec<BTreeSet<(u8, ClassId)>> = branch_roots
        .iter()
        .map(|root| {
            let mut set = upstream.clone();
            if let Some(extra) = per_root.get(root) {
                set.extend(extra.iter().copied());
            }
            set
        })
        .collect();
    if effective.windows(2).all(|w| w[0] == w[1]) {
        return false;
    }

    // Split: one child per region, installed on the fan-out edges.
    let mut child_of_root: FxHashMap<RegionKey, SiteId> = FxHashMap::default();
    for &succ in &branch_succs {
        let root = table.find(keys[&succ]);
        child_of_root
            .entry(root)
            .or_insert_with(|| ctx.graph.split_site(site, succ));
    }
    let edge_count = ctx.graph.node(frontier).edges.len();
    for i in 0..edge_count {
        let edge = ctx.graph.node(frontier).edges[i];
        if branch_succs.contains(&edge.to) && passes(ctx, edge.transform, ty) {
            let root = table.find(keys[&edge.to]);
            let repl = child_of_root[&root];
            ctx.graph.node_mut(frontier).edges[i].transform = Transform::SiteSplit {
                orig: site,
                repl,
            };
        }
    }
    // Re-target the region-attributed store edges onto the split children;
    // only the trunk's own stores stay on the parent, flowing down to every
    // child through the forwarding edges.
    for &(slot, src, prov) in stores {
        let Some(p) = prov else { continue };
        let Some(&key) = keys.get(&p) else { continue };
        let root = table.find(key);
        let Some(&child) = child_of_root.get(&root) else {
            continue;
        };
        let old_elem = ctx.graph.site(site).elems[slot as usize];
        let new_elem = ctx.graph.site(child).elems[slot as usize];
        for edge in ctx.graph.node_mut(src).edges.iter_mut() {
            if edge.to == old_elem && edge.provenance == Some(p) {
                edge.to = new_elem;
            }
        }
        ctx.graph.mark_dirty(src);
    }
    ctx.graph.site_mut(site).retired = true;
    trace!(
        site = site.0,
        regions = child_of_root.len(),
        "split allocation site"
    );
    true
}
