//! The call-site specializer.
//!
//! Sweeps the dynamic constraints and expands whatever the latest
//! propagation round made expandable: new call signatures get fresh function
//! instantiations, new receiver classes get dispatch edges, new container
//! types get element projections. Each expansion is recorded in the
//! constraint's `seen`/`linked` state, so sweeps are idempotent and the
//! driver can alternate propagate/specialize until neither reports change.

use molt_common::limits::MAX_INSTANTIATIONS_PER_FUNCTION;
use molt_common::{DiagnosticKind, Span};
use molt_graph::{
    CnId, CnOrigin, ConstraintKind, Context, Edge, ExcTargets, FuncId, GraphBuilder, InstId,
    ModuleId, Signature, Transform,
};
use molt_types::{Builtin, Effect, FreeFunc, SigResult, Ty, method_sig};
use smallvec::SmallVec;
use tracing::debug;

/// The constraint node of attribute `attr` on its defining class `owner`,
/// created on first use.
pub(crate) fn attr_slot(
    ctx: &mut Context,
    module: ModuleId,
    owner: molt_types::ClassId,
    attr: molt_common::Atom,
) -> CnId {
    if let Some(&cn) = ctx.program.attr_nodes.get(&(owner, attr)) {
        return cn;
    }
    let cn = ctx.graph.add_node(
        CnOrigin::Attr {
            class: owner,
            name: attr,
        },
        module,
        Span::dummy(),
    );
    ctx.program.attr_nodes.insert((owner, attr), cn);
    cn
}

/// One specializer sweep. Returns true if anything was expanded.
pub fn specialize(ctx: &mut Context) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < ctx.program.constraints.len() {
        let (module, span, owner) = {
            let c = &ctx.program.constraints[i];
            (c.module, c.span, c.owner)
        };
        let mut kind = std::mem::replace(&mut ctx.program.constraints[i].kind, ConstraintKind::Taken);
        changed |= process(ctx, &mut kind, module, span, owner);
        ctx.program.constraints[i].kind = kind;
        i += 1;
    }
    changed
}

fn process(
    ctx: &mut Context,
    kind: &mut ConstraintKind,
    module: ModuleId,
    span: Span,
    owner: (FuncId, InstId),
) -> bool {
    match kind {
        ConstraintKind::CallFunc {
            func,
            args,
            result,
            exc,
            linked,
            current,
        } => {
            let Some(sig) = signature_of(ctx, None, args) else {
                return false;
            };
            let Some(inst) = lookup_or_create(ctx, *func, sig, module, span) else {
                return false;
            };
            *current = Some(inst);
            if linked.insert(inst) {
                link_call(ctx, *func, inst, None, args, Some(*result), Some(&*exc), module, span);
                true
            } else {
                false
            }
        }
        ConstraintKind::CallCtor {
            class,
            args,
            result,
            exc,
            linked,
            current,
            ..
        } => {
            let init = ctx
                .program
                .resolve_method(&ctx.registry, *class, ctx.atoms.init);
            match init {
                Some(func) => {
                    let Some(sig) = signature_of(ctx, Some(*result), args) else {
                        return false;
                    };
                    let Some(inst) = lookup_or_create(ctx, func, sig, module, span) else {
                        return false;
                    };
                    *current = Some((func, inst));
                    if linked.insert(inst) {
                        link_call(
                            ctx,
                            func,
                            inst,
                            Some(*result),
                            args,
                            None,
                            Some(&*exc),
                            module,
                            span,
                        );
                        true
                    } else {
                        false
                    }
                }
                None => {
                    if !args.is_empty() {
                        let name = ctx.class_name(*class).to_string();
                        ctx.error(
                            DiagnosticKind::InferenceFailure,
                            module,
                            span,
                            format!("class `{name}` takes no constructor arguments"),
                        );
                    }
                    false
                }
            }
        }
        ConstraintKind::CallMethod {
            recv,
            name,
            inplace,
            args,
            result,
            exc,
            const_index,
            seen,
            linked,
            current,
            list_site,
        } => {
            let recv_types = ctx.graph.node(*recv).types.clone();
            let mut changed = false;
            for ty in recv_types.iter() {
                if seen.contains(&ty) {
                    continue;
                }
                match ctx.registry.class(ty.class).builtin {
                    Some(tag) => {
                        seen.insert(ty);
                        changed = true;
                        builtin_method(
                            ctx,
                            tag,
                            ty,
                            *recv,
                            *name,
                            *inplace,
                            args,
                            *result,
                            *const_index,
                            list_site,
                            module,
                            span,
                        );
                    }
                    None => {
                        let target = inplace
                            .and_then(|ip| ctx.program.resolve_method(&ctx.registry, ty.class, ip))
                            .or_else(|| {
                                ctx.program.resolve_method(&ctx.registry, ty.class, *name)
                            });
                        match target {
                            Some(func) => {
                                // Arguments not typed yet: leave the receiver
                                // unrecorded and retry once they are.
                                let Some(sig) = signature_of(ctx, Some(*recv), args) else {
                                    continue;
                                };
                                seen.insert(ty);
                                changed = true;
                                let Some(inst) = lookup_or_create(ctx, func, sig, module, span)
                                else {
                                    continue;
                                };
                                current.insert((func, inst));
                                if linked.insert((ty.class, inst)) {
                                    link_call(
                                        ctx,
                                        func,
                                        inst,
                                        Some(*recv),
                                        args,
                                        Some(*result),
                                        Some(&*exc),
                                        module,
                                        span,
                                    );
                                }
                            }
                            None => {
                                seen.insert(ty);
                                changed = true;
                                let class = ctx.class_name(ty.class).to_string();
                                let method = ctx.interner.resolve(*name).to_string();
                                ctx.error(
                                    DiagnosticKind::InferenceFailure,
                                    module,
                                    span,
                                    format!("class `{class}` has no method `{method}`"),
                                );
                            }
                        }
                    }
                }
            }
            changed
        }
        ConstraintKind::Iterate {
            iter,
            target,
            seen,
            links,
        } => {
            let iter_types = ctx.graph.node(*iter).types.clone();
            let mut changed = false;
            for ty in iter_types.iter() {
                if !seen.insert(ty) {
                    continue;
                }
                changed = true;
                iterate_one(ctx, ty, *iter, *target, links, module, span, owner);
            }
            changed
        }
        ConstraintKind::AttrRead {
            recv,
            attr,
            result,
            seen,
        } => {
            let classes: Vec<_> = ctx.graph.node(*recv).types.classes().collect();
            let mut changed = false;
            for class in classes {
                if !seen.insert(class) {
                    continue;
                }
                changed = true;
                if ctx.registry.class(class).builtin.is_some() {
                    let cname = ctx.class_name(class).to_string();
                    let aname = ctx.interner.resolve(*attr).to_string();
                    ctx.error(
                        DiagnosticKind::InferenceFailure,
                        module,
                        span,
                        format!("`{cname}` object has no attribute `{aname}`"),
                    );
                    continue;
                }
                match ctx.program.attr_owner(&ctx.registry, class, *attr) {
                    Some(owner) => {
                        let slot = attr_slot(ctx, module, owner, *attr);
                        ctx.graph.add_edge(
                            slot,
                            Edge::with_provenance(*result, Transform::Copy, *recv),
                        );
                    }
                    None => {
                        let cname = ctx.class_name(class).to_string();
                        let aname = ctx.interner.resolve(*attr).to_string();
                        if ctx
                            .program
                            .resolve_method(&ctx.registry, class, *attr)
                            .is_some()
                        {
                            ctx.error(
                                DiagnosticKind::UnsupportedConstruct,
                                module,
                                span,
                                format!("bound method `{cname}.{aname}` used as a value"),
                            );
                        } else {
                            ctx.error(
                                DiagnosticKind::InferenceFailure,
                                module,
                                span,
                                format!("class `{cname}` has no attribute `{aname}`"),
                            );
                        }
                    }
                }
            }
            changed
        }
        ConstraintKind::AttrWrite {
            recv,
            attr,
            value,
            seen,
        } => {
            let classes: Vec<_> = ctx.graph.node(*recv).types.classes().collect();
            let mut changed = false;
            for class in classes {
                if !seen.insert(class) {
                    continue;
                }
                changed = true;
                match ctx.program.attr_owner(&ctx.registry, class, *attr) {
                    Some(owner) => {
                        let slot = attr_slot(ctx, module, owner, *attr);
                        ctx.graph
                            .add_edge(*value, Edge::with_provenance(slot, Transform::Copy, *recv));
                    }
                    None => {
                        let cname = ctx.class_name(class).to_string();
                        let aname = ctx.interner.resolve(*attr).to_string();
                        ctx.error(
                            DiagnosticKind::UnsupportedConstruct,
                            module,
                            span,
                            format!(
                                "attribute `{aname}` is not declared by class `{cname}` or its bases"
                            ),
                        );
                    }
                }
            }
            changed
        }
        ConstraintKind::FreeCall {
            func,
            args,
            result,
            site,
            seen,
        } => {
            let Some(&arg0) = args.first() else {
                return false;
            };
            let arg_types = ctx.graph.node(arg0).types.clone();
            let mut changed = false;
            for ty in arg_types.iter() {
                if !seen.insert(ty) {
                    continue;
                }
                changed = true;
                free_call_one(ctx, *func, ty, arg0, *result, *site, module, span);
            }
            changed
        }
        ConstraintKind::Taken => false,
    }
}

// =============================================================================
// Call linking
// =============================================================================

/// Signature of a call: per provided argument (receiver first, when there is
/// one), the sorted root classes of its current type set. `None` while any
/// argument is still untyped.
fn signature_of(ctx: &Context, recv: Option<CnId>, args: &[CnId]) -> Option<Signature> {
    let mut sig = Signature::with_capacity(args.len() + usize::from(recv.is_some()));
    for a in recv.iter().chain(args.iter()) {
        let types = &ctx.graph.node(*a).types;
        if types.is_empty() {
            return None;
        }
        let mut roots: SmallVec<[molt_types::ClassId; 2]> = SmallVec::new();
        for class in types.classes() {
            let root = ctx.registry.root(class);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        roots.sort();
        sig.push(roots);
    }
    Some(sig)
}

fn lookup_or_create(
    ctx: &mut Context,
    func: FuncId,
    sig: Signature,
    module: ModuleId,
    span: Span,
) -> Option<InstId> {
    if let Some(&inst) = ctx.program.func(func).inst_by_sig.get(&sig) {
        return Some(inst);
    }
    if ctx.program.func(func).insts.len() >= MAX_INSTANTIATIONS_PER_FUNCTION {
        let name = ctx.interner.resolve(ctx.program.func(func).name).to_string();
        ctx.error(
            DiagnosticKind::IterationCapExceeded,
            module,
            span,
            format!("function `{name}` exceeded the specialization limit"),
        );
        return None;
    }
    debug!(func = func.0, "new call signature");
    Some(GraphBuilder::new(ctx).instantiate(func, sig))
}

/// Wire a call site to an instantiation: arguments into formals, defaults
/// for omitted trailing arguments, return into the call result, and the
/// callee's escaping exceptions into the caller's handler context.
fn link_call(
    ctx: &mut Context,
    func: FuncId,
    inst: InstId,
    recv: Option<CnId>,
    args: &[CnId],
    result: Option<CnId>,
    exc: Option<&ExcTargets>,
    module: ModuleId,
    span: Span,
) {
    let (formals, ret, exc_out, defaults) = {
        let f = ctx.program.func(func);
        let i = f.inst(inst);
        (
            i.formals.clone(),
            i.ret,
            i.exc_out,
            f.default_nodes.clone(),
        )
    };
    let provided: Vec<CnId> = recv.into_iter().chain(args.iter().copied()).collect();
    if provided.len() > formals.len() {
        let name = ctx.interner.resolve(ctx.program.func(func).name).to_string();
        ctx.error(
            DiagnosticKind::InferenceFailure,
            module,
            span,
            format!("too many arguments in call to `{name}`"),
        );
    }
    for (k, &arg) in provided.iter().enumerate().take(formals.len()) {
        ctx.graph.add_edge(arg, Edge::copy(formals[k]));
    }
    for k in provided.len()..formals.len() {
        match defaults.get(k).copied().flatten() {
            Some(default) => {
                ctx.graph.add_edge(default, Edge::copy(formals[k]));
            }
            None => {
                let name = ctx.interner.resolve(ctx.program.func(func).name).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("missing argument {k} in call to `{name}`"),
                );
            }
        }
    }
    if let Some(r) = result {
        ctx.graph.add_edge(ret, Edge::copy(r));
    }
    if let Some(exc) = exc {
        for &(class, binding) in &exc.handlers {
            let transform = match class {
                Some(c) => Transform::SubclassOf(c),
                None => Transform::Copy,
            };
            ctx.graph.add_edge(
                exc_out,
                Edge {
                    to: binding,
                    transform,
                    provenance: None,
                },
            );
        }
        ctx.graph.add_edge(exc_out, Edge::copy(exc.out));
    }
}

// =============================================================================
// Built-in dispatch
// =============================================================================

fn builtin_class(ctx: &Context, tag: Builtin) -> molt_types::ClassId {
    let bt = ctx.registry.builtins;
    match tag {
        Builtin::Int => bt.int_,
        Builtin::Float => bt.float_,
        Builtin::Bool => bt.bool_,
        Builtin::Str => bt.str_,
        Builtin::Bytes => bt.bytes_,
        Builtin::NoneType => bt.none,
        Builtin::List => bt.list,
        Builtin::Tuple => bt.tuple,
        Builtin::Set => bt.set,
        Builtin::FrozenSet => bt.frozenset,
        Builtin::Dict => bt.dict,
        Builtin::Range => bt.range,
        Builtin::File => bt.file,
        Builtin::Generator => bt.generator,
        Builtin::BaseException => bt.base_exception,
        Builtin::Exception => bt.exception,
    }
}

fn builtin_method(
    ctx: &mut Context,
    tag: Builtin,
    ty: Ty,
    recv: CnId,
    name: molt_common::Atom,
    inplace: Option<molt_common::Atom>,
    args: &[CnId],
    result: CnId,
    const_index: Option<i64>,
    list_site: &mut Option<molt_types::SiteId>,
    module: ModuleId,
    span: Span,
) {
    // Tuple subscripts are slot-directed and bypass the signature table.
    if tag == Builtin::Tuple && name == ctx.atoms.getitem {
        let elems = match ty.site.is_scalar() {
            true => SmallVec::new(),
            false => ctx.graph.site(ty.site).elems.clone(),
        };
        match const_index {
            Some(raw) => {
                let idx = if raw < 0 { raw + elems.len() as i64 } else { raw };
                if idx >= 0 && (idx as usize) < elems.len() {
                    ctx.graph.add_edge(
                        elems[idx as usize],
                        Edge::with_provenance(result, Transform::Copy, recv),
                    );
                } else {
                    ctx.error(
                        DiagnosticKind::TypeConflict,
                        module,
                        span,
                        format!("tuple index {raw} out of range"),
                    );
                }
            }
            None => {
                for &elem in &elems {
                    ctx.graph
                        .add_edge(elem, Edge::with_provenance(result, Transform::Copy, recv));
                }
            }
        }
        return;
    }
    if tag == Builtin::Tuple && name == ctx.atoms.setitem {
        ctx.error(
            DiagnosticKind::TypeConflict,
            module,
            span,
            "tuple object does not support item assignment",
        );
        return;
    }

    let sig = inplace
        .and_then(|ip| {
            let text = ctx.interner.resolve(ip).to_string();
            method_sig(tag, &text)
        })
        .or_else(|| {
            let text = ctx.interner.resolve(name).to_string();
            method_sig(tag, &text)
        });
    let Some(sig) = sig else {
        let cname = ctx.class_name(ty.class).to_string();
        let mname = ctx.interner.resolve(name).to_string();
        ctx.error(
            DiagnosticKind::InferenceFailure,
            module,
            span,
            format!("`{cname}` object has no method `{mname}`"),
        );
        return;
    };

    let bt = ctx.registry.builtins;
    match sig.result {
        SigResult::None_ => ctx.graph.seed(result, Ty::scalar(bt.none)),
        SigResult::Bool => ctx.graph.seed(result, Ty::scalar(bt.bool_)),
        SigResult::Int => ctx.graph.seed(result, Ty::scalar(bt.int_)),
        SigResult::Float => ctx.graph.seed(result, Ty::scalar(bt.float_)),
        SigResult::Str => ctx.graph.seed(result, Ty::scalar(bt.str_)),
        SigResult::Bytes => ctx.graph.seed(result, Ty::scalar(bt.bytes_)),
        SigResult::Receiver => ctx.graph.seed(result, ty),
        SigResult::Elem(k) => {
            if let Some(elem) = ctx.graph.elem_of(ty, k as usize) {
                ctx.graph
                    .add_edge(elem, Edge::with_provenance(result, Transform::Copy, recv));
            }
        }
        SigResult::ListOfElem(k) => {
            let site = ensure_list_site(ctx, list_site, result, module, span);
            let slot = ctx.graph.site(site).elems[0];
            if let Some(elem) = ctx.graph.elem_of(ty, k as usize) {
                ctx.graph
                    .add_edge(elem, Edge::with_provenance(slot, Transform::Copy, recv));
            }
        }
        SigResult::ListOf(scalar) => {
            let site = ensure_list_site(ctx, list_site, result, module, span);
            let slot = ctx.graph.site(site).elems[0];
            let class = builtin_class(ctx, scalar);
            ctx.graph.seed(slot, Ty::scalar(class));
        }
        SigResult::NumericWiden => {
            if args.is_empty() {
                if let Some(class) = ctx.registry.widen_numeric([ty.class]) {
                    ctx.graph.seed(result, Ty::scalar(class));
                }
            } else {
                ctx.graph.add_edge(
                    args[0],
                    Edge {
                        to: result,
                        transform: Transform::Numeric { receiver: ty.class },
                        provenance: None,
                    },
                );
            }
        }
    }

    for effect in sig.effects {
        match *effect {
            Effect::ArgToElem { arg, slot } => {
                if let (Some(&a), Some(elem)) =
                    (args.get(arg as usize), ctx.graph.elem_of(ty, slot as usize))
                {
                    ctx.graph
                        .add_edge(a, Edge::with_provenance(elem, Transform::Copy, recv));
                }
            }
            Effect::ArgElemToElem { arg, arg_slot, slot } => {
                if let (Some(&a), Some(elem)) =
                    (args.get(arg as usize), ctx.graph.elem_of(ty, slot as usize))
                {
                    ctx.graph
                        .add_edge(a, Edge::with_provenance(elem, Transform::Element(arg_slot), recv));
                }
            }
            Effect::ArgToResult { arg } => {
                if let Some(&a) = args.get(arg as usize) {
                    ctx.graph.add_edge(a, Edge::copy(result));
                }
            }
        }
    }
}

fn ensure_list_site(
    ctx: &mut Context,
    list_site: &mut Option<molt_types::SiteId>,
    result: CnId,
    module: ModuleId,
    span: Span,
) -> molt_types::SiteId {
    if let Some(site) = *list_site {
        return site;
    }
    let list = ctx.registry.builtins.list;
    let site = ctx.graph.add_site(list, 1, module, span, result);
    ctx.graph.seed(result, Ty::at(list, site));
    *list_site = Some(site);
    site
}

// =============================================================================
// Iteration
// =============================================================================

fn iterate_one(
    ctx: &mut Context,
    ty: Ty,
    iter: CnId,
    target: CnId,
    links: &mut rustc_hash::FxHashSet<(FuncId, InstId)>,
    module: ModuleId,
    span: Span,
    owner: (FuncId, InstId),
) {
    let bt = ctx.registry.builtins;
    let tag = ctx.registry.class(ty.class).builtin;
    match tag {
        Some(
            Builtin::List | Builtin::Set | Builtin::FrozenSet | Builtin::Range | Builtin::Dict
            | Builtin::Generator,
        ) => {
            // Dict iteration yields keys: slot 0 in every case.
            if let Some(elem) = ctx.graph.elem_of(ty, 0) {
                ctx.graph
                    .add_edge(elem, Edge::with_provenance(target, Transform::Copy, iter));
            }
        }
        Some(Builtin::Tuple) => {
            if !ty.site.is_scalar() {
                for &elem in &ctx.graph.site(ty.site).elems.clone() {
                    ctx.graph
                        .add_edge(elem, Edge::with_provenance(target, Transform::Copy, iter));
                }
            }
        }
        Some(Builtin::Str | Builtin::File) => {
            ctx.graph.seed(target, Ty::scalar(bt.str_));
        }
        Some(Builtin::Bytes) => {
            ctx.graph.seed(target, Ty::scalar(bt.int_));
        }
        None => {
            // User classes iterate through the generator protocol: __iter__
            // producing an iterator, or __next__ on the object itself.
            if let Some(func) = ctx
                .program
                .resolve_method(&ctx.registry, ty.class, ctx.atoms.next)
            {
                if let Some(sig) = signature_of(ctx, Some(iter), &[]) {
                    if let Some(inst) = lookup_or_create(ctx, func, sig, module, span) {
                        links.insert((func, inst));
                        link_call(ctx, func, inst, Some(iter), &[], Some(target), None, module, span);
                    }
                }
                return;
            }
            let iter_atom = ctx.interner.get("__iter__");
            let iter_method = iter_atom
                .and_then(|a| ctx.program.resolve_method(&ctx.registry, ty.class, a));
            if let Some(func) = iter_method {
                let iterator = ctx.graph.add_node(CnOrigin::Synthetic, module, span);
                if let Some(sig) = signature_of(ctx, Some(iter), &[]) {
                    if let Some(inst) = lookup_or_create(ctx, func, sig, module, span) {
                        links.insert((func, inst));
                        link_call(
                            ctx,
                            func,
                            inst,
                            Some(iter),
                            &[],
                            Some(iterator),
                            None,
                            module,
                            span,
                        );
                    }
                }
                ctx.program.constraints.push(molt_graph::DynConstraint {
                    kind: ConstraintKind::Iterate {
                        iter: iterator,
                        target,
                        seen: rustc_hash::FxHashSet::default(),
                        links: rustc_hash::FxHashSet::default(),
                    },
                    module,
                    span,
                    owner,
                });
            } else {
                let cname = ctx.class_name(ty.class).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("`{cname}` object is not iterable"),
                );
            }
        }
        Some(_) => {
            let cname = ctx.class_name(ty.class).to_string();
            ctx.error(
                DiagnosticKind::InferenceFailure,
                module,
                span,
                format!("`{cname}` object is not iterable"),
            );
        }
    }
}

// =============================================================================
// Class-directed free functions
// =============================================================================

fn free_call_one(
    ctx: &mut Context,
    func: FreeFunc,
    ty: Ty,
    arg: CnId,
    result: CnId,
    site: Option<molt_types::SiteId>,
    module: ModuleId,
    span: Span,
) {
    let bt = ctx.registry.builtins;
    let tag = ctx.registry.class(ty.class).builtin;
    let is_sequence = matches!(
        tag,
        Some(
            Builtin::List
                | Builtin::Set
                | Builtin::FrozenSet
                | Builtin::Range
                | Builtin::Generator
                | Builtin::Dict
        )
    );
    match func {
        FreeFunc::Abs => match ctx.registry.widen_numeric([ty.class]) {
            Some(class) => ctx.graph.seed(result, Ty::scalar(class)),
            None => {
                let cname = ctx.class_name(ty.class).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("bad operand type for abs(): `{cname}`"),
                );
            }
        },
        FreeFunc::Min | FreeFunc::Max | FreeFunc::Sum => {
            if is_sequence {
                if let Some(elem) = ctx.graph.elem_of(ty, 0) {
                    ctx.graph
                        .add_edge(elem, Edge::with_provenance(result, Transform::Copy, arg));
                }
            } else if matches!(tag, Some(Builtin::Tuple)) {
                if !ty.site.is_scalar() {
                    for &elem in &ctx.graph.site(ty.site).elems.clone() {
                        ctx.graph
                            .add_edge(elem, Edge::with_provenance(result, Transform::Copy, arg));
                    }
                }
            } else if matches!(tag, Some(Builtin::Str)) && func != FreeFunc::Sum {
                ctx.graph.seed(result, Ty::scalar(bt.str_));
            } else {
                let cname = ctx.class_name(ty.class).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("`{cname}` object is not iterable"),
                );
            }
        }
        FreeFunc::Sorted | FreeFunc::List_ | FreeFunc::Set_ => {
            let Some(site) = site else { return };
            let slot = ctx.graph.site(site).elems[0];
            if is_sequence {
                if let Some(elem) = ctx.graph.elem_of(ty, 0) {
                    ctx.graph
                        .add_edge(elem, Edge::with_provenance(slot, Transform::Copy, arg));
                }
            } else if matches!(tag, Some(Builtin::Tuple)) {
                if !ty.site.is_scalar() {
                    for &elem in &ctx.graph.site(ty.site).elems.clone() {
                        ctx.graph
                            .add_edge(elem, Edge::with_provenance(slot, Transform::Copy, arg));
                    }
                }
            } else if matches!(tag, Some(Builtin::Str)) {
                ctx.graph.seed(slot, Ty::scalar(bt.str_));
            } else {
                let cname = ctx.class_name(ty.class).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("`{cname}` object is not iterable"),
                );
            }
        }
        FreeFunc::Dict_ => {
            let Some(site) = site else { return };
            if matches!(tag, Some(Builtin::Dict)) {
                let key_slot = ctx.graph.site(site).elems[0];
                let value_slot = ctx.graph.site(site).elems[1];
                if let (Some(k), Some(v)) = (ctx.graph.elem_of(ty, 0), ctx.graph.elem_of(ty, 1)) {
                    ctx.graph
                        .add_edge(k, Edge::with_provenance(key_slot, Transform::Copy, arg));
                    ctx.graph
                        .add_edge(v, Edge::with_provenance(value_slot, Transform::Copy, arg));
                }
            } else {
                let cname = ctx.class_name(ty.class).to_string();
                ctx.error(
                    DiagnosticKind::InferenceFailure,
                    module,
                    span,
                    format!("cannot build a dict from `{cname}`"),
                );
            }
        }
        // The remaining free functions are fully wired at build time.
        _ => {}
    }
}
