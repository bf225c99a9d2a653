//! Dynamic constraints.
//!
//! Some graph structure cannot be built from syntax alone: which function a
//! call reaches, which class attribute a read resolves to, and which element
//! slot an iteration projects all depend on type sets that only exist once
//! propagation has run. Those obligations are recorded here at build time
//! and expanded by the specializer whenever the sets they watch have grown.
//! Each constraint tracks what it has already reacted to, so expansion is
//! monotone and idempotent.

use crate::graph::CnId;
use crate::program::{FuncId, InstId, ModuleId};
use molt_common::{Atom, Span};
use molt_types::{ClassId, FreeFunc, SiteId, Ty};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Where a raised or escaping exception can land: every enclosing handler
/// binding at the program point (class-filtered), plus the function's
/// implicit exception-out node.
#[derive(Clone, Debug)]
pub struct ExcTargets {
    pub handlers: SmallVec<[(Option<ClassId>, CnId); 2]>,
    pub out: CnId,
}

#[derive(Debug)]
pub enum ConstraintKind {
    /// A direct call to a user-defined function (or a cross-module one).
    CallFunc {
        func: FuncId,
        args: Vec<CnId>,
        result: CnId,
        exc: ExcTargets,
        /// Signatures this call site has already been wired to.
        linked: FxHashSet<InstId>,
        /// The instantiation matching the latest signature.
        current: Option<InstId>,
    },
    /// A constructor call `C(...)` of a user-defined class.
    CallCtor {
        class: ClassId,
        site: SiteId,
        args: Vec<CnId>,
        result: CnId,
        exc: ExcTargets,
        linked: FxHashSet<InstId>,
        /// The `__init__` instantiation matching the latest signature.
        current: Option<(FuncId, InstId)>,
    },
    /// A method call `recv.name(args)`, including desugared operators and
    /// subscripts. Dispatch fans out per class in the receiver's type set.
    CallMethod {
        recv: CnId,
        name: Atom,
        /// In-place operator fallback: tried first, `name` used when the
        /// receiver class does not define it.
        inplace: Option<Atom>,
        args: Vec<CnId>,
        result: CnId,
        exc: ExcTargets,
        /// Constant subscript index, when the call is a desugared
        /// `recv[lit]`; directs tuple slot projection.
        const_index: Option<i64>,
        /// Receiver types already dispatched (per concrete type, so a split
        /// site re-dispatches onto its own element slots).
        seen: FxHashSet<Ty>,
        /// (class, instantiation) links already wired for user classes.
        linked: FxHashSet<(ClassId, InstId)>,
        /// Instantiations the call currently reaches, for the liveness walk.
        current: FxHashSet<(FuncId, InstId)>,
        /// Fresh-list result site for built-ins returning a new list
        /// (`dict.keys`, `str.split`), allocated on first use.
        list_site: Option<SiteId>,
    },
    /// `target` receives the element type of whatever `iter` iterates as.
    Iterate {
        iter: CnId,
        target: CnId,
        seen: FxHashSet<Ty>,
        /// Iterator-protocol instantiations reached through user classes.
        links: FxHashSet<(FuncId, InstId)>,
    },
    /// Attribute read `recv.attr → result`, resolved per receiver class.
    AttrRead {
        recv: CnId,
        attr: Atom,
        result: CnId,
        seen: FxHashSet<ClassId>,
    },
    /// Attribute write `recv.attr = value`.
    AttrWrite {
        recv: CnId,
        attr: Atom,
        value: CnId,
        seen: FxHashSet<ClassId>,
    },
    /// A built-in free function whose behavior depends on argument classes
    /// (`abs`, `min`, `sum`, `sorted`, `list`, ...).
    FreeCall {
        func: FreeFunc,
        args: Vec<CnId>,
        result: CnId,
        /// Result container site for the collectors (`sorted`, `list`,
        /// `set`, `dict`), allocated at build time.
        site: Option<SiteId>,
        seen: FxHashSet<Ty>,
    },
    /// Transient marker used while a constraint is being processed; never
    /// observed between specializer sweeps.
    Taken,
}

/// One dynamic constraint plus enough provenance to report diagnostics and
/// walk instantiation liveness.
#[derive(Debug)]
pub struct DynConstraint {
    pub kind: ConstraintKind,
    pub module: ModuleId,
    pub span: Span,
    /// The instantiation whose body created this constraint.
    pub owner: (FuncId, InstId),
}
