//! The program model: modules, functions, and their instantiations.
//!
//! A function has one [`Instantiation`] per distinct call signature observed
//! anywhere in the program. The signature abstracts each argument's type set
//! to the set of *root classes* (the topmost base of each class), so sibling
//! subclasses of a shared user-defined base flow into one instantiation and
//! dispatch stays set-based, while unrelated classes (int vs. str) get
//! separate monomorphic copies.

use crate::constraints::DynConstraint;
use crate::graph::CnId;
use indexmap::IndexMap;
use molt_ast::{ModuleAst, NodeId, Param};
use molt_common::{Atom, Span};
use molt_types::{ClassId, SiteId};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

impl FuncId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub u32);

impl InstId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Sorted, deduplicated root classes of one argument position.
pub type ArgClasses = SmallVec<[ClassId; 2]>;

/// One call signature: root classes per provided argument.
pub type Signature = Vec<ArgClasses>;

/// What a top-level name in a module resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    /// A module-level variable.
    Global(CnId),
    Func(FuncId),
    Class(ClassId),
    Module(ModuleId),
}

#[derive(Debug)]
pub struct ModuleData {
    pub name: Atom,
    pub ast: Arc<ModuleAst>,
    pub bindings: FxHashMap<Atom, Binding>,
    /// Synthetic function holding the module's top-level statements.
    pub top_func: FuncId,
}

/// One specialized copy of a function body.
#[derive(Debug)]
pub struct Instantiation {
    pub sig: Signature,
    pub formals: Vec<CnId>,
    pub ret: CnId,
    pub exc_out: CnId,
    pub locals: FxHashMap<Atom, CnId>,
    /// Constraint node of every expression in this instantiation.
    pub exprs: FxHashMap<NodeId, CnId>,
    /// For generator functions: the allocation site of the generator object
    /// returned by calls, and the synthetic node seeded with it.
    pub gen_site: Option<SiteId>,
    pub gen_object: Option<CnId>,
}

#[derive(Debug)]
pub struct FuncData {
    pub name: Atom,
    pub module: ModuleId,
    /// The class this function is a method of, if any.
    pub owner: Option<ClassId>,
    pub params: Vec<Param>,
    /// Default-value nodes, built once in the defining scope.
    pub default_nodes: Vec<Option<CnId>>,
    pub body: Vec<NodeId>,
    pub span: Span,
    pub is_generator: bool,
    /// True for the synthetic per-module top-level function.
    pub is_top_level: bool,
    pub insts: Vec<Instantiation>,
    pub inst_by_sig: FxHashMap<Signature, InstId>,
}

impl FuncData {
    pub fn inst(&self, id: InstId) -> &Instantiation {
        &self.insts[id.index()]
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instantiation {
        &mut self.insts[id.index()]
    }

    pub fn inst_ids(&self) -> impl Iterator<Item = InstId> {
        (0..self.insts.len() as u32).map(InstId)
    }
}

/// Everything the builder and solver know about the program, apart from the
/// node arena itself.
#[derive(Debug, Default)]
pub struct ProgramModel {
    pub modules: Vec<ModuleData>,
    pub funcs: Vec<FuncData>,
    /// Method tables of user-defined classes.
    pub methods: FxHashMap<(ClassId, Atom), FuncId>,
    /// Attribute names each user-defined class declares (class-body
    /// assignments plus `self.x = ...` in its own methods).
    pub declared_attrs: FxHashMap<ClassId, FxHashSet<Atom>>,
    /// Attribute constraint nodes, created on demand per (class, name).
    /// Insertion-ordered so attribute diagnostics and output are stable.
    pub attr_nodes: IndexMap<(ClassId, Atom), CnId>,
    /// Dynamic constraints: call sites, attribute accesses, iteration, and
    /// class-directed built-in operations, expanded as type sets grow.
    pub constraints: Vec<DynConstraint>,
}

impl ProgramModel {
    pub fn func(&self, id: FuncId) -> &FuncData {
        &self.funcs[id.index()]
    }

    pub fn func_mut(&mut self, id: FuncId) -> &mut FuncData {
        &mut self.funcs[id.index()]
    }

    pub fn module(&self, id: ModuleId) -> &ModuleData {
        &self.modules[id.index()]
    }

    pub fn func_ids(&self) -> impl Iterator<Item = FuncId> {
        (0..self.funcs.len() as u32).map(FuncId)
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> {
        (0..self.modules.len() as u32).map(ModuleId)
    }

    /// Resolve `name` on `class` through the MRO; returns the defining
    /// class's method.
    pub fn resolve_method(
        &self,
        registry: &molt_types::ClassRegistry,
        class: ClassId,
        name: Atom,
    ) -> Option<FuncId> {
        registry
            .mro(class)
            .find_map(|c| self.methods.get(&(c, name)).copied())
    }

    /// The class in `class`'s MRO that declares attribute `name`, defaulting
    /// to the class itself when nothing in the MRO declares it.
    pub fn attr_owner(
        &self,
        registry: &molt_types::ClassRegistry,
        class: ClassId,
        name: Atom,
    ) -> Option<ClassId> {
        registry
            .mro(class)
            .find(|c| self.declared_attrs.get(c).is_some_and(|s| s.contains(&name)))
    }

    pub fn instantiation_count(&self) -> usize {
        self.funcs.iter().map(|f| f.insts.len()).sum()
    }
}
