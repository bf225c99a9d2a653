//! Type lattice and class registry for the molt compiler.
//!
//! This crate provides:
//! - `ClassRegistry` - user-defined and built-in classes, base lists, MRO,
//!   type-parameter arity
//! - `Ty` / `TypeSet` - concrete types parameterized by allocation-site
//!   identity, and the monotone sets the solver grows
//! - the built-in method signature table the graph builder consults when a
//!   receiver is a built-in class
//!
//! A concrete type is a `(class, allocation site)` pair. Element types are
//! not stored inline: every allocation site owns one element constraint node
//! per type parameter (those nodes live in the graph crate), so two sites of
//! the same container class with different element sets are distinct concrete
//! types by construction. That identity is what keeps container inference
//! precise.

pub mod builtins;
pub mod registry;
pub mod ty;
pub mod type_set;

pub use builtins::{Builtin, Effect, FreeFunc, MethodSig, SigResult, free_func, method_sig};
pub use registry::{Arity, ClassData, ClassId, ClassRegistry};
pub use ty::{SiteId, Ty};
pub use type_set::TypeSet;
