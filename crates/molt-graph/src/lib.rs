//! Constraint graph construction for the molt compiler.
//!
//! This crate turns parsed module trees into the data-flow constraint graph
//! the solver runs over:
//! - `Graph` - arena of constraint nodes, typed edges, and allocation sites
//! - `ProgramModel` - modules, functions, instantiations, methods,
//!   attribute slots, and the dynamic constraints resolved during solving
//! - `GraphBuilder` - the tree walk that produces nodes and edges, both for
//!   module top levels and for each function instantiation
//! - `Context` - everything one analysis run owns, created at driver entry
//!
//! The graph is freely cyclic; nodes are addressed by stable `CnId` indices
//! and edges are `(src, dst, transform)` triples, so no pointer cycles
//! exist anywhere.

pub mod builder;
#[cfg(test)]
mod builder_tests;
pub mod constraints;
pub mod context;
pub mod graph;
pub mod program;
pub mod scan;

pub use builder::GraphBuilder;
pub use constraints::{ConstraintKind, DynConstraint, ExcTargets};
pub use context::Context;
pub use graph::{CnFlags, CnId, CnOrigin, Edge, Graph, SiteData, Transform};
pub use program::{
    ArgClasses, Binding, FuncData, FuncId, InstId, Instantiation, ModuleData, ModuleId,
    ProgramModel, Signature,
};
