//! Parsed syntax tree data model for the molt compiler.
//!
//! Parsing happens outside this workspace; the external parser hands the
//! analysis a [`Program`]: one [`ModuleAst`] per reachable module, each an
//! arena of [`Node`]s addressed by [`NodeId`]. The whole tree round-trips
//! through serde so a front end in another process can ship it as JSON.
//!
//! This crate provides:
//! - `Node` / `NodeKind` - node kinds covering the analyzable subset
//! - `AstArena` - flat node storage addressed by `NodeId`
//! - `ModuleAst` / `Program` - per-module trees plus the shared interner
//! - `ModuleBuilder` - programmatic construction, used by front-end glue
//!   and by the test suites

pub mod build;
pub mod node;
pub mod program;

pub use build::ModuleBuilder;
pub use node::{
    AstArena, BinaryOp, BoolOpKind, CompKind, CompareOp, ExceptHandler, Node, NodeId, NodeKind,
    Param, UnaryOp,
};
pub use program::{ModuleAst, Program};
