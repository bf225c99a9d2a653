//! Whole-program type inference for the molt compiler.
//!
//! The driver orchestrates the analysis to a global fixed point:
//!
//! ```text
//! build graph
//! repeat:
//!     propagate          (work-list solver over the constraint graph)
//!     specialize         (instantiate functions per new call signature)
//! until neither changes
//! split = iterative flow analysis
//! if split: reset to seeds, repeat
//! validate, hand the typed program to the emitter
//! ```
//!
//! This crate provides:
//! - `propagate` - the monotone fixed-point solver
//! - `specialize` - call-signature driven instantiation and class-directed
//!   dispatch expansion
//! - `ifa` - iterative flow analysis: splitting of over-merged allocation
//!   sites to restore container element precision
//! - `validate` - completeness and conflict checks over the solved graph
//! - `analyze` - the driver; returns the typed program and diagnostics

pub mod driver;
pub mod ifa;
pub mod output;
pub mod propagate;
pub mod specialize;
pub mod validate;

pub use driver::{Analysis, AnalysisStats, analyze};
pub use output::{TypedClass, TypedFunction, TypedInstantiation, TypedModule, TypedProgram};
