//! Centralized limits and thresholds for the analysis.
//!
//! These values guard against pathological non-convergence and runaway
//! specialization. Centralizing them prevents duplicate definitions with
//! inconsistent values and documents what each bound protects.

/// Maximum number of outer driver rounds (propagate → specialize → split).
///
/// Each round either reaches a fixed point or strictly refines the
/// allocation-site partition, so convergence is guaranteed in theory; the cap
/// exists so a bug in the split criterion surfaces as a fatal diagnostic
/// instead of a hang.
pub const MAX_ANALYSIS_ROUNDS: u32 = 30;

/// Maximum number of instantiations of a single function.
///
/// One instantiation exists per distinct tuple of argument classes, so this
/// bound is only reachable when argument class sets keep growing round over
/// round. Hitting it is reported as non-convergence.
pub const MAX_INSTANTIATIONS_PER_FUNCTION: usize = 1024;

/// Maximum number of work-list steps for a single propagation pass.
///
/// The lattice is finite and growth is monotone, so the solver terminates;
/// this is a backstop far above any real program's step count.
pub const MAX_PROPAGATION_STEPS: usize = 50_000_000;

/// Maximum number of splits applied to descendants of one allocation site.
///
/// A site can be split, and its splits split again, when nested confluences
/// resolve one layer at a time. Deeper chains than this mean the partition
/// criterion is oscillating.
pub const MAX_SPLIT_DEPTH: u32 = 16;

/// Depth cap when rendering a type for output or diagnostics.
///
/// Containers can reach themselves (a list stored inside itself), so the
/// renderer stops descending here.
pub const MAX_TYPE_RENDER_DEPTH: u32 = 8;
