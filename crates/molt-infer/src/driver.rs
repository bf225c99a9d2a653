//! The analysis driver.
//!
//! Owns the outer loop: build the graph, alternate propagation and
//! specialization to an inner fixed point, run iterative flow analysis, and
//! repeat until no allocation site splits. Fatal diagnostics (unsupported
//! constructs, iteration caps) stop the loop at the next phase boundary;
//! everything else is collected and reported together.

use crate::ifa::run_ifa;
use crate::output::{TypedProgram, typed_program};
use crate::propagate::propagate;
use crate::specialize::specialize;
use crate::validate::validate;
use molt_ast::Program;
use molt_common::limits::MAX_ANALYSIS_ROUNDS;
use molt_common::{AnalysisOptions, Diagnostic, DiagnosticKind};
use molt_graph::{Context, GraphBuilder};
use tracing::{debug, info_span};

/// Counters describing one analysis run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    pub rounds: u32,
    pub nodes: usize,
    pub edges: usize,
    pub sites: usize,
    pub instantiations: usize,
    pub splits: usize,
}

/// The result of one analysis run.
#[derive(Debug)]
pub struct Analysis {
    pub typed: TypedProgram,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: AnalysisStats,
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == molt_common::Severity::Error)
    }
}

/// Run whole-program type inference over a parsed program.
///
/// Pure: same tree and options produce the same typed program and the same
/// diagnostics, regardless of internal processing order.
pub fn analyze(program: Program, options: AnalysisOptions) -> Analysis {
    let span = info_span!("analyze");
    let _guard = span.enter();

    let mut ctx = Context::new(program, options);
    let mut stats = AnalysisStats::default();

    if !ctx.diags.is_fatal() {
        GraphBuilder::new(&mut ctx).build_top_levels();
        run_to_fixed_point(&mut ctx, &mut stats);
    }

    if !ctx.diags.is_fatal() {
        let live = validate(&mut ctx);
        stats.nodes = ctx.graph.node_count();
        stats.edges = ctx.graph.edge_count();
        stats.sites = ctx.graph.site_count();
        stats.instantiations = ctx.program.instantiation_count();
        let typed = typed_program(&ctx, &live);
        let diagnostics = ctx.diags.into_sorted();
        return Analysis {
            typed,
            diagnostics,
            stats,
        };
    }

    stats.nodes = ctx.graph.node_count();
    stats.edges = ctx.graph.edge_count();
    stats.sites = ctx.graph.site_count();
    stats.instantiations = ctx.program.instantiation_count();
    Analysis {
        typed: TypedProgram::default(),
        diagnostics: ctx.diags.into_sorted(),
        stats,
    }
}

fn run_to_fixed_point(ctx: &mut Context, stats: &mut AnalysisStats) {
    loop {
        stats.rounds += 1;
        if stats.rounds > MAX_ANALYSIS_ROUNDS {
            let entry = molt_graph::ModuleId(0);
            ctx.error(
                DiagnosticKind::IterationCapExceeded,
                entry,
                molt_common::Span::dummy(),
                format!("analysis did not converge within {MAX_ANALYSIS_ROUNDS} rounds"),
            );
            return;
        }

        // Inner fixed point: propagate, then expand whatever became
        // expandable, until neither reports change.
        loop {
            let outcome = propagate(ctx);
            if outcome.capped {
                let entry = molt_graph::ModuleId(0);
                ctx.error(
                    DiagnosticKind::IterationCapExceeded,
                    entry,
                    molt_common::Span::dummy(),
                    "propagation exceeded its step limit",
                );
                return;
            }
            if ctx.diags.is_fatal() {
                return;
            }
            if !specialize(ctx) {
                break;
            }
        }
        if ctx.diags.is_fatal() {
            return;
        }

        let splits = run_ifa(ctx);
        debug!(round = stats.rounds, splits, "analysis round complete");
        if splits == 0 {
            return;
        }
        stats.splits += splits;
        ctx.graph.reset_to_seeds();
    }
}
