//! The `molt` binary.
//!
//! Loads a serialized syntax tree, runs whole-program type inference, prints
//! the collected diagnostics, and writes the typed program for the code
//! generator. Refuses to write output when any error-severity diagnostic
//! exists.

mod args;

use anyhow::{Context as _, Result};
use args::CliArgs;
use clap::Parser;
use colored::Colorize;
use molt_ast::Program;
use molt_common::{AnalysisOptions, IntWidth, Severity};
use molt_infer::analyze;
use std::fs;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &CliArgs) {
    let filter = if args.silent {
        EnvFilter::new("warn")
    } else {
        match args.debug {
            Some(level) if level >= 3 => EnvFilter::new("debug,molt_infer::ifa=trace"),
            Some(level) if level >= 1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("info"),
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args);

    let options = AnalysisOptions {
        integer_width: if args.long { IntWidth::I64 } else { IntWidth::I32 },
        assume_bounds_checked: args.nobounds,
        assertions_enabled: !args.noassert,
    };

    let text = fs::read_to_string(&args.tree)
        .with_context(|| format!("cannot read `{}`", args.tree.display()))?;
    let program: Program = serde_json::from_str(&text)
        .with_context(|| format!("`{}` is not a serialized syntax tree", args.tree.display()))?;

    let started = Instant::now();
    let analysis = analyze(program, options);

    for diagnostic in &analysis.diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!(
            "{label}: {} [{}:{}..{}]",
            diagnostic.message, diagnostic.module, diagnostic.span.start, diagnostic.span.end
        );
    }

    if analysis.has_errors() {
        println!(
            "{}",
            format!("{} problem(s), no output written", analysis.diagnostics.len()).red()
        );
        std::process::exit(1);
    }

    let stem = args
        .tree
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_string());
    let out_dir = args.outputdir.unwrap_or_else(|| ".".into());
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("cannot create `{}`", out_dir.display()))?;
    let out_path = out_dir.join(format!("{stem}.typed.json"));
    let json = serde_json::to_string_pretty(&analysis.typed)?;
    fs::write(&out_path, json)
        .with_context(|| format!("cannot write `{}`", out_path.display()))?;

    let stats = analysis.stats;
    tracing::info!(
        rounds = stats.rounds,
        instantiations = stats.instantiations,
        splits = stats.splits,
        nodes = stats.nodes,
        "analysis complete"
    );
    println!(
        "wrote {} [elapsed time: {:.2} seconds]",
        out_path.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
