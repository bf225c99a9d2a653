//! Common types and utilities for the molt compiler front end.
//!
//! This crate provides foundational types used across all molt crates:
//! - String interning (`Atom`, `Interner`)
//! - Source spans (`Span`)
//! - Diagnostics (`Diagnostic`, `DiagnosticSink`)
//! - Centralized limits and thresholds
//! - Analysis configuration (`AnalysisOptions`)

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Span - source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Collected analysis diagnostics
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};

// Centralized limits and thresholds
pub mod limits;

// Analysis configuration
pub mod options;
pub use options::{AnalysisOptions, IntWidth};
