//! The analysis context: everything one run owns.
//!
//! Created at driver entry, dropped at driver exit. All components reach the
//! class registry, the graph, the program model, and the diagnostics through
//! this one struct; nothing analysis-scoped is process-global.

use crate::builder::GraphBuilder;
use crate::graph::Graph;
use crate::program::{ModuleId, ProgramModel};
use molt_ast::Program;
use molt_common::{
    AnalysisOptions, Atom, Diagnostic, DiagnosticKind, DiagnosticSink, Interner, Span,
};
use molt_types::{ClassId, ClassRegistry};

/// Frequently used interned names, resolved once at context creation.
#[derive(Clone, Copy, Debug)]
pub struct KnownAtoms {
    pub init: Atom,
    pub getitem: Atom,
    pub setitem: Atom,
    pub next: Atom,
}

pub struct Context {
    pub interner: Interner,
    pub registry: ClassRegistry,
    pub options: AnalysisOptions,
    pub graph: Graph,
    pub program: ProgramModel,
    pub diags: DiagnosticSink,
    pub atoms: KnownAtoms,
}

impl Context {
    /// Build a context from a parsed program: installs the built-in class
    /// registry and runs the declaration pass over every module. Bodies are
    /// not walked yet; the driver does that next.
    pub fn new(program: Program, options: AnalysisOptions) -> Self {
        let Program {
            mut interner,
            modules,
        } = program;
        let registry = ClassRegistry::new(&mut interner);
        let atoms = KnownAtoms {
            init: interner.intern("__init__"),
            getitem: interner.intern("__getitem__"),
            setitem: interner.intern("__setitem__"),
            next: interner.intern("__next__"),
        };
        let mut ctx = Context {
            interner,
            registry,
            options,
            graph: Graph::new(),
            program: ProgramModel::default(),
            diags: DiagnosticSink::new(),
            atoms,
        };
        GraphBuilder::new(&mut ctx).declare_modules(modules);
        ctx
    }

    pub fn atom(&mut self, s: &str) -> Atom {
        self.interner.intern(s)
    }

    pub fn module_name(&self, module: ModuleId) -> &str {
        self.interner
            .resolve(self.program.modules[module.index()].name)
    }

    pub fn class_name(&self, class: ClassId) -> &str {
        self.registry.name(&self.interner, class)
    }

    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        module: ModuleId,
        span: Span,
        message: impl Into<String>,
    ) {
        let name = self.module_name(module).to_string();
        self.diags.push(Diagnostic::error(kind, name, span, message));
    }

    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        module: ModuleId,
        span: Span,
        message: impl Into<String>,
    ) {
        let name = self.module_name(module).to_string();
        self.diags
            .push(Diagnostic::warning(kind, name, span, message));
    }
}
