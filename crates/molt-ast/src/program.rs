//! A whole program: the entry module and its transitive imports.

use crate::build::ModuleBuilder;
use crate::node::{AstArena, NodeId};
use molt_common::{Atom, Interner};
use serde::{Deserialize, Serialize};

/// One module's parsed tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleAst {
    pub name: Atom,
    pub arena: AstArena,
    /// Top-level statements in source order.
    pub body: Vec<NodeId>,
}

/// The input to the analysis core: every reachable module plus the shared
/// interner their atoms point into. The entry module is `modules[0]`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub interner: Interner,
    pub modules: Vec<ModuleAst>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a module; `finish()` appends it to the program.
    pub fn module(&mut self, name: &str) -> ModuleBuilder<'_> {
        ModuleBuilder::new(self, name)
    }

    pub fn module_named(&self, name: &str) -> Option<&ModuleAst> {
        let atom = self.interner.get(name)?;
        self.modules.iter().find(|m| m.name == atom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_round_trips_through_json() {
        let mut program = Program::new();
        let mut m = program.module("main");
        let one = m.int(1);
        let x = m.assign_name("x", one);
        m.stmt(x);
        m.finish();

        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(back.modules.len(), 1);
        let module = back.module_named("main").unwrap();
        assert_eq!(module.body.len(), 1);
        assert_eq!(module.arena.len(), program.modules[0].arena.len());
    }
}
