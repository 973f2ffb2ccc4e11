//! Element: declaration compiler and instruction-graph evaluator.
//!
//! Pipeline:
//!
//! ```text
//! resolved declarations (Program) → compile → [InstrGraph + root InstrId]
//!   → evaluate(inputs) → outputs
//! ```
//!
//! Modules:
//! 1. `scope`   — declarations, ports, constraints, resolved body expressions
//! 2. `stdlib`  — intrinsic prelude (`Num`, `Bool`, `if`, `for`, `iterate`, `select`)
//! 3. `ir`      — interned instruction graph and its text printer
//! 4. `compile` — lowers declarations into the graph
//! 5. `interp`  — evaluates a graph against a flat boundary vector

pub mod compile;
pub mod error;
pub mod interp;
pub mod ir;
pub mod scope;
pub mod stdlib;

pub use compile::{compile, BoundaryPort, Compiled, CompilerOptions, DesiredResult, Value};
pub use error::{CompileError, Error, EvalError};
pub use interp::{evaluate, evaluate_with, EvalOptions};
pub use ir::{InstrGraph, InstrId};
pub use scope::{Constraint, DeclId, Expr, Port, Program, ProgramBuilder};

/// One compilation unit: a program and the graph its declarations are
/// compiled into.
///
/// Every declaration compiled through the same context shares one interning
/// cache, so common sub-expressions are emitted once.
pub struct Context<'p> {
    program: &'p Program,
    graph: InstrGraph,
}

impl<'p> Context<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            graph: InstrGraph::new(),
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn graph(&self) -> &InstrGraph {
        &self.graph
    }

    pub fn compile(&mut self, decl: DeclId, options: &CompilerOptions) -> Result<Compiled, Error> {
        Ok(compile::compile(self.program, &mut self.graph, decl, options)?)
    }

    /// Compiles the declaration at dotted path `name` from the global namespace.
    pub fn compile_named(&mut self, name: &str, options: &CompilerOptions) -> Result<Compiled, Error> {
        let decl = self
            .program
            .lookup(self.program.root(), name, false)
            .ok_or_else(|| CompileError::UndefinedIdentifier {
                name: name.into(),
                scope: "<root>".into(),
            })?;
        self.compile(decl, options)
    }

    /// Evaluates a compiled instruction result. Non-instruction results
    /// (callables, records holding functions, scopes) cannot be evaluated.
    pub fn evaluate(&self, compiled: &Compiled, inputs: &[f32], output_arity: usize) -> Result<Vec<f32>, Error> {
        self.evaluate_with(compiled, inputs, output_arity, &EvalOptions::default())
    }

    pub fn evaluate_with(
        &self,
        compiled: &Compiled,
        inputs: &[f32],
        output_arity: usize,
        options: &EvalOptions,
    ) -> Result<Vec<f32>, Error> {
        let root = compiled.instruction().ok_or_else(|| CompileError::NotAnInstruction {
            detail: format!("the result of '{}'", self.program.qualified_name(compiled.decl)),
        })?;
        Ok(interp::evaluate_with(&self.graph, root, inputs, output_arity, options)?)
    }

    /// Text dump of the graph reachable from a compiled instruction result.
    pub fn emit_text(&self, compiled: &Compiled) -> Option<String> {
        let root = compiled.instruction()?;
        ir::printer::emit_graph_text(&self.graph, root).ok()
    }
}
