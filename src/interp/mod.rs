//! Instruction-graph evaluator.
//!
//! Walks the graph from a root node, memoising every node's flattened value
//! for the duration of one call. Nodes that read a loop's state are memoised
//! in that loop iteration's frame instead and dropped when the iteration ends.

pub mod ops;

pub use ops::resolve_index;

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, instrument, trace};

use crate::error::EvalError;
use crate::ir::graph::InstrGraph;
use crate::ir::instr::{InstrId, Instruction, BOUNDARY_SCOPE};

use ops::{eval_binary, eval_nullary, eval_unary, truthy};

/// Knobs for a single evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalOptions {
    /// Total `for` iterations allowed across the whole evaluation. `None`
    /// lets loops run until their condition fails.
    pub max_iterations: Option<u64>,
}

/// Evaluates `root` against the boundary vector `inputs`, returning its
/// flattened value.
///
/// Fails with `OutputTooSmall` if the root's size exceeds `output_arity`.
pub fn evaluate(
    graph: &InstrGraph,
    root: InstrId,
    inputs: &[f32],
    output_arity: usize,
) -> Result<Vec<f32>, EvalError> {
    evaluate_with(graph, root, inputs, output_arity, &EvalOptions::default())
}

/// Like [`evaluate`] with explicit options.
#[instrument(skip(graph, inputs, options), fields(root = %root, inputs = inputs.len()))]
pub fn evaluate_with(
    graph: &InstrGraph,
    root: InstrId,
    inputs: &[f32],
    output_arity: usize,
    options: &EvalOptions,
) -> Result<Vec<f32>, EvalError> {
    let required = graph.node(root).ok_or(EvalError::UnknownInstruction { id: root.0 })?.shape.size();
    if output_arity < required {
        return Err(EvalError::OutputTooSmall {
            required,
            capacity: output_arity,
        });
    }

    let mut evaluator = Evaluator::new(graph, inputs, options);
    let value = evaluator.eval(root)?;
    debug!(
        cached = evaluator.cache.len(),
        iterations = evaluator.iterations,
        "evaluated"
    );
    Ok(value.to_vec())
}

// ---------------------------------------------------------------------------
// Evaluator state
// ---------------------------------------------------------------------------

type Slots = Rc<[f32]>;

fn scalar(x: f32) -> Slots {
    Rc::from(vec![x])
}

/// The state of one active loop iteration.
struct LoopFrame {
    scope: u32,
    state: Slots,
    cache: HashMap<InstrId, Slots>,
}

struct Evaluator<'a> {
    graph: &'a InstrGraph,
    inputs: &'a [f32],
    /// Values of nodes that do not read any loop state.
    cache: HashMap<InstrId, Slots>,
    frames: Vec<LoopFrame>,
    max_iterations: Option<u64>,
    iterations: u64,
}

impl<'a> Evaluator<'a> {
    fn new(graph: &'a InstrGraph, inputs: &'a [f32], options: &EvalOptions) -> Self {
        Self {
            graph,
            inputs,
            cache: HashMap::new(),
            frames: Vec::new(),
            max_iterations: options.max_iterations,
            iterations: 0,
        }
    }

    fn eval(&mut self, id: InstrId) -> Result<Slots, EvalError> {
        let graph = self.graph;
        let node = graph.node(id).ok_or(EvalError::UnknownInstruction { id: id.0 })?;

        // Innermost active frame among the loops this node reads.
        let frame = if node.free_scopes.is_empty() {
            None
        } else {
            self.frames.iter().rposition(|f| node.free_scopes.contains(&f.scope))
        };
        let cached = match frame {
            None => self.cache.get(&id),
            Some(i) => self.frames[i].cache.get(&id),
        };
        if let Some(value) = cached {
            return Ok(value.clone());
        }

        let value = self.compute(&node.instr)?;
        match frame {
            None => self.cache.insert(id, value.clone()),
            Some(i) => self.frames[i].cache.insert(id, value.clone()),
        };
        Ok(value)
    }

    fn eval_scalar(&mut self, id: InstrId) -> Result<f32, EvalError> {
        self.eval(id)?.first().copied().ok_or(EvalError::UnknownInstruction { id: id.0 })
    }

    fn compute(&mut self, instr: &'a Instruction) -> Result<Slots, EvalError> {
        match instr {
            Instruction::Constant(v) => Ok(scalar(*v)),
            Instruction::Input { scope, index } if *scope == BOUNDARY_SCOPE => {
                let index = *index as usize;
                self.inputs.get(index).copied().map(scalar).ok_or(EvalError::InputOutOfRange {
                    index,
                    len: self.inputs.len(),
                })
            }
            Instruction::Input { scope, index } => self
                .frames
                .iter()
                .rev()
                .find(|f| f.scope == *scope)
                .and_then(|f| f.state.get(*index as usize).copied())
                .map(scalar)
                .ok_or(EvalError::UnboundPlaceholder { scope: *scope }),
            Instruction::Structure { fields, .. } => {
                let mut out = Vec::new();
                for (_, field) in fields {
                    out.extend_from_slice(&self.eval(*field)?);
                }
                Ok(Rc::from(out))
            }
            Instruction::Nullary(op) => Ok(scalar(eval_nullary(*op))),
            Instruction::Unary(op, x) => {
                let x = self.eval_scalar(*x)?;
                Ok(scalar(eval_unary(*op, x)))
            }
            Instruction::Binary(op, a, b) => {
                let a = self.eval_scalar(*a)?;
                let b = self.eval_scalar(*b)?;
                Ok(scalar(eval_binary(*op, a, b)))
            }
            Instruction::If {
                predicate,
                when_true,
                when_false,
            } => {
                if truthy(self.eval_scalar(*predicate)?) {
                    self.eval(*when_true)
                } else {
                    self.eval(*when_false)
                }
            }
            Instruction::For {
                initial,
                condition,
                body,
                scope,
            } => self.run_loop(*initial, *condition, *body, *scope, None),
            Instruction::Select { selector, options } => {
                let index = resolve_index(self.eval_scalar(*selector)?, options.len());
                let chosen = options.get(index).copied().ok_or(EvalError::UnknownInstruction { id: selector.0 })?;
                self.eval(chosen)
            }
            Instruction::Indexer { for_loop, iteration } => {
                let Some(Instruction::For {
                    initial,
                    condition,
                    body,
                    scope,
                }) = self.graph.instruction(*for_loop)
                else {
                    return Err(EvalError::UnknownInstruction { id: for_loop.0 });
                };
                let steps = resolve_index(self.eval_scalar(*iteration)?, usize::MAX);
                self.run_loop(*initial, *condition, *body, *scope, Some(steps))
            }
            Instruction::Project { record, offset, size } => {
                let value = self.eval(*record)?;
                let start = *offset as usize;
                value
                    .get(start..start + *size as usize)
                    .map(Rc::from)
                    .ok_or(EvalError::UnknownInstruction { id: record.0 })
            }
        }
    }

    /// Runs a loop from `initial` until `condition` fails or `limit` steps
    /// have been taken.
    fn run_loop(
        &mut self,
        initial: InstrId,
        condition: InstrId,
        body: InstrId,
        scope: u32,
        limit: Option<usize>,
    ) -> Result<Slots, EvalError> {
        let mut state = self.eval(initial)?;
        let mut step = 0usize;
        while limit.map_or(true, |n| step < n) {
            self.frames.push(LoopFrame {
                scope,
                state: state.clone(),
                cache: HashMap::new(),
            });
            let next = self.step(condition, body);
            self.frames.pop();
            match next? {
                Some(next) => state = next,
                None => break,
            }
            step += 1;
            trace!(scope, step, "loop iteration");
        }
        Ok(state)
    }

    /// One iteration in the current frame: `None` once the condition fails.
    fn step(&mut self, condition: InstrId, body: InstrId) -> Result<Option<Slots>, EvalError> {
        if !truthy(self.eval_scalar(condition)?) {
            return Ok(None);
        }
        self.iterations += 1;
        if let Some(limit) = self.max_iterations {
            if self.iterations > limit {
                return Err(EvalError::IterationLimit { limit });
            }
        }
        self.eval(body).map(Some)
    }
}
