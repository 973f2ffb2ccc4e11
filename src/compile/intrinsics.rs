//! Intrinsic declarations and their lowering to graph constructors.

use crate::error::CompileError;
use crate::ir::graph::InstrGraph;
use crate::ir::instr::{BinaryOp, InstrId, NullaryOp, UnaryOp};
use crate::scope::DeclId;

use super::boundary::bind_slots;
use super::value::Value;
use super::Compiler;

/// The built-in behaviour attached to a prelude declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `Num` and `Bool`: type scopes, not callable.
    Type,
    Nullary(NullaryOp),
    Unary(UnaryOp),
    Binary(BinaryOp),
    If,
    For,
    /// `iterate(initial, condition, body, iteration)`: the loop state after
    /// at most `iteration` steps.
    Iterate,
    Select,
}

impl Intrinsic {
    pub fn is_variadic(self) -> bool {
        matches!(self, Intrinsic::Select)
    }
}

pub(crate) fn compile_intrinsic(
    c: &mut Compiler<'_, '_>,
    decl: DeclId,
    intrinsic: Intrinsic,
    args: Vec<Value>,
) -> Result<Value, CompileError> {
    let id = match intrinsic {
        Intrinsic::Type => {
            return Err(CompileError::NotCallable {
                what: c.program.qualified_name(decl),
            })
        }
        Intrinsic::Nullary(op) => {
            take::<0>(c, decl, args)?;
            c.graph.nullary(op)
        }
        Intrinsic::Unary(op) => {
            let [a] = take(c, decl, args)?;
            let a = c.to_instruction(a)?;
            c.graph.unary(op, a)?
        }
        Intrinsic::Binary(op) => {
            let [a, b] = take(c, decl, args)?;
            let a = c.to_instruction(a)?;
            let b = c.to_instruction(b)?;
            c.graph.binary(op, a, b)?
        }
        Intrinsic::If => {
            let [predicate, when_true, when_false] = take(c, decl, args)?;
            let predicate = c.to_instruction(predicate)?;
            let when_true = c.to_instruction(when_true)?;
            let when_false = c.to_instruction(when_false)?;
            c.graph.if_else(predicate, when_true, when_false)?
        }
        Intrinsic::For => {
            let [initial, condition, body] = take(c, decl, args)?;
            build_loop(c, initial, condition, body)?
        }
        Intrinsic::Iterate => {
            let [initial, condition, body, iteration] = take(c, decl, args)?;
            let for_loop = build_loop(c, initial, condition, body)?;
            let iteration = c.to_instruction(iteration)?;
            c.graph.indexer(for_loop, iteration)?
        }
        Intrinsic::Select => {
            let mut args = args.into_iter();
            let selector = match args.next() {
                Some(selector) => c.to_instruction(selector)?,
                None => {
                    return Err(CompileError::ArgumentCount {
                        callee: c.program.qualified_name(decl),
                        expected: 2,
                        found: 0,
                    })
                }
            };
            let options = args.map(|a| c.to_instruction(a)).collect::<Result<Vec<_>, _>>()?;
            c.graph.select(selector, options)?
        }
    };
    Ok(Value::Instruction(id))
}

/// Compiles `condition` and `body` against a placeholder of the initial
/// state's shape and builds the `for` node over them.
fn build_loop(
    c: &mut Compiler<'_, '_>,
    initial: Value,
    condition: Value,
    body: Value,
) -> Result<InstrId, CompileError> {
    let initial = c.to_instruction(initial)?;
    let shape = c
        .graph
        .shape(initial)
        .cloned()
        .ok_or_else(|| CompileError::Unsupported {
            detail: format!("loop state {} is not part of this graph", initial),
        })?;
    let scope = InstrGraph::loop_scope(c.loop_depth);
    let state = bind_slots(c.graph, scope, &shape, &mut 0);

    c.loop_depth += 1;
    let parts = loop_parts(c, state, condition, body);
    c.loop_depth -= 1;
    let (condition, body) = parts?;
    c.graph.for_loop(initial, condition, body, scope)
}

fn loop_parts(
    c: &mut Compiler<'_, '_>,
    state: InstrId,
    condition: Value,
    body: Value,
) -> Result<(InstrId, InstrId), CompileError> {
    let condition = c.apply(condition, vec![Value::Instruction(state)])?;
    let condition = c.to_instruction(condition)?;
    let body = c.apply(body, vec![Value::Instruction(state)])?;
    let body = c.to_instruction(body)?;
    Ok((condition, body))
}

fn take<const N: usize>(
    c: &Compiler<'_, '_>,
    decl: DeclId,
    args: Vec<Value>,
) -> Result<[Value; N], CompileError> {
    let found = args.len();
    <[Value; N]>::try_from(args).map_err(|_| CompileError::ArgumentCount {
        callee: c.program.qualified_name(decl),
        expected: N,
        found,
    })
}
