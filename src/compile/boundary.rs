//! Boundary layout: mapping entry-point ports onto the flat input vector.
//!
//! Ports are laid out in declaration order; each contributes as many
//! consecutive slots as its shape's scalar size. The same slot binding is
//! used for `for` loop state placeholders, with the loop's scope instead of
//! the boundary scope.

use crate::error::CompileError;
use crate::ir::graph::InstrGraph;
use crate::ir::instr::{InstrId, BOUNDARY_SCOPE};
use crate::ir::shape::Shape;
use crate::scope::{Constraint, DeclId, Program};

use super::value::Value;

/// One entry-point port as it appears in the boundary input vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryPort {
    pub name: String,
    /// First slot of the port.
    pub offset: usize,
    pub size: usize,
}

/// The concrete shape of values satisfying `constraint`, if it has one.
pub(crate) fn shape_of_constraint(program: &Program, constraint: &Constraint) -> Option<Shape> {
    // Rejects self-containing structs before recursing.
    program.constraint_size(constraint)?;
    match constraint {
        Constraint::Num => Some(Shape::Num),
        Constraint::Bool => Some(Shape::Bool),
        Constraint::Struct(id) => {
            let decl = program.decl(*id);
            let fields = decl
                .inputs
                .iter()
                .map(|p| Some((p.name.clone(), shape_of_constraint(program, &p.constraint)?)))
                .collect::<Option<Vec<_>>>()?;
            Some(Shape::record(Some(*id), decl.name.clone(), fields))
        }
        Constraint::Any | Constraint::Signature(_) => None,
    }
}

/// Builds a value of `shape` reading consecutive slots of `scope`, starting
/// at `*next`.
pub(crate) fn bind_slots(graph: &mut InstrGraph, scope: u32, shape: &Shape, next: &mut u32) -> InstrId {
    match shape {
        Shape::Num | Shape::Bool => {
            let id = graph.placeholder(scope, *next, shape.clone());
            *next += 1;
            id
        }
        Shape::Record(record) => {
            let fields = record
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), bind_slots(graph, scope, field, next)))
                .collect();
            graph.structure(record.decl, record.name.clone(), fields)
        }
    }
}

/// Binds every input port of `decl` to boundary slots.
///
/// Fails with a boundary-interface error when a port has no concrete,
/// serializable shape (e.g. `Any` or a function signature).
pub(crate) fn bind_boundary_inputs(
    program: &Program,
    graph: &mut InstrGraph,
    decl: DeclId,
) -> Result<(Vec<Value>, Vec<BoundaryPort>), CompileError> {
    let d = program.decl(decl);
    let mut args = Vec::with_capacity(d.inputs.len());
    let mut ports = Vec::with_capacity(d.inputs.len());
    let mut next = 0u32;
    for port in &d.inputs {
        let shape = shape_of_constraint(program, &port.constraint).ok_or_else(|| CompileError::BoundaryInterface {
            name: program.qualified_name(decl),
            detail: format!(
                "input '{}' has type '{}', which has no fixed serializable shape",
                port.name,
                program.describe_constraint(&port.constraint)
            ),
        })?;
        let offset = next as usize;
        args.push(Value::Instruction(bind_slots(graph, BOUNDARY_SCOPE, &shape, &mut next)));
        ports.push(BoundaryPort {
            name: port.name.clone(),
            offset,
            size: shape.size(),
        });
    }
    Ok((args, ports))
}
