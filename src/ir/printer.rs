//! Graph pretty-printer.
//!
//! Emits a human-readable listing of every node reachable from a root.
//! Output is deterministic: nodes are printed dependencies-first, in the
//! order a depth-first walk from the root first completes them.

use std::fmt::Write;

use crate::ir::graph::InstrGraph;
use crate::ir::instr::{InstrId, Instruction};

/// Emits a text dump of the sub-graph rooted at `root`.
pub fn emit_graph_text(graph: &InstrGraph, root: InstrId) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    for id in graph.reachable(root) {
        let Some(node) = graph.node(id) else { continue };
        write!(out, "{} = ", id)?;
        emit_instr(&mut out, &node.instr)?;
        writeln!(out, " : {}", node.shape)?;
    }
    writeln!(out, "return {}", root)?;
    Ok(out)
}

fn emit_instr(out: &mut String, instr: &Instruction) -> std::fmt::Result {
    match instr {
        Instruction::Constant(v) => write!(out, "const {}", v),
        Instruction::Input { scope, index } => write!(out, "input {}:{}", scope, index),
        Instruction::Structure { fields, .. } => {
            write!(out, "struct {{")?;
            for (i, (name, id)) in fields.iter().enumerate() {
                if i > 0 {
                    write!(out, ",")?;
                }
                write!(out, " {}: {}", name, id)?;
            }
            write!(out, " }}")
        }
        Instruction::Nullary(op) => write!(out, "{}", op),
        Instruction::Unary(op, x) => write!(out, "{} {}", op, x),
        Instruction::Binary(op, a, b) => write!(out, "{} {}, {}", op, a, b),
        Instruction::If {
            predicate,
            when_true,
            when_false,
        } => write!(out, "if {} then {} else {}", predicate, when_true, when_false),
        Instruction::For {
            initial,
            condition,
            body,
            scope,
        } => write!(out, "for[{}] {} while {} do {}", scope, initial, condition, body),
        Instruction::Select { selector, options } => {
            write!(out, "select {} [", selector)?;
            for (i, id) in options.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write!(out, "{}", id)?;
            }
            write!(out, "]")
        }
        Instruction::Indexer {
            for_loop,
            iteration,
        } => write!(out, "index {} at {}", for_loop, iteration),
        Instruction::Project {
            record,
            offset,
            size,
        } => write!(out, "project {} [{}..{}]", record, offset, offset + size),
    }
}
