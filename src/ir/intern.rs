//! Structural interning of instructions.
//!
//! Two instructions are cache-equal iff they have the same variant, the same
//! payload, and identity-equal dependents. Because dependents are already
//! canonical `InstrId`s, a flat key (variant + payload + dependent ids) is
//! enough; no recursive comparison over the graph is ever needed.

use std::collections::HashMap;

use crate::ir::instr::{BinaryOp, InstrId, Instruction, NullaryOp, UnaryOp};
use crate::ir::shape::Shape;
use crate::scope::DeclId;

/// A hashable key that uniquely identifies an instruction's computation.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub(crate) enum InstrKey {
    /// Compared by bit pattern so `-0.0` and `0.0` (and NaN payloads) stay distinct.
    Constant { bits: u32 },
    /// Placeholders of different scalar shapes stay distinct.
    Input { scope: u32, index: u32, shape: Shape },
    Structure {
        decl: Option<DeclId>,
        fields: Vec<(String, InstrId)>,
    },
    Nullary(NullaryOp),
    Unary(UnaryOp, InstrId),
    Binary(BinaryOp, InstrId, InstrId),
    If(InstrId, InstrId, InstrId),
    For {
        initial: InstrId,
        condition: InstrId,
        body: InstrId,
        scope: u32,
    },
    Select {
        selector: InstrId,
        options: Vec<InstrId>,
    },
    Indexer(InstrId, InstrId),
    Project {
        record: InstrId,
        offset: u32,
        size: u32,
    },
}

impl InstrKey {
    pub(crate) fn of(instr: &Instruction, shape: &Shape) -> Self {
        match instr {
            Instruction::Constant(v) => InstrKey::Constant { bits: v.to_bits() },
            Instruction::Input { scope, index } => InstrKey::Input {
                scope: *scope,
                index: *index,
                shape: shape.clone(),
            },
            Instruction::Structure { decl, fields } => InstrKey::Structure {
                decl: *decl,
                fields: fields.clone(),
            },
            Instruction::Nullary(op) => InstrKey::Nullary(*op),
            Instruction::Unary(op, x) => InstrKey::Unary(*op, *x),
            Instruction::Binary(op, a, b) => InstrKey::Binary(*op, *a, *b),
            Instruction::If {
                predicate,
                when_true,
                when_false,
            } => InstrKey::If(*predicate, *when_true, *when_false),
            Instruction::For {
                initial,
                condition,
                body,
                scope,
            } => InstrKey::For {
                initial: *initial,
                condition: *condition,
                body: *body,
                scope: *scope,
            },
            Instruction::Select { selector, options } => InstrKey::Select {
                selector: *selector,
                options: options.clone(),
            },
            Instruction::Indexer {
                for_loop,
                iteration,
            } => InstrKey::Indexer(*for_loop, *iteration),
            Instruction::Project {
                record,
                offset,
                size,
            } => InstrKey::Project {
                record: *record,
                offset: *offset,
                size: *size,
            },
        }
    }
}

/// Canonicalizing table from structural key to the one registered instance.
///
/// Single-writer: owned by one `InstrGraph` and mutated only while that
/// graph's compilation unit is being built.
#[derive(Debug, Default)]
pub struct InternCache {
    table: HashMap<InstrKey, InstrId>,
    hits: u64,
    misses: u64,
}

/// Hit/miss counters of an `InternCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InternStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl InternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical id for `key`, counting the lookup as a hit or miss.
    pub(crate) fn lookup(&mut self, key: &InstrKey) -> Option<InstrId> {
        match self.table.get(key) {
            Some(id) => {
                self.hits += 1;
                Some(*id)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn register(&mut self, key: InstrKey, id: InstrId) {
        self.table.insert(key, id);
    }

    pub fn stats(&self) -> InternStats {
        InternStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.table.len(),
        }
    }
}
