//! The instruction graph: an arena of immutable, interned nodes.
//!
//! Dependents are `InstrId` indices into the arena, so sharing a
//! sub-expression is free and the graph can never contain a cycle: a node can
//! only refer to nodes that existed before it.

use std::collections::HashSet;

use tracing::trace;

use crate::error::CompileError;
use crate::ir::instr::{BinaryOp, InstrId, Instruction, NullaryOp, UnaryOp, BOUNDARY_SCOPE};
use crate::ir::intern::{InstrKey, InternCache, InternStats};
use crate::ir::shape::Shape;
use crate::scope::DeclId;

/// A registered node: the instruction plus facts derived when it was created.
#[derive(Debug, Clone)]
pub struct Node {
    pub instr: Instruction,
    pub shape: Shape,
    /// Loop scopes this node reads without being inside the owning `for`.
    /// Sorted, deduplicated. Empty for nodes that only depend on the boundary.
    pub(crate) free_scopes: Vec<u32>,
}

/// One compilation unit's instruction graph together with its interning cache.
///
/// Invariants:
/// - `InstrId(n)` always indexes `nodes[n]`.
/// - No two nodes are cache-equal.
/// - Nodes are never mutated or removed once registered.
#[derive(Debug)]
pub struct InstrGraph {
    nodes: Vec<Node>,
    cache: InternCache,
}

impl Default for InstrGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            cache: InternCache::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: InstrId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn instruction(&self, id: InstrId) -> Option<&Instruction> {
        self.node(id).map(|n| &n.instr)
    }

    pub fn shape(&self, id: InstrId) -> Option<&Shape> {
        self.node(id).map(|n| &n.shape)
    }

    /// Scalar slot count of the node's value (0 for unknown ids).
    pub fn size(&self, id: InstrId) -> usize {
        self.shape(id).map(Shape::size).unwrap_or(0)
    }

    pub fn intern_stats(&self) -> InternStats {
        self.cache.stats()
    }

    /// Placeholder scope of a `for` loop nested `depth` loops deep.
    ///
    /// Scopes are numbered by nesting depth, so textually identical loops at
    /// the same depth intern to one node. Frames of sibling loops never
    /// overlap at run time, and an inner loop always gets a larger scope than
    /// the loops around it.
    pub fn loop_scope(depth: u32) -> u32 {
        BOUNDARY_SCOPE + 1 + depth
    }

    /// Returns the canonical node for `instr`, registering it if no
    /// cache-equal node exists yet.
    ///
    /// All dependents of `instr` must already belong to this graph.
    pub fn get_or_create(&mut self, instr: Instruction, shape: Shape) -> InstrId {
        let key = InstrKey::of(&instr, &shape);
        if let Some(id) = self.cache.lookup(&key) {
            trace!(%id, kind = instr.mnemonic(), "interned");
            return id;
        }
        let free_scopes = self.compute_free_scopes(&instr);
        let id = InstrId(self.nodes.len() as u32);
        self.nodes.push(Node {
            instr,
            shape,
            free_scopes,
        });
        self.cache.register(key, id);
        id
    }

    fn compute_free_scopes(&self, instr: &Instruction) -> Vec<u32> {
        let mut scopes: Vec<u32> = Vec::new();
        match instr {
            Instruction::Input { scope, .. } if *scope != BOUNDARY_SCOPE => scopes.push(*scope),
            _ => {
                for dep in instr.dependents() {
                    scopes.extend_from_slice(&self.nodes[dep.0 as usize].free_scopes);
                }
            }
        }
        if let Instruction::For { scope, .. } = instr {
            scopes.retain(|s| s != scope);
        }
        scopes.sort_unstable();
        scopes.dedup();
        scopes
    }

    // -----------------------------------------------------------------------
    // Typed constructors
    // -----------------------------------------------------------------------

    pub fn constant(&mut self, value: f32) -> InstrId {
        self.get_or_create(Instruction::Constant(value), Shape::Num)
    }

    /// A scalar slot of the boundary input vector.
    pub fn input(&mut self, index: u32, shape: Shape) -> InstrId {
        self.placeholder(BOUNDARY_SCOPE, index, shape)
    }

    /// A scalar slot of the state of the loop owning `scope`.
    pub fn placeholder(&mut self, scope: u32, index: u32, shape: Shape) -> InstrId {
        self.get_or_create(Instruction::Input { scope, index }, shape)
    }

    pub fn structure(
        &mut self,
        decl: Option<DeclId>,
        name: impl Into<String>,
        fields: Vec<(String, InstrId)>,
    ) -> InstrId {
        let field_shapes = fields
            .iter()
            .map(|(n, id)| (n.clone(), self.nodes[id.0 as usize].shape.clone()))
            .collect();
        let shape = Shape::record(decl, name, field_shapes);
        self.get_or_create(Instruction::Structure { decl, fields }, shape)
    }

    pub fn nullary(&mut self, op: NullaryOp) -> InstrId {
        let shape = if op.is_boolean() { Shape::Bool } else { Shape::Num };
        self.get_or_create(Instruction::Nullary(op), shape)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: InstrId) -> Result<InstrId, CompileError> {
        self.expect_scalar(&op.to_string(), "operand", operand)?;
        let shape = if op.is_boolean() { Shape::Bool } else { Shape::Num };
        Ok(self.get_or_create(Instruction::Unary(op, operand), shape))
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: InstrId, rhs: InstrId) -> Result<InstrId, CompileError> {
        let name = op.to_string();
        self.expect_scalar(&name, "lhs", lhs)?;
        self.expect_scalar(&name, "rhs", rhs)?;
        let shape = if op.is_boolean() { Shape::Bool } else { Shape::Num };
        Ok(self.get_or_create(Instruction::Binary(op, lhs, rhs), shape))
    }

    pub fn if_else(
        &mut self,
        predicate: InstrId,
        when_true: InstrId,
        when_false: InstrId,
    ) -> Result<InstrId, CompileError> {
        self.expect_scalar("if", "predicate", predicate)?;
        let shape = self.nodes[when_true.0 as usize].shape.clone();
        self.expect_size("if", "whenFalse", when_false, &shape)?;
        Ok(self.get_or_create(
            Instruction::If {
                predicate,
                when_true,
                when_false,
            },
            shape,
        ))
    }

    /// Builds a `for` node. `condition` and `body` must read the loop state
    /// through placeholders of `scope`.
    pub fn for_loop(
        &mut self,
        initial: InstrId,
        condition: InstrId,
        body: InstrId,
        scope: u32,
    ) -> Result<InstrId, CompileError> {
        self.expect_scalar("for", "condition", condition)?;
        let shape = self.nodes[initial.0 as usize].shape.clone();
        self.expect_size("for", "body", body, &shape)?;
        Ok(self.get_or_create(
            Instruction::For {
                initial,
                condition,
                body,
                scope,
            },
            shape,
        ))
    }

    pub fn select(&mut self, selector: InstrId, options: Vec<InstrId>) -> Result<InstrId, CompileError> {
        self.expect_scalar("select", "selector", selector)?;
        let first = options.first().copied().ok_or_else(|| CompileError::ArgumentCount {
            callee: "select".into(),
            expected: 2,
            found: 1,
        })?;
        let shape = self.nodes[first.0 as usize].shape.clone();
        for option in &options[1..] {
            self.expect_size("select", "option", *option, &shape)?;
        }
        Ok(self.get_or_create(Instruction::Select { selector, options }, shape))
    }

    pub fn indexer(&mut self, for_loop: InstrId, iteration: InstrId) -> Result<InstrId, CompileError> {
        self.expect_scalar("iterate", "iteration", iteration)?;
        let node = &self.nodes[for_loop.0 as usize];
        if !matches!(node.instr, Instruction::For { .. }) {
            return Err(CompileError::Unsupported {
                detail: format!("indexer target {} is a {} node, not a for loop", for_loop, node.instr.mnemonic()),
            });
        }
        let shape = node.shape.clone();
        Ok(self.get_or_create(
            Instruction::Indexer {
                for_loop,
                iteration,
            },
            shape,
        ))
    }

    /// Accesses field `name` of a record-shaped node. Literal structures yield
    /// the field's own node; anything else gets a `Project` node.
    pub fn field(&mut self, record: InstrId, name: &str) -> Option<InstrId> {
        let node = &self.nodes[record.0 as usize];
        if let Instruction::Structure { fields, .. } = &node.instr {
            return fields.iter().find(|(n, _)| n == name).map(|(_, id)| *id);
        }
        let (offset, shape) = node
            .shape
            .as_record()
            .and_then(|r| r.field(name))
            .map(|(offset, shape)| (offset, shape.clone()))?;
        let size = shape.size() as u32;
        Some(self.get_or_create(
            Instruction::Project {
                record,
                offset: offset as u32,
                size,
            },
            shape,
        ))
    }

    fn expect_scalar(&self, callee: &str, port: &str, id: InstrId) -> Result<(), CompileError> {
        let shape = &self.nodes[id.0 as usize].shape;
        if shape.is_scalar() {
            Ok(())
        } else {
            Err(CompileError::ShapeMismatch {
                callee: callee.into(),
                port: port.into(),
                expected: "a scalar".into(),
                found: shape.to_string(),
            })
        }
    }

    fn expect_size(&self, callee: &str, port: &str, id: InstrId, like: &Shape) -> Result<(), CompileError> {
        let shape = &self.nodes[id.0 as usize].shape;
        if shape.size() == like.size() {
            Ok(())
        } else {
            Err(CompileError::ShapeMismatch {
                callee: callee.into(),
                port: port.into(),
                expected: format!("{} ({} scalars)", like, like.size()),
                found: format!("{} ({} scalars)", shape, shape.size()),
            })
        }
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// Returns every node reachable from `root`, dependencies before dependents.
    pub fn reachable(&self, root: InstrId) -> Vec<InstrId> {
        let mut order = Vec::new();
        let mut visited: HashSet<InstrId> = HashSet::new();
        // (node, dependents already pushed)
        let mut stack: Vec<(InstrId, bool)> = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            stack.push((id, true));
            for dep in node.instr.dependents().into_iter().rev() {
                if !visited.contains(&dep) {
                    stack.push((dep, false));
                }
            }
        }
        order
    }
}
