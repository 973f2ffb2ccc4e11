use crate::scope::DeclId;

/// An opaque, index-based reference to a node of an `InstrGraph`.
///
/// Invariant: `InstrId(n)` is only valid within the graph that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstrId(pub u32);

impl std::fmt::Display for InstrId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Scope index of boundary inputs. Scopes above zero belong to `for` loops.
pub const BOUNDARY_SCOPE: u32 = 0;

/// Operations taking no operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullaryOp {
    NaN,
    PositiveInfinity,
    NegativeInfinity,
    True,
    False,
}

impl NullaryOp {
    /// True when the op yields a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(self, NullaryOp::True | NullaryOp::False)
    }
}

impl std::fmt::Display for NullaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NullaryOp::NaN => "nan",
            NullaryOp::PositiveInfinity => "inf",
            NullaryOp::NegativeInfinity => "-inf",
            NullaryOp::True => "true",
            NullaryOp::False => "false",
        };
        f.write_str(s)
    }
}

/// Scalar unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Abs,
    Ceil,
    Floor,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    /// Natural logarithm.
    Ln,
    /// Boolean NOT.
    Not,
}

impl UnaryOp {
    pub fn is_boolean(self) -> bool {
        matches!(self, UnaryOp::Not)
    }
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnaryOp::Abs => "abs",
            UnaryOp::Ceil => "ceil",
            UnaryOp::Floor => "floor",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Ln => "ln",
            UnaryOp::Not => "not",
        };
        f.write_str(s)
    }
}

/// Scalar binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Remainder with the sign of the dividend.
    Rem,
    Min,
    Max,
    /// `log(x, base)`.
    Log,
    Atan2,
    And,
    Or,
    // Comparisons yield a bool scalar.
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl BinaryOp {
    /// True when the op yields a boolean.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Leq
                | BinaryOp::Gt
                | BinaryOp::Geq
        )
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
            BinaryOp::Rem => "rem",
            BinaryOp::Min => "min",
            BinaryOp::Max => "max",
            BinaryOp::Log => "log",
            BinaryOp::Atan2 => "atan2",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Eq => "eq",
            BinaryOp::Neq => "neq",
            BinaryOp::Lt => "lt",
            BinaryOp::Leq => "leq",
            BinaryOp::Gt => "gt",
            BinaryOp::Geq => "geq",
        };
        f.write_str(s)
    }
}

/// A node of the compiled dataflow graph.
///
/// Invariants:
/// - Dependents are ids of nodes created earlier in the same graph, so the
///   graph is acyclic by construction.
/// - A node is never mutated once it has been registered.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Constant(f32),
    /// One scalar of an input vector. Scope 0 is the caller's boundary vector;
    /// any other scope is the state of the `for` loop owning that scope.
    Input {
        scope: u32,
        index: u32,
    },
    /// A record value; fields are in declared order.
    Structure {
        decl: Option<DeclId>,
        fields: Vec<(String, InstrId)>,
    },
    Nullary(NullaryOp),
    Unary(UnaryOp, InstrId),
    Binary(BinaryOp, InstrId, InstrId),
    /// Both branches are part of the graph; only one is evaluated.
    If {
        predicate: InstrId,
        when_true: InstrId,
        when_false: InstrId,
    },
    /// state₀ = initial; while condition(stateᵢ), stateᵢ₊₁ = body(stateᵢ).
    /// `condition` and `body` read the state through `Input { scope, .. }`.
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
    /// The state of `for_loop` after `iteration` steps.
    Indexer {
        for_loop: InstrId,
        iteration: InstrId,
    },
    /// `size` scalars of `record` starting at `offset`.
    Project {
        record: InstrId,
        offset: u32,
        size: u32,
    },
}

impl Instruction {
    /// Returns the ids this instruction depends on, in evaluation order.
    pub fn dependents(&self) -> Vec<InstrId> {
        match self {
            Instruction::Constant(_) | Instruction::Input { .. } | Instruction::Nullary(_) => {
                Vec::new()
            }
            Instruction::Structure { fields, .. } => fields.iter().map(|(_, id)| *id).collect(),
            Instruction::Unary(_, x) => vec![*x],
            Instruction::Binary(_, a, b) => vec![*a, *b],
            Instruction::If {
                predicate,
                when_true,
                when_false,
            } => vec![*predicate, *when_true, *when_false],
            Instruction::For {
                initial,
                condition,
                body,
                ..
            } => vec![*initial, *condition, *body],
            Instruction::Select { selector, options } => {
                let mut ids = vec![*selector];
                ids.extend(options.iter().copied());
                ids
            }
            Instruction::Indexer {
                for_loop,
                iteration,
            } => vec![*for_loop, *iteration],
            Instruction::Project { record, .. } => vec![*record],
        }
    }

    /// Short mnemonic used by the printer and in log output.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Instruction::Constant(_) => "const",
            Instruction::Input { .. } => "input",
            Instruction::Structure { .. } => "struct",
            Instruction::Nullary(_) => "nullary",
            Instruction::Unary(..) => "unary",
            Instruction::Binary(..) => "binary",
            Instruction::If { .. } => "if",
            Instruction::For { .. } => "for",
            Instruction::Select { .. } => "select",
            Instruction::Indexer { .. } => "indexer",
            Instruction::Project { .. } => "project",
        }
    }
}
