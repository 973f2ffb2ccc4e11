//! Element prelude.
//!
//! Registers the intrinsic declarations every program starts with:
//! the `Num` and `Bool` types (whose scopes hold the arithmetic and boolean
//! intrinsics, so `a.add(b)` resolves by method lookup) and the control
//! intrinsics `if`, `for`, `iterate` and `select` in the global namespace.

use crate::compile::intrinsics::Intrinsic;
use crate::ir::instr::{BinaryOp, NullaryOp, UnaryOp};
use crate::scope::{Constraint, DeclKind, Port, ProgramBuilder};

const NUM_NULLARY: &[(&str, NullaryOp)] = &[
    ("NaN", NullaryOp::NaN),
    ("PositiveInfinity", NullaryOp::PositiveInfinity),
    ("NegativeInfinity", NullaryOp::NegativeInfinity),
];

const NUM_UNARY: &[(&str, UnaryOp)] = &[
    ("abs", UnaryOp::Abs),
    ("ceil", UnaryOp::Ceil),
    ("floor", UnaryOp::Floor),
    ("sin", UnaryOp::Sin),
    ("cos", UnaryOp::Cos),
    ("tan", UnaryOp::Tan),
    ("asin", UnaryOp::Asin),
    ("acos", UnaryOp::Acos),
    ("atan", UnaryOp::Atan),
    ("ln", UnaryOp::Ln),
];

const NUM_BINARY: &[(&str, BinaryOp)] = &[
    ("add", BinaryOp::Add),
    ("sub", BinaryOp::Sub),
    ("mul", BinaryOp::Mul),
    ("div", BinaryOp::Div),
    ("pow", BinaryOp::Pow),
    ("rem", BinaryOp::Rem),
    ("min", BinaryOp::Min),
    ("max", BinaryOp::Max),
    ("log", BinaryOp::Log),
    ("atan2", BinaryOp::Atan2),
    ("eq", BinaryOp::Eq),
    ("neq", BinaryOp::Neq),
    ("lt", BinaryOp::Lt),
    ("leq", BinaryOp::Leq),
    ("gt", BinaryOp::Gt),
    ("geq", BinaryOp::Geq),
];

/// Registers the prelude under the builder's root and returns the ids of the
/// `Num` and `Bool` type declarations.
pub(crate) fn register_prelude(b: &mut ProgramBuilder) -> (crate::scope::DeclId, crate::scope::DeclId) {
    let root = b.root();

    let num = b.add_intrinsic(root, "Num", DeclKind::Struct, Vec::new(), Constraint::Num, Intrinsic::Type);
    for (name, op) in NUM_NULLARY {
        b.add_intrinsic(num, name, DeclKind::Function, Vec::new(), Constraint::Num, Intrinsic::Nullary(*op));
    }
    for (name, op) in NUM_UNARY {
        b.add_intrinsic(num, name, DeclKind::Function, vec![Port::num("a")], Constraint::Num, Intrinsic::Unary(*op));
    }
    for (name, op) in NUM_BINARY {
        let output = if op.is_boolean() { Constraint::Bool } else { Constraint::Num };
        b.add_intrinsic(
            num,
            name,
            DeclKind::Function,
            vec![Port::num("a"), Port::num("b")],
            output,
            Intrinsic::Binary(*op),
        );
    }

    let boolean = b.add_intrinsic(root, "Bool", DeclKind::Struct, Vec::new(), Constraint::Bool, Intrinsic::Type);
    let bool_port = |name: &str| Port::new(name, Constraint::Bool);
    b.add_intrinsic(boolean, "True", DeclKind::Function, Vec::new(), Constraint::Bool, Intrinsic::Nullary(NullaryOp::True));
    b.add_intrinsic(boolean, "False", DeclKind::Function, Vec::new(), Constraint::Bool, Intrinsic::Nullary(NullaryOp::False));
    b.add_intrinsic(boolean, "not", DeclKind::Function, vec![bool_port("a")], Constraint::Bool, Intrinsic::Unary(UnaryOp::Not));
    for (name, op) in [("and", BinaryOp::And), ("or", BinaryOp::Or)] {
        b.add_intrinsic(
            boolean,
            name,
            DeclKind::Function,
            vec![bool_port("a"), bool_port("b")],
            Constraint::Bool,
            Intrinsic::Binary(op),
        );
    }

    b.add_intrinsic(
        root,
        "if",
        DeclKind::Function,
        vec![bool_port("predicate"), Port::any("whenTrue"), Port::any("whenFalse")],
        Constraint::Any,
        Intrinsic::If,
    );
    b.add_intrinsic(
        root,
        "for",
        DeclKind::Function,
        vec![Port::any("initial"), Port::any("condition"), Port::any("body")],
        Constraint::Any,
        Intrinsic::For,
    );
    b.add_intrinsic(
        root,
        "iterate",
        DeclKind::Function,
        vec![Port::any("initial"), Port::any("condition"), Port::any("body"), Port::num("iteration")],
        Constraint::Any,
        Intrinsic::Iterate,
    );
    b.add_intrinsic(root, "select", DeclKind::Function, vec![Port::num("selector")], Constraint::Any, Intrinsic::Select);

    (num, boolean)
}
