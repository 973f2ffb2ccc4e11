//! Scalar semantics of the nullary, unary and binary operations.
//!
//! All arithmetic is IEEE 754 single precision. Booleans are stored as
//! `1.0`/`0.0` and any non-zero value (including NaN) reads as true.

use crate::ir::instr::{BinaryOp, NullaryOp, UnaryOp};

pub(crate) fn truthy(x: f32) -> bool {
    x != 0.0
}

fn from_bool(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub(crate) fn eval_nullary(op: NullaryOp) -> f32 {
    match op {
        NullaryOp::NaN => f32::NAN,
        NullaryOp::PositiveInfinity => f32::INFINITY,
        NullaryOp::NegativeInfinity => f32::NEG_INFINITY,
        NullaryOp::True => 1.0,
        NullaryOp::False => 0.0,
    }
}

pub(crate) fn eval_unary(op: UnaryOp, x: f32) -> f32 {
    match op {
        UnaryOp::Abs => x.abs(),
        UnaryOp::Ceil => x.ceil(),
        UnaryOp::Floor => x.floor(),
        UnaryOp::Sin => x.sin(),
        UnaryOp::Cos => x.cos(),
        UnaryOp::Tan => x.tan(),
        UnaryOp::Asin => x.asin(),
        UnaryOp::Acos => x.acos(),
        UnaryOp::Atan => x.atan(),
        UnaryOp::Ln => x.ln(),
        UnaryOp::Not => from_bool(!truthy(x)),
    }
}

pub(crate) fn eval_binary(op: BinaryOp, a: f32, b: f32) -> f32 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        // powf(1, NaN) and powf(NaN, 0) are 1 under IEEE; NaN must win here.
        BinaryOp::Pow if a.is_nan() || b.is_nan() => f32::NAN,
        BinaryOp::Pow => a.powf(b),
        BinaryOp::Rem => a % b,
        BinaryOp::Min => a.min(b),
        BinaryOp::Max => a.max(b),
        BinaryOp::Log => a.ln() / b.ln(),
        BinaryOp::Atan2 => a.atan2(b),
        BinaryOp::And => from_bool(truthy(a) && truthy(b)),
        BinaryOp::Or => from_bool(truthy(a) || truthy(b)),
        BinaryOp::Eq => from_bool(a == b),
        BinaryOp::Neq => from_bool(a != b),
        BinaryOp::Lt => from_bool(a < b),
        BinaryOp::Leq => from_bool(a <= b),
        BinaryOp::Gt => from_bool(a > b),
        BinaryOp::Geq => from_bool(a >= b),
    }
}

/// Maps a selector or iteration value onto `0..count`.
///
/// NaN and -inf give 0, +inf gives `count - 1`, finite values are truncated
/// toward zero and clamped. A `count` of 0 yields 0.
pub fn resolve_index(value: f32, count: usize) -> usize {
    if count == 0 || value.is_nan() {
        return 0;
    }
    let last = count - 1;
    if value == f32::INFINITY {
        return last;
    }
    let t = value.trunc();
    if t <= 0.0 {
        return 0;
    }
    // `as` saturates for values beyond usize::MAX.
    (t as usize).min(last)
}

