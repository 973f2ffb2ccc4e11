// evaluator.rs — Instruction-graph evaluation
//
// Tests for the evaluator:
//   - index resolution policy (NaN, ±inf, negatives, out of range)
//   - select evaluates the option chosen by the clamped selector
//   - IEEE 754 edge cases: division by zero, ln 0, NaN propagation
//   - booleans as 1.0 / 0.0
//   - output arity and boundary range checks
//   - if evaluates only the chosen branch
//   - repeated evaluation is bit-for-bit identical

use element::interp::resolve_index;
use element::ir::{BinaryOp, InstrGraph, NullaryOp, Shape, UnaryOp};
use element::scope::Body;
use element::{compile, evaluate, CompilerOptions, Constraint, DeclId, EvalError, Expr, Port, Program, ProgramBuilder};

fn id(name: &str) -> Expr {
    Expr::ident(name)
}

fn build(name: &str, ports: &[&str], body: Expr) -> (Program, DeclId) {
    let mut b = ProgramBuilder::new();
    let root = b.root();
    let f = b
        .add_function(root, name, ports.iter().map(|p| Port::num(*p)).collect(), Constraint::Any, Body::Expression(body))
        .unwrap();
    (b.build(), f)
}

fn eval1(program: &Program, decl: DeclId, inputs: &[f32]) -> f32 {
    let mut g = InstrGraph::new();
    let root = compile(program, &mut g, decl, &CompilerOptions::instruction_tree())
        .unwrap()
        .instruction()
        .unwrap();
    evaluate(&g, root, inputs, 1).unwrap()[0]
}

// ── Test 1: index resolution policy ───────────────────────────────────────

#[test]
fn test_resolve_index_policy() {
    let n = 4;
    assert_eq!(resolve_index(f32::NAN, n), 0);
    assert_eq!(resolve_index(f32::INFINITY, n), n - 1);
    assert_eq!(resolve_index(f32::NEG_INFINITY, n), 0);
    assert_eq!(resolve_index(-1.0, n), 0);
    assert_eq!(resolve_index(n as f32, n), n - 1);
    assert_eq!(resolve_index((n + 1) as f32, n), n - 1);
    for i in 0..n {
        assert_eq!(resolve_index(i as f32, n), i);
    }
    assert_eq!(resolve_index(2.75, n), 2, "truncates");
    assert_eq!(resolve_index(-0.5, n), 0);
    assert_eq!(resolve_index(1e30, usize::MAX), usize::MAX - 1, "saturates");
}

// ── Test 2: select clamps its selector ────────────────────────────────────

#[test]
fn test_select_clamps() {
    let (program, f) = build(
        "pick",
        &["i"],
        id("select").call(vec![id("i"), Expr::num(10.0), Expr::num(20.0), Expr::num(30.0)]),
    );
    let cases = [
        (f32::NAN, 10.0),
        (f32::INFINITY, 30.0),
        (f32::NEG_INFINITY, 10.0),
        (-1.0, 10.0),
        (0.0, 10.0),
        (1.0, 20.0),
        (2.0, 30.0),
        (3.0, 30.0),
        (4.0, 30.0),
        (1.9, 20.0),
    ];
    for (selector, expected) in cases {
        assert_eq!(eval1(&program, f, &[selector]), expected, "selector {}", selector);
    }
}

// ── Test 3: division by zero and ln 0 ─────────────────────────────────────

#[test]
fn test_ieee_infinities() {
    let (program, div) = build("div", &["a", "b"], id("a").method("div", vec![id("b")]));
    assert_eq!(eval1(&program, div, &[5.0, 0.0]), f32::INFINITY);
    assert_eq!(eval1(&program, div, &[-5.0, 0.0]), f32::NEG_INFINITY);
    assert!(eval1(&program, div, &[0.0, 0.0]).is_nan());

    let (program, ln) = build("ln", &["a"], id("a").method("ln", vec![]));
    assert_eq!(eval1(&program, ln, &[0.0]), f32::NEG_INFINITY);
}

// ── Test 4: NaN propagates ────────────────────────────────────────────────

#[test]
fn test_nan_propagation() {
    for op in ["add", "sub", "mul", "div", "pow"] {
        let (program, f) = build(op, &["a", "b"], id("a").method(op, vec![id("b")]));
        assert!(eval1(&program, f, &[f32::NAN, 2.0]).is_nan(), "{}(NaN, 2)", op);
        assert!(eval1(&program, f, &[1.0, f32::NAN]).is_nan(), "{}(1, NaN)", op);
    }
}

// ── Test 5: arithmetic and comparisons on raw graphs ──────────────────────

#[test]
fn test_graph_arithmetic() {
    let mut g = InstrGraph::new();
    let x = g.input(0, Shape::Num);
    let y = g.input(1, Shape::Num);
    let cases = [
        (BinaryOp::Pow, 8.0),
        (BinaryOp::Rem, 0.0),
        (BinaryOp::Min, 2.0),
        (BinaryOp::Max, 8.0),
        (BinaryOp::Lt, 0.0),
        (BinaryOp::Geq, 1.0),
        (BinaryOp::Neq, 1.0),
        (BinaryOp::Eq, 0.0),
    ];
    for (op, expected) in cases {
        let lhs = if op == BinaryOp::Pow { y } else { x };
        let rhs = if op == BinaryOp::Pow { g.constant(3.0) } else { y };
        let node = g.binary(op, lhs, rhs).unwrap();
        assert_eq!(evaluate(&g, node, &[8.0, 2.0], 1).unwrap(), vec![expected], "{:?}", op);
    }

    let log = g.binary(BinaryOp::Log, x, y).unwrap();
    assert!((evaluate(&g, log, &[8.0, 2.0], 1).unwrap()[0] - 3.0).abs() < 1e-5);

    let floor = g.unary(UnaryOp::Floor, x).unwrap();
    assert_eq!(evaluate(&g, floor, &[-1.5, 0.0], 1).unwrap(), vec![-2.0]);
}

// ── Test 6: booleans are 1.0 / 0.0; non-zero is true ──────────────────────

#[test]
fn test_boolean_encoding() {
    let mut g = InstrGraph::new();
    let t = g.nullary(NullaryOp::True);
    let f = g.nullary(NullaryOp::False);
    let x = g.input(0, Shape::Num);
    let and = g.binary(BinaryOp::And, t, x).unwrap();
    let or = g.binary(BinaryOp::Or, f, x).unwrap();
    let not = g.unary(UnaryOp::Not, x).unwrap();
    assert_eq!(g.shape(and), Some(&Shape::Bool));

    assert_eq!(evaluate(&g, t, &[], 1).unwrap(), vec![1.0]);
    assert_eq!(evaluate(&g, f, &[], 1).unwrap(), vec![0.0]);
    assert_eq!(evaluate(&g, and, &[-3.0], 1).unwrap(), vec![1.0]);
    assert_eq!(evaluate(&g, or, &[0.0], 1).unwrap(), vec![0.0]);
    assert_eq!(evaluate(&g, not, &[0.25], 1).unwrap(), vec![0.0]);
}

// ── Test 7: output arity ──────────────────────────────────────────────────

#[test]
fn test_output_arity() {
    let mut g = InstrGraph::new();
    let a = g.constant(1.0);
    let b = g.constant(2.0);
    let pair = g.structure(None, "Pair", vec![("a".into(), a), ("b".into(), b)]);
    assert_eq!(
        evaluate(&g, pair, &[], 1),
        Err(EvalError::OutputTooSmall {
            required: 2,
            capacity: 1
        })
    );
    assert_eq!(evaluate(&g, pair, &[], 2).unwrap(), vec![1.0, 2.0]);
    // Larger capacity still yields exactly the root's value.
    assert_eq!(evaluate(&g, pair, &[], 8).unwrap(), vec![1.0, 2.0]);
}

// ── Test 8: missing boundary inputs ───────────────────────────────────────

#[test]
fn test_input_out_of_range() {
    let mut g = InstrGraph::new();
    let x = g.input(2, Shape::Num);
    assert_eq!(
        evaluate(&g, x, &[1.0], 1),
        Err(EvalError::InputOutOfRange { index: 2, len: 1 })
    );
}

// ── Test 9: if only evaluates the selected branch ─────────────────────────

#[test]
fn test_if_is_lazy() {
    let (program, f) = build(
        "guarded",
        &["p", "x"],
        id("if").call(vec![id("p").method("gt", vec![Expr::num(0.0)]), Expr::num(1.0), id("x")]),
    );
    let mut g = InstrGraph::new();
    let root = compile(&program, &mut g, f, &CompilerOptions::instruction_tree())
        .unwrap()
        .instruction()
        .unwrap();
    // `x` is never read when the predicate holds.
    assert_eq!(evaluate(&g, root, &[1.0], 1).unwrap(), vec![1.0]);
    assert_eq!(
        evaluate(&g, root, &[0.0], 1),
        Err(EvalError::InputOutOfRange { index: 1, len: 1 })
    );
    assert_eq!(evaluate(&g, root, &[0.0, 7.0], 1).unwrap(), vec![7.0]);
}

// ── Test 10: select only evaluates the chosen option ──────────────────────

#[test]
fn test_select_is_lazy() {
    let mut g = InstrGraph::new();
    let s = g.input(0, Shape::Num);
    let ok = g.constant(5.0);
    let missing = g.input(9, Shape::Num);
    let sel = g.select(s, vec![ok, missing]).unwrap();
    assert_eq!(evaluate(&g, sel, &[0.0], 1).unwrap(), vec![5.0]);
    assert!(evaluate(&g, sel, &[1.0], 1).is_err());
}

// ── Test 11: unknown roots are reported ───────────────────────────────────

#[test]
fn test_unknown_root() {
    let g = InstrGraph::new();
    assert_eq!(
        evaluate(&g, element::InstrId(3), &[], 1),
        Err(EvalError::UnknownInstruction { id: 3 })
    );
}

// ── Test 12: evaluation is deterministic ──────────────────────────────────

#[test]
fn test_evaluation_deterministic() {
    // f(k, n) = iterate(k, _(x) = x.lt(n), _(x) = x.mul(1.1).add(0.3), 7)
    //             .add(for(k, _(x) = x.lt(n), _(x) = x.add(x.abs().pow(0.5))))
    //             .div(n)
    let mut b = ProgramBuilder::new();
    let root = b.root();
    let f = b
        .add_function(root, "f", vec![Port::num("k"), Port::num("n")], Constraint::Num, Body::None)
        .unwrap();
    let lt = |b: &mut ProgramBuilder| b.add_lambda(f, vec![Port::num("x")], id("x").method("lt", vec![id("n")]));
    let c1 = lt(&mut b);
    let c2 = lt(&mut b);
    let step = b.add_lambda(
        f,
        vec![Port::num("x")],
        id("x").method("mul", vec![Expr::num(1.1)]).method("add", vec![Expr::num(0.3)]),
    );
    let grow = b.add_lambda(
        f,
        vec![Port::num("x")],
        id("x").method("add", vec![id("x").method("abs", vec![]).method("pow", vec![Expr::num(0.5)])]),
    );
    let iterate = id("iterate").call(vec![id("k"), Expr::Lambda(c1), Expr::Lambda(step), Expr::num(7.0)]);
    let for_loop = id("for").call(vec![id("k"), Expr::Lambda(c2), Expr::Lambda(grow)]);
    b.set_body(
        f,
        Body::Expression(iterate.method("add", vec![for_loop]).method("div", vec![id("n")])),
    );
    let program = b.build();

    let mut g = InstrGraph::new();
    let root_id = compile(&program, &mut g, f, &CompilerOptions::instruction_tree())
        .unwrap()
        .instruction()
        .unwrap();
    for inputs in [[0.5, 20.0], [3.0, 3.5], [f32::NAN, 3.0], [-2.0, 0.0], [1.0, 1e6]] {
        let first = evaluate(&g, root_id, &inputs, 1).unwrap();
        for _ in 0..5 {
            let again = evaluate(&g, root_id, &inputs, 1).unwrap();
            let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
            assert_eq!(bits(&again), bits(&first), "inputs {:?}", inputs);
        }
    }
}
