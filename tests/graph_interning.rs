// graph_interning.rs — Instruction graph construction and interning
//
// Tests for the interned instruction graph:
//   - identical constants and operations share one node
//   - `a.add(a)` compiles to a single binary node over one input
//   - compiling the same declaration twice is deterministic
//   - typed constructors reject ill-shaped operands
//   - field access on literal structures and on loop results
//   - loop placeholder scopes numbered by nesting depth
//   - the text printer

use element::ir::printer::emit_graph_text;
use element::ir::{BinaryOp, InstrGraph, Instruction, Shape, UnaryOp};
use element::scope::Body;
use element::{compile, CompileError, CompilerOptions, Constraint, DeclId, Expr, Port, Program, ProgramBuilder};

fn program_with_square() -> (Program, DeclId) {
    let mut b = ProgramBuilder::new();
    let root = b.root();
    let f = b
        .add_function(
            root,
            "twice",
            vec![Port::num("a")],
            Constraint::Num,
            Body::Expression(Expr::ident("a").method("add", vec![Expr::ident("a")])),
        )
        .unwrap();
    (b.build(), f)
}

// ── Test 1: constants are interned ────────────────────────────────────────

#[test]
fn test_constants_interned() {
    let mut g = InstrGraph::new();
    let a = g.constant(1.5);
    let b = g.constant(1.5);
    let c = g.constant(2.0);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(g.len(), 2);
    let stats = g.intern_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

// ── Test 2: structurally equal operations share a node ────────────────────

#[test]
fn test_binary_interned_by_dependents() {
    let mut g = InstrGraph::new();
    let x = g.input(0, Shape::Num);
    let one = g.constant(1.0);
    let a = g.binary(BinaryOp::Add, x, one).unwrap();
    let b = g.binary(BinaryOp::Add, x, one).unwrap();
    let c = g.binary(BinaryOp::Add, one, x).unwrap();
    let d = g.binary(BinaryOp::Sub, x, one).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c, "operand order is part of the key");
    assert_ne!(a, d);
    assert_eq!(g.len(), 5);
}

// ── Test 3: a.add(a) shares the operand node ──────────────────────────────

#[test]
fn test_add_self_single_node() {
    let (program, f) = program_with_square();
    let mut g = InstrGraph::new();
    let compiled = compile(&program, &mut g, f, &CompilerOptions::instruction_tree()).unwrap();
    let root = compiled.instruction().unwrap();
    match g.instruction(root) {
        Some(Instruction::Binary(BinaryOp::Add, lhs, rhs)) => assert_eq!(lhs, rhs),
        other => panic!("expected add, got {:?}", other),
    }
    assert_eq!(g.len(), 2, "one input and one add");
}

// ── Test 4: compiling twice is deterministic ──────────────────────────────

#[test]
fn test_compile_deterministic() {
    let (program, f) = program_with_square();
    let opts = CompilerOptions::instruction_tree();

    let mut g1 = InstrGraph::new();
    let mut g2 = InstrGraph::new();
    let r1 = compile(&program, &mut g1, f, &opts).unwrap().instruction().unwrap();
    let r2 = compile(&program, &mut g2, f, &opts).unwrap().instruction().unwrap();
    assert_eq!(emit_graph_text(&g1, r1).unwrap(), emit_graph_text(&g2, r2).unwrap());

    // Recompiling into the same graph adds nothing.
    let len = g1.len();
    let again = compile(&program, &mut g1, f, &opts).unwrap().instruction().unwrap();
    assert_eq!(again, r1);
    assert_eq!(g1.len(), len);
}

// ── Test 5: scalar operands are enforced ──────────────────────────────────

#[test]
fn test_binary_rejects_record_operand() {
    let mut g = InstrGraph::new();
    let x = g.constant(1.0);
    let y = g.constant(2.0);
    let pair = g.structure(None, "Pair", vec![("x".into(), x), ("y".into(), y)]);
    let err = g.binary(BinaryOp::Mul, pair, x).unwrap_err();
    assert!(matches!(err, CompileError::ShapeMismatch { ref port, .. } if port == "lhs"), "{:?}", err);
    let err = g.unary(UnaryOp::Sin, pair).unwrap_err();
    assert!(matches!(err, CompileError::ShapeMismatch { .. }));
}

// ── Test 6: branch and option sizes must agree ────────────────────────────

#[test]
fn test_if_and_select_size_checks() {
    let mut g = InstrGraph::new();
    let p = g.input(0, Shape::Bool);
    let x = g.constant(1.0);
    let pair = g.structure(None, "Pair", vec![("x".into(), x), ("y".into(), x)]);
    assert!(g.if_else(p, x, pair).is_err());
    assert!(g.if_else(p, x, x).is_ok());
    assert!(g.select(p, vec![x, pair]).is_err());
    assert!(matches!(
        g.select(p, Vec::new()),
        Err(CompileError::ArgumentCount { .. })
    ));
}

// ── Test 7: indexer only targets loops ────────────────────────────────────

#[test]
fn test_indexer_requires_for() {
    let mut g = InstrGraph::new();
    let x = g.constant(1.0);
    assert!(matches!(g.indexer(x, x), Err(CompileError::Unsupported { .. })));
}

// ── Test 8: field access ──────────────────────────────────────────────────

#[test]
fn test_field_access_literal_and_projected() {
    let mut g = InstrGraph::new();
    let a = g.constant(3.0);
    let b = g.constant(4.0);
    let v = g.structure(None, "V", vec![("a".into(), a), ("b".into(), b)]);
    assert_eq!(g.field(v, "a"), Some(a));
    assert_eq!(g.field(v, "b"), Some(b));
    assert_eq!(g.field(v, "c"), None);

    let scope = InstrGraph::loop_scope(0);
    let sa = g.placeholder(scope, 0, Shape::Num);
    let sb = g.placeholder(scope, 1, Shape::Num);
    let state = g.structure(None, "V", vec![("a".into(), sa), ("b".into(), sb)]);
    let lim = g.constant(10.0);
    let cond = g.binary(BinaryOp::Lt, sa, lim).unwrap();
    let for_loop = g.for_loop(v, cond, state, scope).unwrap();
    let projected = g.field(for_loop, "b").unwrap();
    assert!(matches!(
        g.instruction(projected),
        Some(Instruction::Project { offset: 1, size: 1, .. })
    ));
    assert_eq!(g.shape(projected), Some(&Shape::Num));
}

// ── Test 9: loop scopes follow nesting depth ──────────────────────────────

#[test]
fn test_loop_scopes_by_depth() {
    assert!(InstrGraph::loop_scope(0) > 0, "scope 0 is the boundary");
    assert!(InstrGraph::loop_scope(1) > InstrGraph::loop_scope(0));
    assert_eq!(InstrGraph::loop_scope(2), InstrGraph::loop_scope(2));

    // Placeholders of one slot stay distinct when their scalar shapes differ.
    let mut g = InstrGraph::new();
    let scope = InstrGraph::loop_scope(0);
    let n = g.placeholder(scope, 0, Shape::Num);
    let b = g.placeholder(scope, 0, Shape::Bool);
    assert_ne!(n, b);
    assert_eq!(g.shape(b), Some(&Shape::Bool));
    assert_eq!(g.placeholder(scope, 0, Shape::Num), n);
}

// ── Test 10: printer output ───────────────────────────────────────────────

#[test]
fn test_printer_output() {
    let (program, f) = program_with_square();
    let mut g = InstrGraph::new();
    let root = compile(&program, &mut g, f, &CompilerOptions::instruction_tree())
        .unwrap()
        .instruction()
        .unwrap();
    let text = emit_graph_text(&g, root).unwrap();
    assert_eq!(text, "%0 = input 0:0 : Num\n%1 = add %0, %0 : Num\nreturn %1\n");
}
