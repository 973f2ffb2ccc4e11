//! Compile-time values and the lexical environment.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ir::instr::InstrId;
use crate::scope::DeclId;

/// The result of compiling an expression.
#[derive(Debug, Clone)]
pub enum Value {
    /// A node of the instruction graph.
    Instruction(InstrId),
    /// A function or record constructor awaiting (more) arguments.
    Callable(Callable),
    /// A record with at least one field that is not an instruction.
    Record(RecordInstance),
    /// A namespace, constraint or intrinsic type, usable only for member lookup.
    Scope(DeclId),
}

impl Value {
    pub fn as_instruction(&self) -> Option<InstrId> {
        match self {
            Value::Instruction(id) => Some(*id),
            _ => None,
        }
    }

    pub(crate) fn identity(&self) -> ArgIdentity {
        match self {
            Value::Instruction(_) => ArgIdentity::Numeric,
            Value::Callable(c) => ArgIdentity::Callable(c.decl, c.args.iter().map(Value::identity).collect()),
            Value::Record(r) => ArgIdentity::Record(r.decl, r.fields.iter().map(|(_, v)| v.identity()).collect()),
            Value::Scope(s) => ArgIdentity::Scope(*s),
        }
    }
}

/// How the recursion check tells two invocations of one declaration apart.
///
/// Numeric arguments all compare equal: a function re-entered with different
/// numbers would keep re-entering itself. Callables compare by declaration
/// and bound arguments, so a higher-order function may be re-entered with a
/// different function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArgIdentity {
    Numeric,
    Callable(DeclId, Vec<ArgIdentity>),
    Record(DeclId, Vec<ArgIdentity>),
    Scope(DeclId),
}

/// A declaration closed over the environment it was referenced from, plus
/// the arguments supplied so far.
#[derive(Debug, Clone)]
pub struct Callable {
    pub decl: DeclId,
    pub args: Vec<Value>,
    pub(crate) env: Env,
}

impl Callable {
    pub(crate) fn new(decl: DeclId, env: Env) -> Self {
        Self {
            decl,
            args: Vec::new(),
            env,
        }
    }
}

/// An instance of a struct declaration, fields in declared order.
#[derive(Debug, Clone)]
pub struct RecordInstance {
    pub decl: DeclId,
    pub fields: Vec<(String, Value)>,
}

impl RecordInstance {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// One function invocation: its bound ports and the zero-input members
/// already compiled under it.
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) decl: DeclId,
    pub(crate) bindings: IndexMap<String, Value>,
    pub(crate) locals: RefCell<HashMap<DeclId, Value>>,
    parent: Env,
}

/// A persistent chain of frames, innermost first.
///
/// Pushing creates a new chain sharing the old one, so a frame is never
/// popped by mutation and a callable can keep the chain it was created in.
#[derive(Debug, Clone, Default)]
pub(crate) struct Env(Option<Rc<Frame>>);

impl Env {
    pub(crate) fn empty() -> Self {
        Env(None)
    }

    pub(crate) fn push(&self, decl: DeclId, bindings: IndexMap<String, Value>) -> Env {
        Env(Some(Rc::new(Frame {
            decl,
            bindings,
            locals: RefCell::new(HashMap::new()),
            parent: self.clone(),
        })))
    }

    pub(crate) fn top(&self) -> Option<&Frame> {
        self.0.as_deref()
    }

    /// The chain whose innermost frame is the nearest invocation of `decl`.
    pub(crate) fn find(&self, decl: DeclId) -> Option<Env> {
        let mut current = self.clone();
        while let Some(frame) = current.0.clone() {
            if frame.decl == decl {
                return Some(current);
            }
            current = frame.parent.clone();
        }
        None
    }
}
