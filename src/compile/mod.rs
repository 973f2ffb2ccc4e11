//! Declaration compiler: lowers resolved declarations into an `InstrGraph`.
//!
//! Compilation is eager and value-directed. Every expression compiles to a
//! [`Value`]: graph nodes for anything numeric, callables for functions that
//! still need arguments, record instances for records holding functions, and
//! scopes for namespaces and types. The lexical environment is an explicit
//! persistent chain of frames ([`value::Env`]) so callables can capture the
//! invocation they were created in.

pub mod boundary;
pub mod intrinsics;
pub mod value;

pub use boundary::BoundaryPort;
pub use intrinsics::Intrinsic;
pub use value::{Callable, RecordInstance, Value};

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::error::CompileError;
use crate::ir::graph::InstrGraph;
use crate::ir::instr::InstrId;
use crate::ir::shape::Shape;
use crate::scope::{Body, Constraint, DeclId, DeclKind, Expr, Program, RETURN_MEMBER};

use boundary::bind_boundary_inputs;
use value::{ArgIdentity, Env};

/// Nesting bound for invocations whose arguments never repeat, e.g. a
/// function that keeps calling itself with an ever longer chain of callables.
const MAX_CALL_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// What the caller wants back from [`compile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesiredResult {
    /// Bind boundary inputs when every port is serializable and collapse the
    /// result to an instruction when possible; otherwise return the object.
    #[default]
    Automatic,
    /// Boundary binding and an instruction result are mandatory.
    InstructionTreeOnly,
    /// No boundary binding; the value is returned as produced.
    ObjectModelOnly,
}

#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub desired_result: DesiredResult,
}

impl CompilerOptions {
    pub fn instruction_tree() -> Self {
        Self {
            desired_result: DesiredResult::InstructionTreeOnly,
        }
    }

    pub fn object_model() -> Self {
        Self {
            desired_result: DesiredResult::ObjectModelOnly,
        }
    }
}

/// The outcome of compiling one declaration.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub decl: DeclId,
    pub value: Value,
    /// Boundary layout; empty when no inputs were bound.
    pub inputs: Vec<BoundaryPort>,
}

impl Compiled {
    /// The root instruction, if the result is one.
    pub fn instruction(&self) -> Option<InstrId> {
        self.value.as_instruction()
    }

    /// Number of boundary input slots the result reads.
    pub fn input_size(&self) -> usize {
        self.inputs.iter().map(|p| p.size).sum()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Compiles `decl` into `graph`.
///
/// Nodes already in `graph` are reused, so several declarations can share
/// one graph.
#[instrument(skip_all, fields(decl = %program.qualified_name(decl), desired = ?options.desired_result))]
pub fn compile(
    program: &Program,
    graph: &mut InstrGraph,
    decl: DeclId,
    options: &CompilerOptions,
) -> Result<Compiled, CompileError> {
    if program.get(decl).is_none() {
        return Err(CompileError::UndefinedIdentifier {
            name: format!("declaration #{}", decl.0),
            scope: "<root>".into(),
        });
    }
    let before = graph.len();
    let desired = options.desired_result;

    let (value, inputs) = {
        let mut compiler = Compiler::new(program, graph);
        let (value, inputs) = compiler.compile_entry(decl, desired)?;
        (compiler.finalize(decl, value, desired)?, inputs)
    };

    let stats = graph.intern_stats();
    debug!(
        nodes = graph.len(),
        new_nodes = graph.len() - before,
        inputs = inputs.len(),
        intern_hits = stats.hits,
        intern_misses = stats.misses,
        "compiled"
    );
    Ok(Compiled { decl, value, inputs })
}

// ---------------------------------------------------------------------------
// Compiler state
// ---------------------------------------------------------------------------

pub(crate) struct Compiler<'p, 'g> {
    pub(crate) program: &'p Program,
    pub(crate) graph: &'g mut InstrGraph,
    /// Custom functions currently being compiled, outermost first, with the
    /// identity of their arguments.
    in_flight: Vec<(DeclId, Vec<ArgIdentity>)>,
    /// Number of `for` loops enclosing the expression being compiled.
    pub(crate) loop_depth: u32,
}

impl<'p, 'g> Compiler<'p, 'g> {
    fn new(program: &'p Program, graph: &'g mut InstrGraph) -> Self {
        Self {
            program,
            graph,
            in_flight: Vec::new(),
            loop_depth: 0,
        }
    }

    fn compile_entry(
        &mut self,
        decl: DeclId,
        desired: DesiredResult,
    ) -> Result<(Value, Vec<BoundaryPort>), CompileError> {
        let d = self.program.decl(decl);
        let is_scope = matches!(d.kind, DeclKind::Namespace | DeclKind::Constraint)
            || d.intrinsic == Some(Intrinsic::Type);
        if is_scope {
            if desired == DesiredResult::InstructionTreeOnly {
                return Err(CompileError::BoundaryInterface {
                    name: self.program.qualified_name(decl),
                    detail: "namespaces, constraints and types have no value".into(),
                });
            }
            return Ok((Value::Scope(decl), Vec::new()));
        }
        if d.inputs.is_empty() && !d.variadic && d.kind == DeclKind::Function {
            return Ok((self.compile_call(decl, Vec::new(), &Env::empty())?, Vec::new()));
        }

        let callable = Value::Callable(Callable::new(decl, Env::empty()));
        let bound = match desired {
            DesiredResult::ObjectModelOnly => return Ok((callable, Vec::new())),
            DesiredResult::InstructionTreeOnly => bind_boundary_inputs(self.program, self.graph, decl)?,
            DesiredResult::Automatic => match bind_boundary_inputs(self.program, self.graph, decl) {
                Ok(bound) => bound,
                Err(CompileError::BoundaryInterface { detail, .. }) => {
                    debug!(%detail, "boundary not serializable, returning callable");
                    return Ok((callable, Vec::new()));
                }
                Err(e) => return Err(e),
            },
        };
        let (args, ports) = bound;
        debug!(ports = ports.len(), slots = ports.iter().map(|p| p.size).sum::<usize>(), "bound boundary inputs");
        Ok((self.apply(callable, args)?, ports))
    }

    fn finalize(&mut self, decl: DeclId, value: Value, desired: DesiredResult) -> Result<Value, CompileError> {
        match desired {
            DesiredResult::ObjectModelOnly => Ok(value),
            DesiredResult::Automatic => {
                if matches!(value, Value::Record(_)) && self.is_instruction_like(&value) {
                    Ok(Value::Instruction(self.to_instruction(value)?))
                } else {
                    Ok(value)
                }
            }
            DesiredResult::InstructionTreeOnly => {
                let name = self.program.qualified_name(decl);
                if let Constraint::Signature(_) = self.program.decl(decl).output {
                    return Err(CompileError::BoundaryInterface {
                        name,
                        detail: "its result is a function".into(),
                    });
                }
                self.to_instruction(value)
                    .map(Value::Instruction)
                    .map_err(|e| match e {
                        CompileError::NotAnInstruction { detail } => CompileError::BoundaryInterface { name, detail },
                        other => other,
                    })
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Compiles `expr` appearing in the body of declaration `scope`.
    fn compile_expr(&mut self, expr: &Expr, scope: DeclId, env: &Env) -> Result<Value, CompileError> {
        match expr {
            Expr::Literal(v) => Ok(Value::Instruction(self.graph.constant(*v))),
            Expr::Ident(name) => self.resolve_identifier(name, scope, env),
            Expr::Member(target, name) => {
                let target = self.compile_expr(target, scope, env)?;
                self.member_access(target, name)
            }
            Expr::Call(callee, args) => {
                if let Expr::Member(receiver, name) = callee.as_ref() {
                    let receiver = self.compile_expr(receiver, scope, env)?;
                    let args = self.compile_args(args, scope, env)?;
                    self.method_call(receiver, name, args)
                } else {
                    let callee = self.compile_expr(callee, scope, env)?;
                    let args = self.compile_args(args, scope, env)?;
                    self.apply(callee, args)
                }
            }
            Expr::Lambda(id) => Ok(Value::Callable(Callable::new(*id, env.clone()))),
        }
    }

    fn compile_args(&mut self, args: &[Expr], scope: DeclId, env: &Env) -> Result<Vec<Value>, CompileError> {
        args.iter().map(|a| self.compile_expr(a, scope, env)).collect()
    }

    /// Lexical lookup: the ports of the nearest invocation of each enclosing
    /// declaration, then that declaration's members, innermost first.
    fn resolve_identifier(&mut self, name: &str, scope: DeclId, env: &Env) -> Result<Value, CompileError> {
        let mut current = Some(scope);
        while let Some(s) = current {
            let bound = env
                .find(s)
                .and_then(|frame_env| frame_env.top().and_then(|f| f.bindings.get(name).cloned()));
            if let Some(value) = bound {
                return Ok(value);
            }
            if let Some(member) = self.program.member(s, name) {
                return self.value_of_declaration(member, env);
            }
            current = self.program.decl(s).parent;
        }
        Err(CompileError::UndefinedIdentifier {
            name: name.into(),
            scope: self.program.qualified_name(scope),
        })
    }

    /// The value a reference to `id` produces. Zero-input functions are
    /// compiled on the spot and memoised in the enclosing invocation.
    fn value_of_declaration(&mut self, id: DeclId, env: &Env) -> Result<Value, CompileError> {
        let d = self.program.decl(id);
        match d.kind {
            DeclKind::Namespace | DeclKind::Constraint => return Ok(Value::Scope(id)),
            DeclKind::Struct if d.is_intrinsic() => return Ok(Value::Scope(id)),
            DeclKind::Struct => return Ok(Value::Callable(Callable::new(id, Env::empty()))),
            DeclKind::Function => {}
        }

        let captured = match d.parent {
            Some(parent) if self.program.decl(parent).kind == DeclKind::Function => {
                env.find(parent).unwrap_or_default()
            }
            _ => Env::empty(),
        };
        if !d.inputs.is_empty() || d.variadic {
            return Ok(Value::Callable(Callable::new(id, captured)));
        }

        let memoised = captured.top().and_then(|f| f.locals.borrow().get(&id).cloned());
        if let Some(value) = memoised {
            trace!(decl = %d.name, "local reused");
            return Ok(value);
        }
        let value = self.compile_call(id, Vec::new(), &captured)?;
        if let Some(frame) = captured.top() {
            frame.locals.borrow_mut().insert(id, value.clone());
        }
        Ok(value)
    }

    fn scope_member(&mut self, scope: DeclId, name: &str) -> Result<Value, CompileError> {
        let member = self.program.member(scope, name).ok_or_else(|| CompileError::NoMember {
            name: name.into(),
            on: self.program.qualified_name(scope),
        })?;
        self.value_of_declaration(member, &Env::empty())
    }

    /// If `value` denotes a declaration scope (namespace, type, struct or
    /// constraint), returns it.
    fn as_scope(&self, value: &Value) -> Option<DeclId> {
        match value {
            Value::Scope(s) => Some(*s),
            Value::Callable(c) if c.args.is_empty() && self.program.decl(c.decl).kind == DeclKind::Struct => {
                Some(c.decl)
            }
            _ => None,
        }
    }

    /// `x.name` without a call.
    fn member_access(&mut self, value: Value, name: &str) -> Result<Value, CompileError> {
        if let Some(scope) = self.as_scope(&value) {
            return self.scope_member(scope, name);
        }
        if let Some(field) = self.field_of(&value, name) {
            return Ok(field);
        }

        let method = self.method_of(&value, name)?;
        let first = self.program.decl(method).inputs.first().cloned().ok_or_else(|| CompileError::NoMember {
            name: name.into(),
            on: self.describe(&value),
        })?;
        self.check_value(&self.program.qualified_name(method), &first.name, &first.constraint, &value)?;
        // Single-input methods are invoked; wider ones are partially applied.
        self.apply(Value::Callable(Callable::new(method, Env::empty())), vec![value])
    }

    /// `x.name(args)`.
    fn method_call(&mut self, receiver: Value, name: &str, args: Vec<Value>) -> Result<Value, CompileError> {
        if let Some(scope) = self.as_scope(&receiver) {
            let callee = self.scope_member(scope, name)?;
            return self.apply(callee, args);
        }
        if let Some(field) = self.field_of(&receiver, name) {
            return self.apply(field, args);
        }

        let method = self.method_of(&receiver, name)?;
        let m = self.program.decl(method);
        let callee = self.program.qualified_name(method);
        let Some(first) = m.inputs.first().filter(|_| m.inputs.len() == args.len() + 1) else {
            return Err(CompileError::ArgumentCount {
                callee,
                expected: m.inputs.len().saturating_sub(1),
                found: args.len(),
            });
        };
        self.check_value(&callee, &first.name, &first.constraint, &receiver)?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver);
        full.extend(args);
        self.apply(Value::Callable(Callable::new(method, Env::empty())), full)
    }

    fn field_of(&mut self, value: &Value, name: &str) -> Option<Value> {
        match value {
            Value::Record(r) => r.field(name).cloned(),
            Value::Instruction(id) => self.graph.field(*id, name).map(Value::Instruction),
            _ => None,
        }
    }

    /// Finds function `name` in the type scope of `value`.
    fn method_of(&self, value: &Value, name: &str) -> Result<DeclId, CompileError> {
        self.type_scope_of(value)
            .and_then(|scope| self.program.member(scope, name))
            .filter(|m| self.program.decl(*m).kind == DeclKind::Function)
            .ok_or_else(|| CompileError::NoMember {
                name: name.into(),
                on: self.describe(value),
            })
    }

    fn type_scope_of(&self, value: &Value) -> Option<DeclId> {
        match value {
            Value::Instruction(id) => match self.graph.shape(*id)? {
                Shape::Num => Some(self.program.num()),
                Shape::Bool => Some(self.program.boolean()),
                Shape::Record(r) => r.decl,
            },
            Value::Record(r) => Some(r.decl),
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Application
    // -----------------------------------------------------------------------

    /// Supplies `args` to a callable, compiling it once all ports are filled.
    pub(crate) fn apply(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, CompileError> {
        let Callable { decl, args: mut bound, env } = match callee {
            Value::Callable(c) => c,
            other => {
                return Err(CompileError::NotCallable {
                    what: self.describe(&other),
                })
            }
        };
        let d = self.program.decl(decl);
        if !matches!(d.kind, DeclKind::Function | DeclKind::Struct) {
            return Err(CompileError::NotCallable {
                what: self.program.qualified_name(decl),
            });
        }
        bound.extend(args);
        if !d.variadic && bound.len() > d.inputs.len() {
            return Err(CompileError::ArgumentCount {
                callee: self.program.qualified_name(decl),
                expected: d.inputs.len(),
                found: bound.len(),
            });
        }
        if bound.len() < d.inputs.len() {
            return Ok(Value::Callable(Callable { decl, args: bound, env }));
        }
        self.compile_call(decl, bound, &env)
    }

    /// Compiles a fully-applied call of `decl` with the environment the
    /// callable was created in.
    fn compile_call(&mut self, decl: DeclId, args: Vec<Value>, env: &Env) -> Result<Value, CompileError> {
        let d = self.program.decl(decl);
        let callee = self.program.qualified_name(decl);
        if args.len() < d.inputs.len() || (!d.variadic && args.len() > d.inputs.len()) {
            return Err(CompileError::ArgumentCount {
                callee,
                expected: d.inputs.len(),
                found: args.len(),
            });
        }
        for (port, arg) in d.inputs.iter().zip(&args) {
            self.check_value(&callee, &port.name, &port.constraint, arg)?;
        }

        if let Some(intrinsic) = d.intrinsic {
            return intrinsics::compile_intrinsic(self, decl, intrinsic, args);
        }
        match d.kind {
            DeclKind::Struct => Ok(self.construct(decl, args)),
            DeclKind::Function => self.invoke(decl, args, env),
            DeclKind::Namespace | DeclKind::Constraint => Err(CompileError::NotCallable { what: callee }),
        }
    }

    fn construct(&mut self, decl: DeclId, args: Vec<Value>) -> Value {
        let d = self.program.decl(decl);
        let ids = d
            .inputs
            .iter()
            .zip(&args)
            .map(|(p, v)| v.as_instruction().map(|id| (p.name.clone(), id)))
            .collect::<Option<Vec<_>>>();
        match ids {
            Some(fields) => Value::Instruction(self.graph.structure(Some(decl), d.name.clone(), fields)),
            None => Value::Record(RecordInstance {
                decl,
                fields: d.inputs.iter().map(|p| p.name.clone()).zip(args).collect(),
            }),
        }
    }

    fn invoke(&mut self, decl: DeclId, args: Vec<Value>, env: &Env) -> Result<Value, CompileError> {
        let identity: Vec<ArgIdentity> = args.iter().map(Value::identity).collect();
        let repeated = self
            .in_flight
            .iter()
            .position(|(d, ids)| *d == decl && *ids == identity)
            .or_else(|| {
                (self.in_flight.len() >= MAX_CALL_DEPTH)
                    .then(|| self.in_flight.iter().position(|(d, _)| *d == decl))
                    .flatten()
            });
        if let Some(pos) = repeated {
            let mut cycle: Vec<String> = self.in_flight[pos..]
                .iter()
                .map(|(d, _)| self.program.qualified_name(*d))
                .collect();
            cycle.push(self.program.qualified_name(decl));
            return Err(CompileError::CircularCompilation { cycle: cycle.join(" -> ") });
        }

        let d = self.program.decl(decl);
        let bindings: IndexMap<String, Value> = d.inputs.iter().map(|p| p.name.clone()).zip(args).collect();
        let frame = env.push(decl, bindings);

        self.in_flight.push((decl, identity));
        let result = self.compile_body(decl, &frame);
        self.in_flight.pop();

        let value = result?;
        let output = d.output;
        self.check_value(&self.program.qualified_name(decl), "return", &output, &value)?;
        Ok(value)
    }

    fn compile_body(&mut self, decl: DeclId, frame: &Env) -> Result<Value, CompileError> {
        let d = self.program.decl(decl);
        match &d.body {
            Body::Expression(expr) => self.compile_expr(expr, decl, frame),
            Body::Scope => {
                let ret = self.program.member(decl, RETURN_MEMBER).ok_or_else(|| CompileError::MissingBody {
                    name: self.program.qualified_name(decl),
                })?;
                self.value_of_declaration(ret, frame)
            }
            Body::None => Err(CompileError::MissingBody {
                name: self.program.qualified_name(decl),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Checks and conversions
    // -----------------------------------------------------------------------

    /// Checks `value` against a port or output constraint.
    fn check_value(&self, callee: &str, port: &str, constraint: &Constraint, value: &Value) -> Result<(), CompileError> {
        let ok = match constraint {
            Constraint::Any => true,
            Constraint::Num | Constraint::Bool => {
                matches!(value, Value::Instruction(id) if self.graph.size(*id) == 1)
            }
            Constraint::Struct(s) => match value {
                Value::Instruction(id) => match self.graph.shape(*id) {
                    Some(Shape::Record(r)) if r.decl == Some(*s) => true,
                    Some(shape) => self.program.constraint_size(constraint) == Some(shape.size()),
                    None => false,
                },
                Value::Record(r) => r.decl == *s,
                _ => false,
            },
            Constraint::Signature(sig) => match value {
                Value::Callable(c) => {
                    let target = self.program.decl(c.decl);
                    let remaining = target.inputs.len().saturating_sub(c.args.len());
                    target.variadic || remaining == self.program.decl(*sig).inputs.len()
                }
                _ => false,
            },
        };
        if ok {
            Ok(())
        } else {
            Err(CompileError::ShapeMismatch {
                callee: callee.into(),
                port: port.into(),
                expected: self.program.describe_constraint(constraint),
                found: self.describe(value),
            })
        }
    }

    fn is_instruction_like(&self, value: &Value) -> bool {
        match value {
            Value::Instruction(_) => true,
            Value::Record(r) => r.fields.iter().all(|(_, v)| self.is_instruction_like(v)),
            Value::Callable(_) | Value::Scope(_) => false,
        }
    }

    /// Converts a value that must be numeric into a node, collapsing records
    /// into `structure` nodes.
    pub(crate) fn to_instruction(&mut self, value: Value) -> Result<InstrId, CompileError> {
        match value {
            Value::Instruction(id) => Ok(id),
            Value::Record(r) => {
                let fields = r
                    .fields
                    .into_iter()
                    .map(|(name, v)| Ok((name, self.to_instruction(v)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                let name = self.program.decl(r.decl).name.clone();
                Ok(self.graph.structure(Some(r.decl), name, fields))
            }
            other => Err(CompileError::NotAnInstruction {
                detail: self.describe(&other),
            }),
        }
    }

    fn describe(&self, value: &Value) -> String {
        match value {
            Value::Instruction(id) => match self.graph.shape(*id) {
                Some(shape) => shape.to_string(),
                None => id.to_string(),
            },
            Value::Callable(c) if c.args.is_empty() => format!("function '{}'", self.program.qualified_name(c.decl)),
            Value::Callable(c) => format!(
                "function '{}' partially applied to {} argument(s)",
                self.program.qualified_name(c.decl),
                c.args.len()
            ),
            Value::Record(r) => format!("record '{}'", self.program.qualified_name(r.decl)),
            Value::Scope(s) => format!("scope '{}'", self.program.qualified_name(*s)),
        }
    }
}
