//! Declaration/Scope View.
//!
//! A `Program` is a tree of declarations (namespaces, structs, constraints,
//! functions) rooted at an anonymous global namespace. It is produced by name
//! resolution outside this crate, or built directly with `ProgramBuilder`, and
//! is only ever read by the compiler.

pub mod builder;
pub mod expr;

pub use builder::ProgramBuilder;
pub use expr::Expr;

use indexmap::IndexMap;

use crate::compile::intrinsics::Intrinsic;

/// An opaque index of a declaration within its `Program`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Function,
    /// Record constructor; its input ports are the record's fields.
    Struct,
    /// A named function signature usable as a port type.
    Constraint,
    Namespace,
}

/// A type constraint on a port or a function result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    Any,
    Num,
    Bool,
    /// Values of the record signature declared by a struct.
    Struct(DeclId),
    /// Functions matching a constraint declaration's signature.
    Signature(DeclId),
}

impl Constraint {
    /// Structural compatibility: can a value known to satisfy `other` be
    /// passed where `self` is required?
    pub fn is_satisfied_by(&self, other: &Constraint, program: &Program) -> bool {
        match (self, other) {
            (Constraint::Any, _) => true,
            (Constraint::Num, Constraint::Num) | (Constraint::Bool, Constraint::Bool) => true,
            (Constraint::Struct(a), Constraint::Struct(b)) => a == b,
            (Constraint::Signature(a), Constraint::Signature(b)) => {
                a == b || program.decl(*a).inputs.len() == program.decl(*b).inputs.len()
            }
            _ => false,
        }
    }
}

/// A named, typed input of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    pub name: String,
    pub constraint: Constraint,
}

impl Port {
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    pub fn num(name: impl Into<String>) -> Self {
        Self::new(name, Constraint::Num)
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, Constraint::Any)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Intrinsics, structs, namespaces and constraints.
    None,
    /// `f(a) = a.add(1)`
    Expression(Expr),
    /// `f(a) { x = ...; return = ... }`: members are declared in the
    /// function's scope and the result is the `return` member.
    Scope,
}

/// Name of the member holding a scope-bodied function's result.
pub const RETURN_MEMBER: &str = "return";

#[derive(Debug, Clone)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub parent: Option<DeclId>,
    pub inputs: Vec<Port>,
    pub output: Constraint,
    pub body: Body,
    pub intrinsic: Option<Intrinsic>,
    /// Accepts any number of arguments beyond `inputs`.
    pub variadic: bool,
    pub(crate) members: IndexMap<String, DeclId>,
}

impl Declaration {
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    pub fn output(&self) -> Constraint {
        self.output
    }

    pub fn is_intrinsic(&self) -> bool {
        self.intrinsic.is_some()
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn arity(&self) -> usize {
        self.inputs.len()
    }

    /// Member names in declaration order.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }
}

/// The resolved declaration tree handed to the compiler.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) decls: Vec<Declaration>,
    pub(crate) root: DeclId,
    pub(crate) num: DeclId,
    pub(crate) boolean: DeclId,
}

impl Program {
    /// The global namespace.
    pub fn root(&self) -> DeclId {
        self.root
    }

    /// The intrinsic `Num` type, whose scope holds the arithmetic intrinsics.
    pub fn num(&self) -> DeclId {
        self.num
    }

    /// The intrinsic `Bool` type.
    pub fn boolean(&self) -> DeclId {
        self.boolean
    }

    pub fn get(&self, id: DeclId) -> Option<&Declaration> {
        self.decls.get(id.0 as usize)
    }

    /// Returns the declaration for `id`.
    ///
    /// Panics if `id` was not produced by this program.
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    /// A direct member of `scope`.
    pub fn member(&self, scope: DeclId, name: &str) -> Option<DeclId> {
        self.get(scope)?.members.get(name).copied()
    }

    /// Resolves a dotted name from `scope`. With `recurse`, the first segment
    /// is searched outward through enclosing scopes; later segments are
    /// always direct members.
    pub fn lookup(&self, scope: DeclId, qualified_name: &str, recurse: bool) -> Option<DeclId> {
        let mut parts = qualified_name.split('.');
        let first = parts.next()?;
        let mut current = if recurse {
            let mut search = Some(scope);
            let mut found = None;
            while let Some(s) = search {
                if let Some(id) = self.member(s, first) {
                    found = Some(id);
                    break;
                }
                search = self.get(s)?.parent;
            }
            found?
        } else {
            self.member(scope, first)?
        };
        for part in parts {
            current = self.member(current, part)?;
        }
        Some(current)
    }

    /// Dotted name from the root, e.g. `Num.add`.
    pub fn qualified_name(&self, id: DeclId) -> String {
        let mut parts = Vec::new();
        let mut current = self.get(id);
        while let Some(decl) = current {
            if decl.parent.is_some() {
                parts.push(decl.name.as_str());
            }
            current = decl.parent.and_then(|p| self.get(p));
        }
        if parts.is_empty() {
            return "<root>".into();
        }
        parts.reverse();
        parts.join(".")
    }

    /// Scalar slot count of values satisfying `constraint`, or `None` when
    /// the constraint has no fixed serializable shape.
    pub fn constraint_size(&self, constraint: &Constraint) -> Option<usize> {
        self.constraint_size_inner(constraint, 0)
    }

    fn constraint_size_inner(&self, constraint: &Constraint, depth: usize) -> Option<usize> {
        // Struct nesting deeper than the declaration count means a struct contains itself.
        if depth > self.decls.len() {
            return None;
        }
        match constraint {
            Constraint::Num | Constraint::Bool => Some(1),
            Constraint::Any | Constraint::Signature(_) => None,
            Constraint::Struct(id) => {
                let decl = self.get(*id)?;
                if decl.is_intrinsic() {
                    return None;
                }
                decl.inputs
                    .iter()
                    .map(|p| self.constraint_size_inner(&p.constraint, depth + 1))
                    .sum()
            }
        }
    }

    pub fn describe_constraint(&self, constraint: &Constraint) -> String {
        match constraint {
            Constraint::Any => "Any".into(),
            Constraint::Num => "Num".into(),
            Constraint::Bool => "Bool".into(),
            Constraint::Struct(id) | Constraint::Signature(id) => self.qualified_name(*id),
        }
    }
}
