use indexmap::IndexMap;

use crate::compile::intrinsics::Intrinsic;
use crate::error::CompileError;
use crate::scope::{Body, Constraint, DeclId, DeclKind, Declaration, Expr, Port, Program};

/// Name given to anonymous (lambda) declarations.
pub const LAMBDA_NAME: &str = "_";

/// Builder for constructing a `Program` incrementally.
///
/// `new()` registers the intrinsic prelude (`Num`, `Bool`, `if`, `for`,
/// `iterate`, `select`) in the global namespace. Declarations can then be
/// added under any scope; a declaration must exist before it is referenced by
/// a port constraint, but bodies may refer to declarations added later.
pub struct ProgramBuilder {
    decls: Vec<Declaration>,
    root: DeclId,
    num: DeclId,
    boolean: DeclId,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        let root = Declaration {
            id: DeclId(0),
            name: String::new(),
            kind: DeclKind::Namespace,
            parent: None,
            inputs: Vec::new(),
            output: Constraint::Any,
            body: Body::None,
            intrinsic: None,
            variadic: false,
            members: IndexMap::new(),
        };
        let mut builder = Self {
            decls: vec![root],
            root: DeclId(0),
            num: DeclId(0),
            boolean: DeclId(0),
        };
        let (num, boolean) = crate::stdlib::register_prelude(&mut builder);
        builder.num = num;
        builder.boolean = boolean;
        builder
    }

    pub fn root(&self) -> DeclId {
        self.root
    }

    pub fn num(&self) -> DeclId {
        self.num
    }

    pub fn boolean(&self) -> DeclId {
        self.boolean
    }

    pub fn add_namespace(&mut self, parent: DeclId, name: &str) -> Result<DeclId, CompileError> {
        self.push(parent, name, DeclKind::Namespace, Vec::new(), Constraint::Any, Body::None)
    }

    /// Adds a record constructor; `fields` are its input ports in order.
    pub fn add_struct(&mut self, parent: DeclId, name: &str, fields: Vec<Port>) -> Result<DeclId, CompileError> {
        let id = self.push(parent, name, DeclKind::Struct, fields, Constraint::Any, Body::None)?;
        self.decls[id.0 as usize].output = Constraint::Struct(id);
        Ok(id)
    }

    /// Adds a named function signature usable as `Constraint::Signature`.
    pub fn add_constraint(
        &mut self,
        parent: DeclId,
        name: &str,
        inputs: Vec<Port>,
        output: Constraint,
    ) -> Result<DeclId, CompileError> {
        self.push(parent, name, DeclKind::Constraint, inputs, output, Body::None)
    }

    pub fn add_function(
        &mut self,
        parent: DeclId,
        name: &str,
        inputs: Vec<Port>,
        output: Constraint,
        body: Body,
    ) -> Result<DeclId, CompileError> {
        self.push(parent, name, DeclKind::Function, inputs, output, body)
    }

    /// Shorthand for a zero-input, expression-bodied member such as a local
    /// binding `x = a.add(1)` or a scope body's `return`.
    pub fn add_binding(&mut self, parent: DeclId, name: &str, value: Expr) -> Result<DeclId, CompileError> {
        self.add_function(parent, name, Vec::new(), Constraint::Any, Body::Expression(value))
    }

    /// Adds an anonymous function `_(inputs) = body` inside `parent`. Lambdas
    /// are not members of any scope; reference them with `Expr::Lambda`.
    pub fn add_lambda(&mut self, parent: DeclId, inputs: Vec<Port>, body: Expr) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            id,
            name: LAMBDA_NAME.into(),
            kind: DeclKind::Function,
            parent: Some(parent),
            inputs,
            output: Constraint::Any,
            body: Body::Expression(body),
            intrinsic: None,
            variadic: false,
            members: IndexMap::new(),
        });
        id
    }

    /// Replaces the body of an existing declaration. Used when the body refers
    /// to lambdas that can only be created once the declaration exists.
    pub fn set_body(&mut self, id: DeclId, body: Body) {
        if let Some(decl) = self.decls.get_mut(id.0 as usize) {
            decl.body = body;
        }
    }

    pub(crate) fn add_intrinsic(
        &mut self,
        parent: DeclId,
        name: &str,
        kind: DeclKind,
        inputs: Vec<Port>,
        output: Constraint,
        intrinsic: Intrinsic,
    ) -> DeclId {
        let id = self.push_unchecked(parent, name, kind, inputs, output, Body::None);
        let decl = &mut self.decls[id.0 as usize];
        decl.intrinsic = Some(intrinsic);
        decl.variadic = intrinsic.is_variadic();
        id
    }

    pub fn build(self) -> Program {
        Program {
            decls: self.decls,
            root: self.root,
            num: self.num,
            boolean: self.boolean,
        }
    }

    fn push(
        &mut self,
        parent: DeclId,
        name: &str,
        kind: DeclKind,
        inputs: Vec<Port>,
        output: Constraint,
        body: Body,
    ) -> Result<DeclId, CompileError> {
        let Some(scope) = self.decls.get(parent.0 as usize) else {
            return Err(CompileError::UndefinedIdentifier {
                name: name.into(),
                scope: format!("declaration #{}", parent.0),
            });
        };
        if scope.members.contains_key(name) {
            return Err(CompileError::DuplicateDeclaration {
                name: name.into(),
                scope: if scope.name.is_empty() { "<root>".into() } else { scope.name.clone() },
            });
        }
        Ok(self.push_unchecked(parent, name, kind, inputs, output, body))
    }

    fn push_unchecked(
        &mut self,
        parent: DeclId,
        name: &str,
        kind: DeclKind,
        inputs: Vec<Port>,
        output: Constraint,
        body: Body,
    ) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            id,
            name: name.into(),
            kind,
            parent: Some(parent),
            inputs,
            output,
            body,
            intrinsic: None,
            variadic: false,
            members: IndexMap::new(),
        });
        self.decls[parent.0 as usize].members.insert(name.into(), id);
        id
    }
}
