use crate::scope::DeclId;

/// A resolved body expression.
///
/// The syntax layer has already parsed the source and validated the grammar;
/// identifiers are still names and are resolved by the compiler against the
/// declaration's lexical scope and the ports bound at the call.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(f32),
    Ident(String),
    /// `base.name`
    Member(Box<Expr>, String),
    /// `callee(args...)`
    Call(Box<Expr>, Vec<Expr>),
    /// `_(ports) = body`, registered as an anonymous function declaration.
    Lambda(DeclId),
}

impl Expr {
    pub fn num(value: f32) -> Self {
        Expr::Literal(value)
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    /// Builds `a.b.c` from a dotted path.
    pub fn path(path: &str) -> Self {
        let mut parts = path.split('.');
        let first = parts.next().unwrap_or_default();
        parts.fold(Expr::ident(first), |acc, part| acc.member(part))
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member(Box::new(self), name.into())
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(self), args)
    }

    /// `self.name(args...)`
    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Self {
        self.member(name).call(args)
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::Literal(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::ident(name)
    }
}
