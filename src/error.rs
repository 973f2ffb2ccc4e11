use thiserror::Error;

/// Top-level error type for the Element compiler and evaluator.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{}", format_error_pretty("compile error", &format!("{}", _0)))]
    Compile(#[from] CompileError),

    #[error("{}", format_error_pretty("evaluation error", &format!("{}", _0)))]
    Eval(#[from] EvalError),
}

/// Formats an error in a human-friendly style.
fn format_error_pretty(category: &str, msg: &str) -> String {
    format!("[{}] {}", category, msg)
}

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("cannot find '{name}' from '{scope}' — it is not a port, member or declaration visible in this scope")]
    UndefinedIdentifier { name: String, scope: String },

    #[error("'{name}' is already defined in '{scope}' — declarations in one scope must have unique names")]
    DuplicateDeclaration { name: String, scope: String },

    #[error("'{on}' has no member '{name}'")]
    NoMember { name: String, on: String },

    #[error("'{callee}' expects {expected} argument(s) but {found} were supplied")]
    ArgumentCount {
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("argument '{port}' of '{callee}' expects {expected} but was given {found}")]
    ShapeMismatch {
        callee: String,
        port: String,
        expected: String,
        found: String,
    },

    #[error("'{what}' cannot be called")]
    NotCallable { what: String },

    #[error("{detail} — this value cannot be represented as an instruction")]
    NotAnInstruction { detail: String },

    #[error("'{name}' cannot be used as an entry point — {detail}")]
    BoundaryInterface { name: String, detail: String },

    #[error("circular compilation: {cycle} — recursion is not supported")]
    CircularCompilation { cycle: String },

    #[error("'{name}' has neither a body nor an intrinsic implementation")]
    MissingBody { name: String },

    #[error("unsupported — {detail}")]
    Unsupported { detail: String },
}

// ---------------------------------------------------------------------------
// Evaluation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("output capacity {capacity} is smaller than the result size {required}")]
    OutputTooSmall { required: usize, capacity: usize },

    #[error("boundary input slot {index} is out of range — only {len} input value(s) were supplied")]
    InputOutOfRange { index: usize, len: usize },

    #[error("internal error: loop placeholder scope {scope} read outside of its loop")]
    UnboundPlaceholder { scope: u32 },

    #[error("iteration limit of {limit} exceeded")]
    IterationLimit { limit: u64 },

    #[error("internal error: instruction %{id} does not exist in this graph")]
    UnknownInstruction { id: u32 },
}

impl Error {
    /// Returns a diagnostic code string for this error.
    pub fn diagnostic_code(&self) -> &'static str {
        match self {
            Error::Compile(c) => match c {
                CompileError::UndefinedIdentifier { .. } => "E0100",
                CompileError::DuplicateDeclaration { .. } => "E0101",
                CompileError::NoMember { .. } => "E0102",
                CompileError::ArgumentCount { .. } => "E0103",
                CompileError::ShapeMismatch { .. } => "E0104",
                CompileError::NotCallable { .. } => "E0105",
                CompileError::NotAnInstruction { .. } => "E0106",
                CompileError::BoundaryInterface { .. } => "E0107",
                CompileError::CircularCompilation { .. } => "E0108",
                CompileError::MissingBody { .. } => "E0109",
                CompileError::Unsupported { .. } => "E0110",
            },
            Error::Eval(e) => match e {
                EvalError::OutputTooSmall { .. } => "E0400",
                EvalError::InputOutOfRange { .. } => "E0401",
                EvalError::UnboundPlaceholder { .. } => "E0402",
                EvalError::IterationLimit { .. } => "E0403",
                EvalError::UnknownInstruction { .. } => "E0404",
            },
        }
    }
}
