pub mod graph;
pub mod instr;
pub mod intern;
pub mod printer;
pub mod shape;

pub use graph::{InstrGraph, Node};
pub use instr::{BinaryOp, InstrId, Instruction, NullaryOp, UnaryOp, BOUNDARY_SCOPE};
pub use intern::{InternCache, InternStats};
pub use shape::{RecordShape, Shape};
