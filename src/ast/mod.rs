mod expr;
mod parser;
pub mod printer;
mod stmt;
mod value;

pub use expr::{Expr, ExprId, ExprVisitor};
pub use parser::Parser;
pub use stmt::{FunDecl, Stmt, StmtVisitor};
pub use value::Literal;
