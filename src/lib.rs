mod core;
pub mod analysis;
pub mod ast;
pub mod cmdline;
pub mod interpreter;
pub mod lexer;
pub mod runtime;

pub use crate::core::errors::{self, TlpsError};
pub use crate::core::CaptureOutput;
pub use runtime::Runtime;
