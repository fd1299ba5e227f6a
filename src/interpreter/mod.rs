mod class;
mod env;
mod fun;
mod inter;
mod natives;
mod value;
mod visitor;

pub use class::{Class, Instance};
pub use env::Environment;
pub use fun::{Arity, Callable, Closure, NativeFun};
pub use inter::{Flow, Interpreter};
pub use value::Value;
