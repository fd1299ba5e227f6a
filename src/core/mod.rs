pub mod errors;
mod output;
mod stack;

pub use output::CaptureOutput;
pub(crate) use stack::ensure_sufficient_stack;
