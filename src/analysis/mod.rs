use fnv::FnvHashMap;

use crate::{
    ast::{ExprId, Stmt},
    TlpsError,
};

mod resolver;

pub use resolver::Resolver;

/// Scope distances for every locally-bound variable reference. References
/// which are absent are looked up in the global environment.
pub type Locals = FnvHashMap<ExprId, usize>;

/// Binds every variable reference in `stmts` to the lexical scope which declares
/// it, reporting semantic errors along the way without stopping at the first.
pub fn resolve(stmts: &[Stmt]) -> (Locals, Vec<TlpsError>) {
    let mut resolver = Resolver::default();
    let errs = resolver.resolve(stmts);
    (resolver.into_locals(), errs)
}
