use std::{io::Write, path::PathBuf};

use crate::{
    analysis::Locals,
    ast::{ExprId, Stmt, StmtVisitor},
    core::ensure_sufficient_stack,
    errors,
    lexer::Token,
    TlpsError,
};

use super::{env::Environment, natives, Value};

/// The result of executing a statement: either carry on with the next one, or
/// unwind to the nearest enclosing call with a return value.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Calls and includes nested deeper than this are reported as a runtime error.
const MAX_CALL_DEPTH: usize = 20_000;

pub struct Interpreter {
    pub(super) globals: Environment,
    pub(super) env: Environment,
    pub(super) locals: Locals,
    pub(super) base_path: PathBuf,
    pub(super) depth: usize,
    pub output: Box<dyn Write>,
}

impl Interpreter {
    /// Executes top-level statements in order, stopping at the first runtime error.
    pub fn interpret(&mut self, stmts: &[Stmt]) -> Result<(), TlpsError> {
        for stmt in stmts.iter() {
            // The resolver rejects top-level returns, so the flow is always normal here.
            self.visit_stmt(stmt)?;
        }

        Ok(())
    }

    /// Records scope distances produced by the resolver for a newly parsed tree.
    pub fn resolve(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    pub fn with_output(self, output: Box<dyn Write>) -> Self {
        Self { output, ..self }
    }

    pub fn set_base_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.base_path = path.into();
    }

    /// Runs `stmts` in `env`, restoring the current environment afterwards even
    /// when a statement fails.
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt], env: Environment) -> Result<Flow, TlpsError> {
        let previous = std::mem::replace(&mut self.env, env);

        let mut result = Ok(Flow::Normal);
        for stmt in stmts {
            match self.visit_stmt(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.env = previous;
        result
    }

    /// Runs `f` one call level deeper, growing the native stack as needed and
    /// failing at `at` once the nesting limit is reached.
    pub(super) fn nested<T>(
        &mut self,
        at: &Token,
        f: impl FnOnce(&mut Self) -> Result<T, TlpsError>,
    ) -> Result<T, TlpsError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(errors::runtime(at, "Stack overflow."));
        }

        self.depth += 1;
        let result = ensure_sufficient_stack(|| f(self));
        self.depth -= 1;

        result
    }

    pub(super) fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, TlpsError> {
        match self.locals.get(&id) {
            Some(distance) => self
                .env
                .get_at(*distance, name.lexeme())
                .ok_or_else(|| errors::runtime(name, format!("Undefined variable '{}'.", name.lexeme()))),
            None => self.globals.get(name),
        }
    }

    pub(crate) fn write_line(&mut self, text: &str) -> Result<(), TlpsError> {
        writeln!(self.output, "{}", text).map_err(|e| errors::native(format!("Unable to write output: {}.", e)))
    }

    pub(crate) fn flush(&mut self) {
        // Nothing useful can be done if flushing fails on the way out.
        let _ = self.output.flush();
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        let globals = Environment::new();
        natives::install(&globals);

        Self {
            env: globals.clone(),
            globals,
            locals: Locals::default(),
            base_path: PathBuf::new(),
            depth: 0,
            output: Box::new(std::io::stdout()),
        }
    }
}
