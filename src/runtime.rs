use std::{io::Write, path::Path};

use crate::{
    analysis::{self, Locals},
    ast::{printer::AstPrinter, Parser, Stmt, StmtVisitor},
    interpreter::Interpreter,
    lexer::{Scanner, Token},
    TlpsError,
};

/// A parsed and resolved source file, ready to be handed to an interpreter.
#[derive(Debug)]
pub struct Program {
    pub stmts: Vec<Stmt>,
    pub locals: Locals,
}

/// Runs the compile-time half of the pipeline: scanning, parsing and
/// resolution. Every diagnostic from every stage is collected; if any stage
/// reported a problem the program is not returned.
pub fn compile(source: &str) -> Result<Program, Vec<TlpsError>> {
    let mut errors = Vec::new();

    let tokens: Vec<Token> = Scanner::new(source)
        .filter_map(|token| match token {
            Ok(token) => Some(token),
            Err(e) => {
                errors.push(e);
                None
            }
        })
        .collect();
    tracing::debug!(tokens = tokens.len(), errors = errors.len(), "scanned source");

    let (stmts, parse_errors) = Parser::new(tokens).parse();
    tracing::debug!(statements = stmts.len(), errors = parse_errors.len(), "parsed source");
    errors.extend(parse_errors);

    // Resolving a partially parsed tree only produces noise.
    if !errors.is_empty() {
        return Err(errors);
    }

    let (locals, resolve_errors) = analysis::resolve(&stmts);
    tracing::debug!(locals = locals.len(), errors = resolve_errors.len(), "resolved variables");

    if !resolve_errors.is_empty() {
        return Err(resolve_errors);
    }

    Ok(Program { stmts, locals })
}

/// Owns one interpreter (and so one global scope) across any number of runs,
/// tracking whether compile-time or runtime errors have been reported.
pub struct Runtime {
    interpreter: Interpreter,
    errors: Box<dyn Write>,
    had_error: bool,
    had_runtime_error: bool,
    debug: bool,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output<W: Write + 'static>(self, output: W) -> Self {
        Self {
            interpreter: self.interpreter.with_output(Box::new(output)),
            ..self
        }
    }

    pub fn with_errors<W: Write + 'static>(self, errors: W) -> Self {
        Self {
            errors: Box::new(errors),
            ..self
        }
    }

    /// When enabled, each program's syntax tree is written to the error sink
    /// before it is evaluated.
    pub fn with_debug(self, debug: bool) -> Self {
        Self { debug, ..self }
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    pub fn reset_errors(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Compiles and evaluates `source` against the persistent global scope,
    /// reporting and returning any diagnostics produced along the way.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn run(&mut self, source: &str) -> Vec<TlpsError> {
        let program = match compile(source) {
            Ok(program) => program,
            Err(errors) => {
                self.had_error = true;
                errors.iter().for_each(|e| self.report(e));
                return errors;
            }
        };

        if self.debug {
            let mut printer = AstPrinter {};
            for stmt in program.stmts.iter() {
                let rendered = printer.visit_stmt(stmt);
                if let Err(e) = writeln!(self.errors, "{}", rendered) {
                    tracing::warn!(error = %e, "unable to write debug output");
                }
            }
        }

        self.interpreter.resolve(program.locals);
        let result = self.interpreter.interpret(&program.stmts);
        self.interpreter.flush();

        match result {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::debug!(error = %e, "evaluation aborted");
                self.had_runtime_error = true;
                self.report(&e);
                vec![e]
            }
        }
    }

    /// Loads a script and runs it with includes resolved relative to the
    /// script's own directory. Failing to read the file is the only error
    /// returned directly; diagnostics from the script itself are in the list.
    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<TlpsError>, TlpsError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;

        if let Some(dir) = path.parent() {
            self.interpreter.set_base_path(dir);
        }

        tracing::debug!(path = %path.display(), "running file");
        Ok(self.run(&source))
    }

    fn report(&mut self, error: &TlpsError) {
        if let Err(e) = writeln!(self.errors, "{}", error) {
            tracing::warn!(error = %e, "unable to report diagnostic");
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            interpreter: Interpreter::default(),
            errors: Box::new(std::io::stderr()),
            had_error: false,
            had_runtime_error: false,
            debug: false,
        }
    }
}
