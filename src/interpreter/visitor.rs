use std::{path::Path, rc::Rc};

use fnv::FnvHashMap;

use crate::{
    ast::{Expr, ExprId, ExprVisitor, FunDecl, Literal, Stmt, StmtVisitor},
    errors,
    lexer::{Token, TokenType},
    TlpsError,
};

use super::{class::Class, fun::Closure, Arity, Callable, Flow, Interpreter, Value};

fn number_operands(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64), TlpsError> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => Ok((*left, *right)),
        _ => Err(errors::runtime(op, "Operands must be numbers.")),
    }
}

impl ExprVisitor<Result<Value, TlpsError>> for Interpreter {
    fn visit_assign(&mut self, id: ExprId, name: &Token, value: &Expr) -> Result<Value, TlpsError> {
        let value = self.visit_expr(value)?;

        match self.locals.get(&id) {
            Some(distance) => {
                if !self.env.assign_at(*distance, name.lexeme(), value.clone()) {
                    return Err(errors::runtime(name, format!("Undefined variable '{}'.", name.lexeme())));
                }
            }
            None => self.globals.assign(name, value.clone())?,
        }

        Ok(value)
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, TlpsError> {
        let left = self.visit_expr(left)?;
        let right = self.visit_expr(right)?;

        match op.token_type() {
            TokenType::BangEqual => Ok(Value::Bool(left != right)),
            TokenType::EqualEqual => Ok(Value::Bool(left == right)),
            TokenType::Greater => number_operands(op, &left, &right).map(|(l, r)| Value::Bool(l > r)),
            TokenType::GreaterEqual => number_operands(op, &left, &right).map(|(l, r)| Value::Bool(l >= r)),
            TokenType::Less => number_operands(op, &left, &right).map(|(l, r)| Value::Bool(l < r)),
            TokenType::LessEqual => number_operands(op, &left, &right).map(|(l, r)| Value::Bool(l <= r)),
            TokenType::Minus => number_operands(op, &left, &right).map(|(l, r)| Value::Number(l - r)),
            TokenType::Slash => number_operands(op, &left, &right).map(|(l, r)| Value::Number(l / r)),
            TokenType::Star => number_operands(op, &left, &right).map(|(l, r)| Value::Number(l * r)),
            TokenType::Plus => match (left, right) {
                (Value::Number(left), Value::Number(right)) => Ok(Value::Number(left + right)),
                (Value::String(left), Value::String(right)) => Ok(Value::String(left + &right)),
                _ => Err(errors::runtime(op, "Operands must be two numbers or two strings.")),
            },
            _ => Err(errors::runtime(op, format!("Unknown binary operator '{}'.", op.lexeme()))),
        }
    }

    fn visit_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> Result<Value, TlpsError> {
        let callee = self.visit_expr(callee)?;

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.visit_expr(arg)?);
        }

        let Value::Callable(callable) = callee else {
            return Err(errors::runtime(paren, "Can only call functions and classes."));
        };

        if let Arity::Fixed(expected) = callable.arity() {
            if !callable.arity().accepts(values.len()) {
                return Err(errors::runtime(
                    paren,
                    format!("Expected {} arguments but got {}.", expected, values.len()),
                ));
            }
        }

        self.nested(paren, |interpreter| callable.call(interpreter, values))
            .map_err(|e| e.with_line_if_missing(paren.line()))
    }

    fn visit_get(&mut self, obj: &Expr, name: &Token) -> Result<Value, TlpsError> {
        match self.visit_expr(obj)? {
            Value::Instance(instance) => instance.get(name),
            _ => Err(errors::runtime(name, "Only instances have properties.")),
        }
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Result<Value, TlpsError> {
        self.visit_expr(expr)
    }

    fn visit_literal(&mut self, value: &Literal) -> Result<Value, TlpsError> {
        Ok(value.into())
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, TlpsError> {
        let left = self.visit_expr(left)?;

        match op.token_type() {
            TokenType::Or if left.is_truthy() => Ok(left),
            TokenType::And if !left.is_truthy() => Ok(left),
            _ => self.visit_expr(right),
        }
    }

    fn visit_set(&mut self, obj: &Expr, name: &Token, value: &Expr) -> Result<Value, TlpsError> {
        let Value::Instance(instance) = self.visit_expr(obj)? else {
            return Err(errors::runtime(name, "Only instances have fields."));
        };

        let value = self.visit_expr(value)?;
        instance.set(name, value.clone());
        Ok(value)
    }

    fn visit_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value, TlpsError> {
        // `super` lives one frame above the frame binding `this`.
        let distance = self
            .locals
            .get(&id)
            .copied()
            .ok_or_else(|| errors::runtime(keyword, "Can't use 'super' here."))?;

        let superclass = match self.env.get_at(distance, "super") {
            Some(Value::Callable(Callable::Class(class))) => class,
            _ => return Err(errors::runtime(keyword, "Can't use 'super' here.")),
        };

        let instance = match distance.checked_sub(1).and_then(|d| self.env.get_at(d, "this")) {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(errors::runtime(keyword, "Can't use 'super' here.")),
        };

        match superclass.find_method(method.lexeme()) {
            Some(found) => Ok(Value::Callable(Callable::Closure(Rc::new(found.bind(&instance))))),
            None => Err(errors::runtime(
                method,
                format!("Undefined property '{}' on superclass {}.", method.lexeme(), superclass.name()),
            )),
        }
    }

    fn visit_this(&mut self, id: ExprId, keyword: &Token) -> Result<Value, TlpsError> {
        self.look_up_variable(id, keyword)
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> Result<Value, TlpsError> {
        let right = self.visit_expr(expr)?;

        match op.token_type() {
            TokenType::Minus => match right.as_number() {
                Some(num) => Ok(Value::Number(-num)),
                None => Err(errors::runtime(op, "Operand must be a number.")),
            },
            TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => Err(errors::runtime(op, format!("Unknown unary operator '{}'.", op.lexeme()))),
        }
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Result<Value, TlpsError> {
        self.look_up_variable(id, name)
    }
}

impl StmtVisitor<Result<Flow, TlpsError>> for Interpreter {
    fn visit_block(&mut self, stmts: &[Stmt]) -> Result<Flow, TlpsError> {
        let env = self.env.branch();
        self.execute_block(stmts, env)
    }

    fn visit_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunDecl>]) -> Result<Flow, TlpsError> {
        let superclass = match superclass {
            Some(expr) => match self.visit_expr(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let offender = match expr {
                        Expr::Var(_, token) => token,
                        _ => name,
                    };

                    return Err(errors::runtime(
                        offender,
                        format!("Superclass must be a class, but '{}' is not.", offender.lexeme()),
                    ));
                }
            },
            None => None,
        };

        // Visible before the body is built, so methods can name their own class.
        self.env.define(name.lexeme(), Value::Nil);

        let enclosing = self.env.clone();
        if let Some(superclass) = &superclass {
            self.env = self.env.branch();
            self.env
                .define("super", Value::Callable(Callable::Class(superclass.clone())));
        }

        let methods: FnvHashMap<String, Rc<Closure>> = methods
            .iter()
            .map(|method| {
                let closure = Closure::new(method.clone(), self.env.clone(), method.name.lexeme() == "init");
                (method.name.lexeme().to_string(), Rc::new(closure))
            })
            .collect();

        tracing::trace!(class = name.lexeme(), methods = methods.len(), "declared class");
        let class = Class::new(name.lexeme(), superclass, methods);

        self.env = enclosing;
        self.env.assign(name, Value::Callable(Callable::Class(Rc::new(class))))?;

        Ok(Flow::Normal)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Result<Flow, TlpsError> {
        self.visit_expr(expr)?;
        Ok(Flow::Normal)
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Result<Flow, TlpsError> {
        let closure = Closure::new(decl.clone(), self.env.clone(), false);
        self.env
            .define(decl.name.lexeme(), Value::Callable(Callable::Closure(Rc::new(closure))));
        Ok(Flow::Normal)
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Result<Flow, TlpsError> {
        if self.visit_expr(cond)?.is_truthy() {
            self.visit_stmt(then_branch)
        } else if let Some(else_branch) = else_branch {
            self.visit_stmt(else_branch)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn visit_include(&mut self, path: &Token) -> Result<Flow, TlpsError> {
        let relative = match path.literal() {
            Some(Literal::String(relative)) => relative.clone(),
            _ => path.lexeme().trim_matches('"').to_string(),
        };

        let full_path = self.base_path.join(&relative);
        tracing::trace!(path = %full_path.display(), "including file");

        let source = std::fs::read_to_string(&full_path)
            .map_err(|e| errors::runtime(path, format!("Could not read '{}': {}.", relative, e)))?;

        let program = crate::runtime::compile(&source).map_err(|errs| errors::include(path, relative.as_str(), errs))?;
        self.resolve(program.locals);

        // Included declarations land in the global scope, wherever the include appears.
        let base_path = std::mem::replace(
            &mut self.base_path,
            full_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        );
        let env = std::mem::replace(&mut self.env, self.globals.clone());

        let result = self.nested(path, |interpreter| interpreter.interpret(&program.stmts));

        self.env = env;
        self.base_path = base_path;

        result.map(|_| Flow::Normal)
    }

    fn visit_print(&mut self, expr: &Expr) -> Result<Flow, TlpsError> {
        let value = self.visit_expr(expr)?;
        self.write_line(&value.to_string())
            .map_err(|e| e.with_line_if_missing(expr_line(expr)))?;
        Ok(Flow::Normal)
    }

    fn visit_return(&mut self, _keyword: &Token, value: Option<&Expr>) -> Result<Flow, TlpsError> {
        let value = match value {
            Some(value) => self.visit_expr(value)?,
            None => Value::Nil,
        };

        Ok(Flow::Return(value))
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Result<Flow, TlpsError> {
        let value = match init {
            Some(init) => self.visit_expr(init)?,
            None => Value::Nil,
        };

        self.env.define(name.lexeme(), value);
        Ok(Flow::Normal)
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> Result<Flow, TlpsError> {
        while self.visit_expr(cond)?.is_truthy() {
            if let Flow::Return(value) = self.visit_stmt(body)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }
}

fn expr_line(expr: &Expr) -> usize {
    match expr {
        Expr::Assign(_, token, _)
        | Expr::Binary(_, token, _)
        | Expr::Call(_, token, _)
        | Expr::Get(_, token)
        | Expr::Logical(_, token, _)
        | Expr::Set(_, token, _)
        | Expr::Super(_, token, _)
        | Expr::This(_, token)
        | Expr::Unary(token, _)
        | Expr::Var(_, token) => token.line(),
        Expr::Grouping(inner) => expr_line(inner),
        Expr::Literal(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        analysis::resolve,
        ast::Parser,
        lexer::Scanner,
        CaptureOutput,
    };

    use super::*;

    fn run(source: &str) -> (String, Result<(), TlpsError>) {
        let (stmts, errs) = Parser::new(Scanner::new(source).filter_map(|t| t.ok())).parse();
        assert!(errs.is_empty(), "no parse errors, got {:?}", errs);
        let (locals, errs) = resolve(&stmts);
        assert!(errs.is_empty(), "no resolution errors, got {:?}", errs);

        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
        interpreter.resolve(locals);
        let result = interpreter.interpret(&stmts);
        (output.contents(), result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        result.expect("no runtime errors");
        output
    }

    fn runtime_error_of(source: &str) -> String {
        let (_, result) = run(source);
        result.expect_err("a runtime error").to_string()
    }

    #[test]
    fn test_basic_math() {
        let tree = Parser::new(Scanner::new("10 - 12 / (2 * 3)").filter_map(|x| x.ok()))
            .parse_expr()
            .expect("no errors");

        let mut interpreter = Interpreter::default();
        let result = interpreter.visit_expr(&tree).expect("no errors");
        assert_eq!(result, Value::Number(8.0));
    }

    #[test]
    fn block_shadowing_leaves_outer_binding() {
        assert_eq!(output_of("var x = 1; { var x = 2; } print(x);"), "1\n");
        assert_eq!(output_of("var x = 1; { x = 2; } print x;"), "2\n");
    }

    #[test]
    fn functions_return_values() {
        assert_eq!(output_of("fun add(a, b) { return a + b; } print(add(2, 3));"), "5\n");
        assert_eq!(output_of("fun nothing() {} print nothing();"), "nil\n");
        assert_eq!(
            output_of("fun first() { while (true) { { return 1; } } } print first();"),
            "1\n"
        );
    }

    #[test]
    fn closures_capture_their_declaring_scope() {
        let source = r#"
            fun counter() {
                var count = 0;
                fun inc() { count = count + 1; return count; }
                fun get() { return count; }
                var pair = Pair(inc, get);
                return pair;
            }
            class Pair { init(a, b) { this.a = a; this.b = b; } }
            var c = counter();
            c.a();
            c.a();
            print c.b();
        "#;

        assert_eq!(output_of(source), "2\n");
    }

    #[test]
    fn closures_bind_statically() {
        let source = r#"
            var a = "global";
            {
                fun show() { print a; }
                show();
                var a = "block";
                show();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(output_of("print nil or \"x\"; print 0 and 2; print false and 1; print 1 or 2;"), "x\n2\nfalse\n1\n");
    }

    #[test]
    fn truthiness_of_zero_and_empty_string() {
        assert_eq!(output_of("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\";"), "zero\nempty\n");
    }

    #[test]
    fn arithmetic_type_errors() {
        assert_eq!(runtime_error_of("print 1 + \"a\";"), "Operands must be two numbers or two strings.\n[line 1]");
        assert_eq!(runtime_error_of("print \"a\" < \"b\";"), "Operands must be numbers.\n[line 1]");
        assert_eq!(runtime_error_of("print -\"a\";"), "Operand must be a number.\n[line 1]");
        assert_eq!(output_of("print \"a\" + \"b\"; print 1 == \"1\";"), "ab\nfalse\n");
    }

    #[test]
    fn counter_class() {
        let source = r#"
            class Counter {
                init(start) { this.n = start; }
                inc() { return this.n = this.n + 1; }
            }
            var c = Counter(0);
            c.inc();
            c.inc();
            print c.n;
        "#;

        assert_eq!(output_of(source), "2\n");
    }

    #[test]
    fn super_calls_keep_the_receiver() {
        let source = r#"
            class A { greet() { return "A" + this.tag; } }
            class B < A { greet() { return super.greet() + "B"; } }
            var b = B();
            b.tag = "!";
            print b.greet();
        "#;

        assert_eq!(output_of(source), "A!B\n");
    }

    #[test]
    fn inherited_methods_resolve() {
        let source = r#"
            class A { name() { return "a"; } }
            class B < A {}
            print B().name();
        "#;

        assert_eq!(output_of(source), "a\n");
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = r#"
            class Box { init(v) { this.v = v; } get() { return this.v; } }
            var m = Box(7).get;
            print m();
        "#;

        assert_eq!(output_of(source), "7\n");
    }

    #[test]
    fn constructor_arity() {
        let source = "class P { init(a, b) {} } P(1);";
        assert_eq!(runtime_error_of(source), "Expected 2 arguments but got 1.\n[line 1]");

        assert_eq!(output_of("class E {} var e = E(); e.x = 1; print e.x;"), "1\n");
        assert_eq!(runtime_error_of("class E {} E(1);"), "Expected 0 arguments but got 1.\n[line 1]");
    }

    #[test]
    fn constructor_result_is_always_the_instance() {
        let source = r#"
            class C { init() { this.x = 1; return; } }
            var c = C();
            print c;
            print c.init() == c;
        "#;

        assert_eq!(output_of(source), "C instance\ntrue\n");
    }

    #[test]
    fn field_writes_shadow_methods() {
        let source = r#"
            class C { m() { return "method"; } }
            var c = C();
            c.m = "field";
            print c.m;
        "#;

        assert_eq!(output_of(source), "field\n");
    }

    #[test]
    fn undefined_names() {
        assert_eq!(runtime_error_of("missing();"), "Undefined variable 'missing'.\n[line 1]");
        assert_eq!(runtime_error_of("missing = 1;"), "Undefined variable 'missing'.\n[line 1]");
        assert_eq!(
            runtime_error_of("class C {} C().nope;"),
            "Undefined property 'nope' on C instance.\n[line 1]"
        );
    }

    #[test]
    fn calling_and_accessing_the_wrong_things() {
        assert_eq!(runtime_error_of("\"str\"();"), "Can only call functions and classes.\n[line 1]");
        assert_eq!(runtime_error_of("var a = 1; a.b;"), "Only instances have properties.\n[line 1]");
        assert_eq!(runtime_error_of("var a = 1; a.b = 2;"), "Only instances have fields.\n[line 1]");
        assert_eq!(
            runtime_error_of("var NotClass = 1; class C < NotClass {}"),
            "Superclass must be a class, but 'NotClass' is not.\n[line 1]"
        );
    }

    #[test]
    fn runtime_errors_stop_the_remaining_statements() {
        let (output, result) = run("print 1; print nil + 1; print 3;");
        assert!(result.is_err());
        assert_eq!(output, "1\n");
    }

    #[test]
    fn native_print_and_values() {
        assert_eq!(output_of("print(nil); print(1, \"a\", true);"), "nil\n1 a true\n");
        assert_eq!(output_of("fun f() {} print f; print clock; class K {} print K;"), "<fn f>\n<native fn clock>\nK\n");
        assert_eq!(output_of("var p = print; p(\"via alias\");"), "via alias\n");
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn recursion_and_loops() {
        let source = r#"
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            var total = 0;
            for (var i = 0; i < 5; i = i + 1) total = total + i;
            print fib(10);
            print total;
        "#;

        assert_eq!(output_of(source), "55\n10\n");
    }

    #[test]
    fn deep_recursion_completes() {
        let source = "fun down(n) { if (n == 0) return 0; return down(n - 1) + 1; } print down(10000);";
        assert_eq!(output_of(source), "10000
");
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        assert_eq!(runtime_error_of("fun forever() { forever(); }
forever();"), "Stack overflow.
[line 1]");
    }

    #[test]
    fn call_depth_is_restored_after_errors() {
        let source = "fun forever() { forever(); }\nforever();";
        let (stmts, _) = Parser::new(Scanner::new(source).filter_map(|t| t.ok())).parse();
        let (locals, _) = resolve(&stmts);

        let mut interpreter = Interpreter::default().with_output(Box::new(CaptureOutput::new()));
        interpreter.resolve(locals);

        assert!(interpreter.interpret(&stmts).is_err());
        assert_eq!(interpreter.depth, 0);
    }
}
