use std::rc::Rc;

use crate::lexer::Token;

use super::{Expr, ExprId, ExprVisitor, FunDecl, Literal, Stmt, StmtVisitor};

/// Renders a tree as parenthesized text, for `--debug` output and tests.
pub struct AstPrinter {}

impl AstPrinter {
    fn parenthesize<'a, I: IntoIterator<Item = String>>(&self, head: &'a str, parts: I) -> String {
        let mut s = format!("({}", head);
        for part in parts {
            s.push(' ');
            s.push_str(&part);
        }
        s.push(')');
        s
    }
}

impl ExprVisitor<String> for AstPrinter {
    fn visit_assign(&mut self, _id: ExprId, name: &Token, value: &Expr) -> String {
        format!("(= {} {})", name.lexeme(), self.visit_expr(value))
    }

    fn visit_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_call(&mut self, callee: &Expr, _paren: &Token, args: &[Expr]) -> String {
        let head = format!("call {}", self.visit_expr(callee));
        let args: Vec<String> = args.iter().map(|arg| self.visit_expr(arg)).collect();
        self.parenthesize(&head, args)
    }

    fn visit_get(&mut self, obj: &Expr, name: &Token) -> String {
        format!("{}.{}", self.visit_expr(obj), name.lexeme())
    }

    fn visit_grouping(&mut self, expr: &Expr) -> String {
        format!("(group {})", self.visit_expr(expr))
    }

    fn visit_literal(&mut self, value: &Literal) -> String {
        match value {
            Literal::String(string) => format!("\"{}\"", string),
            other => other.to_string(),
        }
    }

    fn visit_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> String {
        format!("({} {} {})", op.lexeme(), self.visit_expr(left), self.visit_expr(right))
    }

    fn visit_set(&mut self, obj: &Expr, name: &Token, value: &Expr) -> String {
        format!("(set {}.{} {})", self.visit_expr(obj), name.lexeme(), self.visit_expr(value))
    }

    fn visit_super(&mut self, _id: ExprId, _keyword: &Token, method: &Token) -> String {
        format!("super.{}", method.lexeme())
    }

    fn visit_this(&mut self, _id: ExprId, _keyword: &Token) -> String {
        "this".to_string()
    }

    fn visit_unary(&mut self, op: &Token, expr: &Expr) -> String {
        format!("({} {})", op.lexeme(), self.visit_expr(expr))
    }

    fn visit_var_ref(&mut self, _id: ExprId, name: &Token) -> String {
        name.lexeme().to_string()
    }
}

impl StmtVisitor<String> for AstPrinter {
    fn visit_block(&mut self, stmts: &[Stmt]) -> String {
        let stmts: Vec<String> = stmts.iter().map(|stmt| self.visit_stmt(stmt)).collect();
        self.parenthesize("block", stmts)
    }

    fn visit_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunDecl>]) -> String {
        let mut head = format!("class {}", name.lexeme());
        if let Some(superclass) = superclass {
            head.push_str(" < ");
            head.push_str(&self.visit_expr(superclass));
        }

        let methods: Vec<String> = methods.iter().map(|method| self.visit_fun_def(method)).collect();
        self.parenthesize(&head, methods)
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> String {
        format!("({})", self.visit_expr(expr))
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> String {
        let mut parts: Vec<String> = decl.params.iter().map(|param| param.lexeme().to_string()).collect();
        parts.push(self.visit_block(&decl.body));
        self.parenthesize(&format!("fun {}", decl.name.lexeme()), parts)
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> String {
        let mut parts = vec![self.visit_expr(cond), self.visit_stmt(then_branch)];
        if let Some(else_branch) = else_branch {
            parts.push(self.visit_stmt(else_branch));
        }
        self.parenthesize("if", parts)
    }

    fn visit_include(&mut self, path: &Token) -> String {
        format!("(include {})", path.lexeme())
    }

    fn visit_print(&mut self, expr: &Expr) -> String {
        format!("(print {})", self.visit_expr(expr))
    }

    fn visit_return(&mut self, _keyword: &Token, value: Option<&Expr>) -> String {
        let value: Vec<String> = value.map(|v| self.visit_expr(v)).into_iter().collect();
        self.parenthesize("return", value)
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> String {
        let init: Vec<String> = init.map(|v| self.visit_expr(v)).into_iter().collect();
        self.parenthesize(&format!("var {}", name.lexeme()), init)
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> String {
        format!("(while {} {})", self.visit_expr(cond), self.visit_stmt(body))
    }
}
