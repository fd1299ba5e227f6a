use std::rc::Rc;

use crate::lexer::Token;

use super::*;

/// A function or method declaration. Shared so that every closure created
/// from it can keep the body alive after the surrounding tree is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FunDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Class(Token, Option<Expr>, Vec<Rc<FunDecl>>),
    Expression(Expr),
    Fun(Rc<FunDecl>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    Include(Token),
    Print(Expr),
    Return(Token, Option<Expr>),
    Var(Token, Option<Expr>),
    While(Expr, Box<Stmt>),
}

pub trait StmtVisitor<T> {
    fn visit_stmt(&mut self, stmt: &Stmt) -> T {
        match stmt {
            Stmt::Block(stmts) => self.visit_block(stmts),
            Stmt::Class(name, superclass, methods) => self.visit_class(name, superclass.as_ref(), methods),
            Stmt::Expression(expr) => self.visit_expr_stmt(expr),
            Stmt::Fun(decl) => self.visit_fun_def(decl),
            Stmt::If(cond, then_branch, else_branch) => self.visit_if(cond, then_branch, else_branch.as_deref()),
            Stmt::Include(path) => self.visit_include(path),
            Stmt::Print(expr) => self.visit_print(expr),
            Stmt::Return(keyword, value) => self.visit_return(keyword, value.as_ref()),
            Stmt::Var(name, init) => self.visit_var_def(name, init.as_ref()),
            Stmt::While(cond, body) => self.visit_while(cond, body),
        }
    }

    fn visit_block(&mut self, stmts: &[Stmt]) -> T;

    fn visit_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunDecl>]) -> T;

    fn visit_expr_stmt(&mut self, expr: &Expr) -> T;

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> T;

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> T;

    fn visit_include(&mut self, path: &Token) -> T;

    fn visit_print(&mut self, expr: &Expr) -> T;

    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) -> T;

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> T;

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> T;
}
