use std::rc::Rc;

use fnv::{FnvHashMap, FnvHashSet};

use crate::{
    ast::{Expr, ExprId, ExprVisitor, FunDecl, Literal, Stmt, StmtVisitor},
    errors,
    lexer::Token,
    TlpsError,
};

use super::Locals;

#[derive(Debug, PartialEq, Copy, Clone)]
pub(super) enum ClassType {
    None,
    Class,
    Subclass,
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub(super) enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// Mirrors the scopes the interpreter will create at runtime. Each scope maps a
/// name to whether its initializer has finished (`true`) or is still running.
#[derive(Debug)]
pub struct Resolver {
    scopes: Vec<FnvHashMap<String, bool>>,
    locals: Locals,
    current_class: ClassType,
    current_function: FunctionType,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            scopes: Vec::new(),
            locals: Locals::default(),
            current_class: ClassType::None,
            current_function: FunctionType::None,
        }
    }
}

impl Resolver {
    pub fn resolve(&mut self, stmts: &[Stmt]) -> Vec<TlpsError> {
        stmts.iter().flat_map(|stmt| self.visit_stmt(stmt)).collect()
    }

    pub fn into_locals(self) -> Locals {
        self.locals
    }

    fn declare(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), false);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                self.locals.insert(id, distance);
                return;
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunDecl, ty: FunctionType) -> Vec<TlpsError> {
        let enclosing = self.current_function;
        self.current_function = ty;
        self.scopes.push(FnvHashMap::default());

        let mut errs = Vec::new();
        let mut known_params = FnvHashSet::default();
        for param in decl.params.iter() {
            if !known_params.insert(param.lexeme()) {
                errs.push(errors::syntax(param, format!("Duplicate parameter '{}'.", param.lexeme())));
            }

            self.declare(param.lexeme());
            self.define(param.lexeme());
        }

        errs.extend(self.resolve(&decl.body));

        self.scopes.pop();
        self.current_function = enclosing;
        errs
    }
}

impl ExprVisitor<Vec<TlpsError>> for Resolver {
    fn visit_assign(&mut self, id: ExprId, name: &Token, value: &Expr) -> Vec<TlpsError> {
        let errs = self.visit_expr(value);
        self.resolve_local(id, name.lexeme());
        errs
    }

    fn visit_binary(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<TlpsError> {
        vec![self.visit_expr(left), self.visit_expr(right)].into_iter().flatten().collect()
    }

    fn visit_call(&mut self, callee: &Expr, _paren: &Token, args: &[Expr]) -> Vec<TlpsError> {
        vec![self.visit_expr(callee), args.iter().flat_map(|arg| self.visit_expr(arg)).collect()]
            .into_iter()
            .flatten()
            .collect()
    }

    fn visit_get(&mut self, obj: &Expr, _name: &Token) -> Vec<TlpsError> {
        self.visit_expr(obj)
    }

    fn visit_grouping(&mut self, expr: &Expr) -> Vec<TlpsError> {
        self.visit_expr(expr)
    }

    fn visit_literal(&mut self, _value: &Literal) -> Vec<TlpsError> {
        Vec::new()
    }

    fn visit_logical(&mut self, left: &Expr, _op: &Token, right: &Expr) -> Vec<TlpsError> {
        vec![self.visit_expr(left), self.visit_expr(right)].into_iter().flatten().collect()
    }

    fn visit_set(&mut self, obj: &Expr, _name: &Token, value: &Expr) -> Vec<TlpsError> {
        vec![self.visit_expr(value), self.visit_expr(obj)].into_iter().flatten().collect()
    }

    fn visit_super(&mut self, id: ExprId, keyword: &Token, _method: &Token) -> Vec<TlpsError> {
        match self.current_class {
            ClassType::None => vec![errors::syntax(keyword, "Can't use 'super' outside of a class.")],
            ClassType::Class => vec![errors::syntax(keyword, "Can't use 'super' in a class with no superclass.")],
            ClassType::Subclass => {
                self.resolve_local(id, "super");
                Vec::new()
            }
        }
    }

    fn visit_this(&mut self, id: ExprId, keyword: &Token) -> Vec<TlpsError> {
        if self.current_class == ClassType::None {
            return vec![errors::syntax(keyword, "Can't use 'this' outside of a class.")];
        }

        self.resolve_local(id, "this");
        Vec::new()
    }

    fn visit_unary(&mut self, _op: &Token, expr: &Expr) -> Vec<TlpsError> {
        self.visit_expr(expr)
    }

    fn visit_var_ref(&mut self, id: ExprId, name: &Token) -> Vec<TlpsError> {
        if self.scopes.last().and_then(|s| s.get(name.lexeme())) == Some(&false) {
            return vec![errors::syntax(name, "Can't read local variable in its own initializer.")];
        }

        self.resolve_local(id, name.lexeme());
        Vec::new()
    }
}

impl StmtVisitor<Vec<TlpsError>> for Resolver {
    fn visit_block(&mut self, stmts: &[Stmt]) -> Vec<TlpsError> {
        self.scopes.push(FnvHashMap::default());
        let errs = self.resolve(stmts);
        self.scopes.pop();
        errs
    }

    fn visit_class(&mut self, name: &Token, superclass: Option<&Expr>, methods: &[Rc<FunDecl>]) -> Vec<TlpsError> {
        let enclosing = self.current_class;
        self.current_class = ClassType::Class;

        // Declared before the body so that methods may refer to their own class.
        self.declare(name.lexeme());
        self.define(name.lexeme());

        let mut errs = Vec::new();
        if let Some(superclass) = superclass {
            if let Expr::Var(_, superclass_name) = superclass {
                if superclass_name.lexeme() == name.lexeme() {
                    errs.push(errors::syntax(superclass_name, "A class can't inherit from itself."));
                }
            }

            self.current_class = ClassType::Subclass;
            errs.extend(self.visit_expr(superclass));

            self.scopes.push(FnvHashMap::default());
            self.define("super");
        }

        self.scopes.push(FnvHashMap::default());
        self.define("this");

        for method in methods {
            let ty = if method.name.lexeme() == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            errs.extend(self.resolve_function(method, ty));
        }

        self.scopes.pop();
        if superclass.is_some() {
            self.scopes.pop();
        }

        self.current_class = enclosing;
        errs
    }

    fn visit_expr_stmt(&mut self, expr: &Expr) -> Vec<TlpsError> {
        self.visit_expr(expr)
    }

    fn visit_fun_def(&mut self, decl: &Rc<FunDecl>) -> Vec<TlpsError> {
        // Defined eagerly so the body can recurse.
        self.declare(decl.name.lexeme());
        self.define(decl.name.lexeme());

        self.resolve_function(decl, FunctionType::Function)
    }

    fn visit_if(&mut self, cond: &Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Vec<TlpsError> {
        vec![
            self.visit_expr(cond),
            self.visit_stmt(then_branch),
            else_branch.map(|b| self.visit_stmt(b)).unwrap_or_default(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn visit_include(&mut self, _path: &Token) -> Vec<TlpsError> {
        // Included files are resolved on their own when they are evaluated.
        Vec::new()
    }

    fn visit_print(&mut self, expr: &Expr) -> Vec<TlpsError> {
        self.visit_expr(expr)
    }

    fn visit_return(&mut self, keyword: &Token, value: Option<&Expr>) -> Vec<TlpsError> {
        let mut errs = Vec::new();
        if self.current_function == FunctionType::None {
            errs.push(errors::syntax(keyword, "Can't return from top-level code."));
        }

        if let Some(value) = value {
            errs.extend(self.visit_expr(value));
        }

        errs
    }

    fn visit_var_def(&mut self, name: &Token, init: Option<&Expr>) -> Vec<TlpsError> {
        self.declare(name.lexeme());
        let errs = init.map(|init| self.visit_expr(init)).unwrap_or_default();
        self.define(name.lexeme());
        errs
    }

    fn visit_while(&mut self, cond: &Expr, body: &Stmt) -> Vec<TlpsError> {
        vec![self.visit_expr(cond), self.visit_stmt(body)].into_iter().flatten().collect()
    }
}
