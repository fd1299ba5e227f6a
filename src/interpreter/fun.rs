use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

use crate::{ast::FunDecl, TlpsError};

use super::{
    class::{Class, Instance},
    env::Environment,
    Flow, Interpreter, Value,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// Accepts any number of arguments; the count is not checked.
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n == count,
            Arity::Variadic => true,
        }
    }
}

/// Everything which can appear to the left of a call's parentheses.
#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFun>),
    Closure(Rc<Closure>),
    Class(Rc<Class>),
}

impl Callable {
    pub fn native<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, TlpsError> + 'static, S: Into<String>>(
        name: S,
        arity: Arity,
        fun: T,
    ) -> Self {
        Callable::Native(Rc::new(NativeFun::new(name, arity, fun)))
    }

    pub fn name(&self) -> &str {
        match self {
            Callable::Native(fun) => fun.name(),
            Callable::Closure(closure) => closure.name(),
            Callable::Class(class) => class.name(),
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Callable::Native(fun) => fun.arity(),
            Callable::Closure(closure) => Arity::Fixed(closure.arity()),
            Callable::Class(class) => Arity::Fixed(class.arity()),
        }
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, TlpsError> {
        match self {
            Callable::Native(fun) => fun.call(interpreter, args),
            Callable::Closure(closure) => closure.call(interpreter, args),
            Callable::Class(class) => Class::instantiate(class, interpreter, args),
        }
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Callable::Native(fun) => write!(f, "<native fn {}>", fun.name()),
            Callable::Closure(closure) => write!(f, "<fn {}>", closure.name()),
            Callable::Class(class) => write!(f, "{}", class.name()),
        }
    }
}

impl Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(fun1), Callable::Native(fun2)) => Rc::ptr_eq(fun1, fun2),
            (Callable::Closure(closure1), Callable::Closure(closure2)) => Rc::ptr_eq(closure1, closure2),
            (Callable::Class(class1), Callable::Class(class2)) => Rc::ptr_eq(class1, class2),
            _ => false,
        }
    }
}

pub struct NativeFun {
    pub name: String,
    pub arity: Arity,
    #[allow(clippy::type_complexity)]
    pub fun: Box<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, TlpsError>>,
}

impl NativeFun {
    pub fn new<T: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, TlpsError> + 'static, S: Into<String>>(
        name: S,
        arity: Arity,
        fun: T,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            fun: Box::new(fun),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, TlpsError> {
        (self.fun)(interpreter, args)
    }
}

/// A user function paired with the frame that was active where it was declared.
#[derive(Clone)]
pub struct Closure {
    pub declaration: Rc<FunDecl>,
    pub closure: Environment,
    pub is_initializer: bool,
}

impl Closure {
    pub fn new(declaration: Rc<FunDecl>, closure: Environment, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        self.declaration.name.lexeme()
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    pub fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, TlpsError> {
        let env = self.closure.branch();
        self.declaration.params.iter().zip(args).for_each(|(param, value)| {
            env.define(param.lexeme(), value);
        });

        let flow = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(self.closure.get_at(0, "this").unwrap_or(Value::Nil));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }

    /// Produces a copy of this method whose `this` is permanently `instance`.
    pub fn bind(&self, instance: &Instance) -> Self {
        let closure = self.closure.branch();
        closure.define("this", Value::Instance(instance.clone()));

        Self::new(self.declaration.clone(), closure, self.is_initializer)
    }
}
