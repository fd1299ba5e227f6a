use std::{
    cell::RefCell,
    fmt::{Debug, Display},
    rc::Rc,
};

use fnv::FnvHashMap;

use crate::{errors, lexer::Token, TlpsError};

use super::{fun::Closure, Callable, Interpreter, Value};

pub struct Class {
    name: String,
    superclass: Option<Rc<Class>>,
    methods: FnvHashMap<String, Rc<Closure>>,
}

impl Class {
    pub fn new<S: Into<String>>(name: S, superclass: Option<Rc<Class>>, methods: FnvHashMap<String, Rc<Closure>>) -> Self {
        Self {
            name: name.into(),
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<Class>> {
        self.superclass.as_ref()
    }

    /// Searches this class, then each superclass outward.
    pub fn find_method(&self, name: &str) -> Option<Rc<Closure>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self.superclass.as_ref().and_then(|s| s.find_method(name)),
        }
    }

    pub fn arity(&self) -> usize {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }

    /// Calling a class creates an instance and runs `init` against it, if the
    /// class (or an ancestor) has one. The result is always the new instance.
    pub fn instantiate(class: &Rc<Class>, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value, TlpsError> {
        let instance = Instance::new(class.clone());

        if let Some(init) = class.find_method("init") {
            init.bind(&instance).call(interpreter, args)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.name)
    }
}

impl Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<class {}>", &self.name)
    }
}

#[derive(Clone)]
pub struct Instance(Rc<InstanceData>);

struct InstanceData {
    class: Rc<Class>,
    fields: RefCell<FnvHashMap<String, Value>>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance(Rc::new(InstanceData {
            class,
            fields: RefCell::new(FnvHashMap::default()),
        }))
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.0.class
    }

    /// Fields shadow methods; methods are returned bound to this instance.
    pub fn get(&self, name: &Token) -> Result<Value, TlpsError> {
        if let Some(value) = self.0.fields.borrow().get(name.lexeme()) {
            return Ok(value.clone());
        }

        match self.0.class.find_method(name.lexeme()) {
            Some(method) => Ok(Value::Callable(Callable::Closure(Rc::new(method.bind(self))))),
            None => Err(errors::runtime(
                name,
                format!("Undefined property '{}' on {} instance.", name.lexeme(), self.0.class.name()),
            )),
        }
    }

    pub fn set(&self, name: &Token, value: Value) {
        self.0.fields.borrow_mut().insert(name.lexeme().to_string(), value);
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} instance", self.0.class.name())
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "<{} instance>", self.0.class.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::TokenType;

    use super::*;

    fn id(name: &str) -> Token {
        Token::new(TokenType::Identifier, name, None, 1)
    }

    #[test]
    fn fields_are_dynamic() {
        let class = Rc::new(Class::new("Point", None, FnvHashMap::default()));
        let point = Instance::new(class.clone());

        assert_eq!(
            point.get(&id("x")).expect_err("no field yet").to_string(),
            "Undefined property 'x' on Point instance.\n[line 1]"
        );

        point.set(&id("x"), Value::Number(3.0));
        assert_eq!(point.get(&id("x")).expect("field was set"), Value::Number(3.0));
        assert!(Rc::ptr_eq(point.class(), &class));
    }

    #[test]
    fn class_without_init_takes_no_arguments() {
        let base = Rc::new(Class::new("Base", None, FnvHashMap::default()));
        let derived = Class::new("Derived", Some(base.clone()), FnvHashMap::default());

        assert_eq!(derived.arity(), 0);
        assert!(derived.find_method("init").is_none());
        assert_eq!(derived.superclass().map(|s| s.name()), Some("Base"));
        assert_eq!(Instance::new(base).to_string(), "Base instance");
    }
}
