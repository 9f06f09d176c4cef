use std::{cell::RefCell, rc::Rc};

use crate::{
    ast::{FunctionBody, FunctionLiteral},
    error::{Error, ErrorKind},
};

use super::{environment::Scope, Flow, Interpreter, Value};

pub type Builtin = dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Error>;

pub enum Body {
    Closure {
        literal: Rc<FunctionLiteral>,
        scope: Rc<RefCell<Scope>>,
    },
    Builtin(Box<Builtin>),
}

/// A function value. The body is shared so that renaming a function at its
/// declaration keeps it equal to the original.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    pub arity: usize,
    pub variadic: bool,
    body: Rc<Body>,
}

pub const ANONYMOUS: &str = "anonymous";

impl Function {
    pub fn closure(literal: Rc<FunctionLiteral>, scope: Rc<RefCell<Scope>>) -> Self {
        Self {
            name: ANONYMOUS.to_string(),
            arity: literal.parameters.len(),
            variadic: literal.rest.is_some(),
            body: Rc::new(Body::Closure { literal, scope }),
        }
    }

    /// A native function taking exactly `arity` arguments.
    pub fn builtin(
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Error> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            arity,
            variadic: false,
            body: Rc::new(Body::Builtin(Box::new(f))),
        }
    }

    /// A native function taking at least `arity` arguments. Missing optional
    /// arguments are simply absent from the argument list.
    pub fn variadic_builtin(
        name: &str,
        arity: usize,
        f: impl Fn(&mut Interpreter, Vec<Value>) -> Result<Value, Error> + 'static,
    ) -> Self {
        Self {
            variadic: true,
            ..Self::builtin(name, arity, f)
        }
    }

    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }

    pub fn same_body(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }

    pub fn check_arity(&self, got: usize) -> Result<(), ErrorKind> {
        let accepted = if self.variadic {
            got >= self.arity
        } else {
            got == self.arity
        };
        if accepted {
            return Ok(());
        }

        Err(ErrorKind::WrongArity {
            name: self.name.clone(),
            expected: if self.variadic {
                format!("at least {}", self.arity)
            } else {
                self.arity.to_string()
            },
            got,
        })
    }

    pub(super) fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Error> {
        match self.body.as_ref() {
            Body::Builtin(f) => f(interpreter, arguments),
            Body::Closure { literal, scope } => {
                let limit = interpreter.host.max_call_depth;
                if interpreter.call_depth >= limit {
                    return Err(ErrorKind::CallDepthExceeded(limit).into());
                }
                let _span = tracing::trace_span!("call", function = %self.name).entered();

                interpreter.call_depth += 1;
                let scope = Scope::boxed(Some(scope.clone()));
                let result = interpreter.execute_in_scope(scope, |interpreter| {
                    bind_parameters(interpreter, literal, arguments)?;

                    match &literal.body {
                        FunctionBody::Expression(expression) => interpreter.evaluate(expression),
                        FunctionBody::Block(statements) => {
                            match interpreter.execute_statements(statements)? {
                                Flow::Return(value) => Ok(value),
                                Flow::Next(_) => Ok(Value::Null),
                            }
                        }
                    }
                });
                interpreter.call_depth -= 1;
                result
            }
        }
    }
}

/// Binds arguments positionally, destructuring where a parameter is a
/// pattern. The rest parameter collects whatever is left over.
fn bind_parameters(
    interpreter: &mut Interpreter,
    literal: &FunctionLiteral,
    arguments: Vec<Value>,
) -> Result<(), Error> {
    let mut arguments = arguments.into_iter();

    for parameter in &literal.parameters {
        let argument = arguments.next().unwrap_or(Value::Null);
        interpreter.bind_pattern(parameter, argument, false)?;
    }

    if let Some(rest) = &literal.rest {
        interpreter
            .environment
            .define(rest, Value::list(arguments.collect()), false)?;
    }

    Ok(())
}
