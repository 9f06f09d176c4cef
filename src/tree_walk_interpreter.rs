mod callable;
mod environment;
mod host;
mod library;
mod properties;
mod value;

use std::{cell::RefCell, fmt::Debug, rc::Rc};

use crate::{
    ast::{
        DictionaryEntry, Expression, ImportTarget, Literal, LogicalOperator, Pattern, Program,
        Property, Statement,
    },
    error::{Error, ErrorKind},
    parser, tokenizer,
};

use self::environment::{Environment, Scope};

pub use self::{
    callable::Function,
    host::{
        Fetch, FileSystem, Host, HttpFetch, NativeFileSystem, Request, Response,
        DEFAULT_MAX_CALL_DEPTH,
    },
    value::{format_number, Dictionary, List, Unique, Value, MAX_STRING_LENGTH},
};

/// How a statement finished: normally with its value, or by `return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Next(Value),
    Return(Value),
}

pub struct Interpreter {
    environment: Environment,
    host: Host,
    globals: Rc<RefCell<Scope>>,
    /// Closure calls currently running.
    call_depth: usize,
}

impl Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .finish()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_host(Host::default())
    }
}

impl Interpreter {
    pub fn new(stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        Self::with_host(Host::new().with_stdout(stdout))
    }

    /// Builds an interpreter whose programs see `print` and every value the
    /// host injected. Those live in a prelude frame above the program's own
    /// frame, so programs may shadow them.
    pub fn with_host(host: Host) -> Self {
        let prelude = Scope::boxed(None);
        {
            let mut prelude = prelude.borrow_mut();
            prelude.insert("print".to_string(), library::print(host.stdout.clone()));
            for (name, value) in &host.globals {
                tracing::debug!(%name, value = %value, "injecting host binding");
                prelude.insert(name.clone(), value.clone());
            }
        }

        let globals = Scope::boxed(Some(prelude));
        Self {
            environment: Environment::new(globals.clone()),
            host,
            globals,
            call_depth: 0,
        }
    }

    /// Tokenizes, parses and runs `source`, returning the value of every
    /// top-level statement. Language errors carry the source for context.
    pub fn run(&mut self, source: &str) -> Result<Vec<Value>, Error> {
        self.run_source(source)
            .map_err(|error| error.with_source(source))
    }

    fn run_source(&mut self, source: &str) -> Result<Vec<Value>, Error> {
        let tokens = tokenizer::tokens(source)?;
        let program = parser::program(&tokens)?;
        self.interpret(&program)
    }

    pub fn interpret(&mut self, program: &Program) -> Result<Vec<Value>, Error> {
        let mut results = Vec::with_capacity(program.0.len());
        for statement in &program.0 {
            match self.execute(statement)? {
                Flow::Next(value) => results.push(value),
                Flow::Return(_) => return Err(ErrorKind::ReturnOutsideFunction.into()),
            }
        }
        Ok(results)
    }

    /// The program's top-level bindings, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut bindings: Vec<_> = self
            .globals
            .borrow()
            .bindings()
            .map(|(name, binding)| (name.clone(), binding.value.clone()))
            .collect();
        bindings.sort_by(|(a, _), (b, _)| a.cmp(b));
        bindings
    }

    /// Looks a name up from the top-level frame outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Calls a function value with an exact argument list.
    pub fn call(&mut self, function: &Function, arguments: Vec<Value>) -> Result<Value, Error> {
        function.check_arity(arguments.len())?;
        function.call(self, arguments)
    }

    /// Calls a callback handed to a built-in. Surplus arguments are dropped
    /// so that `(item) => ...` works where `(item, index)` is offered.
    fn call_value(&mut self, callee: &Value, mut arguments: Vec<Value>) -> Result<Value, Error> {
        let Value::Function(function) = callee else {
            return Err(ErrorKind::NotAFunction(callee.type_name()).into());
        };
        if !function.variadic {
            arguments.truncate(function.arity);
        }
        self.call(function, arguments)
    }

    fn execute(&mut self, statement: &Statement) -> Result<Flow, Error> {
        let value = match statement {
            Statement::Expression(expression) => self.evaluate(expression)?,
            Statement::Declaration {
                target,
                value,
                constant,
                line,
            } => {
                self.declare(target, value, *constant)
                    .map_err(|e| e.with_line(*line))?;
                Value::Null
            }
            Statement::Block(statements) => {
                let scope = Scope::boxed(Some(self.environment.scope().clone()));
                return self.execute_in_scope(scope, |interpreter| {
                    interpreter.execute_statements(statements)
                });
            }
            Statement::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
                Value::Null
            }
            Statement::While {
                condition,
                body,
                line,
            } => {
                self.environment.enter_loop();
                let result = self.execute_loop(condition, body, *line);
                self.environment.exit_loop();
                return result;
            }
            Statement::Return { value, line } => {
                if self.call_depth == 0 {
                    return Err(Error::from(ErrorKind::ReturnOutsideFunction).with_line(*line));
                }
                let value = match value {
                    Some(expression) => self.evaluate(expression)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            Statement::Import {
                module,
                target,
                line,
            } => {
                self.import(module, target)
                    .map_err(|e| e.with_line(*line))?;
                Value::Null
            }
        };

        Ok(Flow::Next(value))
    }

    /// Runs statements in the current frame. The value of the last statement
    /// is the value of the list.
    fn execute_statements(&mut self, statements: &[Statement]) -> Result<Flow, Error> {
        let mut last = Value::Null;
        for statement in statements {
            match self.execute(statement)? {
                Flow::Next(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Next(last))
    }

    fn execute_in_scope<T>(
        &mut self,
        scope: Rc<RefCell<Scope>>,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let previous = self.environment.replace_scope(scope);
        let result = f(self);
        self.environment.replace_scope(previous);
        result
    }

    /// Only reads made while evaluating the condition are watched; the body
    /// runs with tracking off.
    fn execute_loop(
        &mut self,
        condition: &Expression,
        body: &Statement,
        line: usize,
    ) -> Result<Flow, Error> {
        loop {
            self.environment.track_reads(true);
            let keep_going = self.evaluate(condition);
            self.environment.track_reads(false);
            if !keep_going?.is_truthy() {
                return Ok(Flow::Next(Value::Null));
            }

            if let flow @ Flow::Return(_) = self.execute(body)? {
                return Ok(flow);
            }
            self.environment
                .finish_iteration()
                .map_err(|kind| Error::from(kind).with_line(line))?;
        }
    }

    /// A function literal declared under a plain name takes that name.
    fn declare(
        &mut self,
        target: &Pattern,
        initializer: &Expression,
        constant: bool,
    ) -> Result<(), Error> {
        let mut value = self.evaluate(initializer)?;

        if let (Pattern::Identifier(name), Expression::Function(_)) = (target, initializer) {
            if let Value::Function(function) = &value {
                value = Value::function(function.renamed(name));
            }
        }

        self.bind_pattern(target, value, constant)
    }

    /// Binds `value` to `pattern` in the current frame. Missing list items and
    /// dictionary keys bind as null.
    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        constant: bool,
    ) -> Result<(), Error> {
        match pattern {
            Pattern::Identifier(name) => self.environment.define(name, value, constant)?,
            Pattern::List { elements, rest } => {
                let Value::List(list) = &value else {
                    return Err(ErrorKind::InvalidDestructure {
                        expected: "list",
                        found: value.type_name(),
                    }
                    .into());
                };

                let mut items = list.snapshot().into_iter();
                for element in elements {
                    let item = items.next().unwrap_or(Value::Null);
                    self.bind_pattern(element, item, constant)?;
                }
                if let Some(rest) = rest {
                    self.environment
                        .define(rest, Value::list(items.collect()), constant)?;
                }
            }
            Pattern::Dictionary { entries, rest } => {
                let Value::Dictionary(dictionary) = &value else {
                    return Err(ErrorKind::InvalidDestructure {
                        expected: "dictionary",
                        found: value.type_name(),
                    }
                    .into());
                };

                for (key, pattern) in entries {
                    let field = dictionary.get(key).unwrap_or(Value::Null);
                    self.bind_pattern(pattern, field, constant)?;
                }
                if let Some(rest) = rest {
                    let remaining = dictionary
                        .pairs()
                        .into_iter()
                        .filter(|(key, _)| !entries.iter().any(|(taken, _)| taken == key));
                    self.environment
                        .define(rest, Value::dictionary(remaining), constant)?;
                }
            }
        }
        Ok(())
    }

    fn import(&mut self, module: &str, target: &ImportTarget) -> Result<(), Error> {
        tracing::debug!(%module, "import");
        let value = library::resolve(module, &self.host)
            .ok_or_else(|| ErrorKind::UnknownLibrary(module.to_string()))?;

        match target {
            ImportTarget::Module(alias) => self.environment.define(alias, value, true)?,
            ImportTarget::Fields(fields) => {
                let Value::Dictionary(dictionary) = &value else {
                    return Err(ErrorKind::InvalidDestructure {
                        expected: "dictionary",
                        found: value.type_name(),
                    }
                    .into());
                };
                for (field, binding) in fields {
                    let field = dictionary.get(field).unwrap_or(Value::Null);
                    self.environment.define(binding, field, true)?;
                }
            }
        }
        Ok(())
    }

    fn evaluate(&mut self, expression: &Expression) -> Result<Value, Error> {
        let result = self.evaluate_expression(expression);
        match expression.line() {
            Some(line) => result.map_err(|e| e.with_line(line)),
            None => result,
        }
    }

    fn evaluate_expression(&mut self, expression: &Expression) -> Result<Value, Error> {
        let value = match expression {
            Expression::Literal(literal) => match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Null => Value::Null,
            },
            Expression::Variable { name, .. } => self.environment.get(name)?,
            Expression::Assign { name, value, .. } => {
                let value = self.evaluate(value)?;
                self.environment.assign(name, value.clone())?;
                value
            }
            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                value::binary(*operator, &left, &right)?
            }
            Expression::Unary {
                operator, operand, ..
            } => {
                let operand = self.evaluate(operand)?;
                value::unary(*operator, &operand)?
            }
            Expression::Logical(left, operator, right) => {
                let left = self.evaluate(left)?;
                let decided = match operator {
                    LogicalOperator::And => !left.is_truthy(),
                    LogicalOperator::Or => left.is_truthy(),
                    LogicalOperator::Nullish => left != Value::Null,
                };
                if decided {
                    left
                } else {
                    self.evaluate(right)?
                }
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                let callee = self.evaluate(callee)?;
                let arguments = self.evaluate_items(arguments)?;
                let Value::Function(function) = &callee else {
                    return Err(ErrorKind::NotAFunction(callee.type_name()).into());
                };
                self.call(function, arguments)?
            }
            Expression::Get {
                object, property, ..
            } => {
                let object = self.evaluate(object)?;
                match property {
                    Property::Name(name) => object.get(&Value::String(name.clone()))?,
                    Property::Key(key) => {
                        let key = self.evaluate(key)?;
                        object.get(&key)?
                    }
                    Property::Slice(start, end) => {
                        let start = self.slice_bound(start.as_deref())?;
                        let end = self.slice_bound(end.as_deref())?;
                        object.slice(start, end)?
                    }
                }
            }
            Expression::Set {
                object,
                property,
                value,
                ..
            } => {
                let object = self.evaluate(object)?;
                let key = match property {
                    Property::Name(name) => Value::String(name.clone()),
                    Property::Key(key) => self.evaluate(key)?,
                    Property::Slice(..) => return Err(ErrorKind::InvalidAssignmentTarget.into()),
                };
                let value = self.evaluate(value)?;
                object.set(&key, value.clone())?;
                value
            }
            Expression::List(items) => Value::list(self.evaluate_items(items)?),
            Expression::Dictionary(entries) => self.evaluate_dictionary(entries)?,
            Expression::Function(literal) => Value::function(Function::closure(
                literal.clone(),
                self.environment.scope().clone(),
            )),
            Expression::Spread(..) => return Err(ErrorKind::MisplacedSpread.into()),
            Expression::Try(inner) => match self.evaluate(inner) {
                Ok(value) => Value::list(vec![value, Value::Null]),
                Err(Error::Language(error)) => {
                    Value::list(vec![Value::Null, Value::Error(Rc::new(error))])
                }
                Err(host) => return Err(host),
            },
        };

        Ok(value)
    }

    /// Evaluates list items or call arguments left to right, expanding spread
    /// lists in place.
    fn evaluate_items(&mut self, items: &[Expression]) -> Result<Vec<Value>, Error> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expression::Spread(inner, line) => match self.evaluate(inner)? {
                    Value::List(list) => values.extend(list.snapshot()),
                    other => {
                        return Err(Error::from(ErrorKind::InvalidSpread(other.type_name()))
                            .with_line(*line))
                    }
                },
                item => values.push(self.evaluate(item)?),
            }
        }
        Ok(values)
    }

    fn evaluate_dictionary(&mut self, entries: &[DictionaryEntry]) -> Result<Value, Error> {
        let mut pairs = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                DictionaryEntry::Named(key, value) => {
                    pairs.push((key.clone(), self.evaluate(value)?));
                }
                DictionaryEntry::Computed(key, value) => {
                    let key = self.evaluate(key)?.to_key()?;
                    pairs.push((key, self.evaluate(value)?));
                }
                DictionaryEntry::Spread(inner) => match self.evaluate(inner)? {
                    Value::Dictionary(dictionary) => pairs.extend(dictionary.pairs()),
                    other => return Err(ErrorKind::InvalidSpread(other.type_name()).into()),
                },
            }
        }
        Ok(Value::dictionary(pairs))
    }

    fn slice_bound(&mut self, bound: Option<&Expression>) -> Result<Option<f64>, Error> {
        let Some(bound) = bound else {
            return Ok(None);
        };
        match self.evaluate(bound)? {
            Value::Number(n) => Ok(Some(n)),
            Value::Null => Ok(None),
            other => Err(ErrorKind::InvalidKey(other.type_name()).into()),
        }
    }
}
