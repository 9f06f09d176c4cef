use std::{fmt::Display, rc::Rc};

#[derive(Debug)]
pub struct Program(pub Vec<Statement>);

#[derive(Debug, Clone)]
pub enum Statement {
    Expression(Expression),
    Declaration {
        target: Pattern,
        value: Expression,
        constant: bool,
        line: usize,
    },
    Block(Vec<Statement>),
    If(Expression, Box<Statement>, Option<Box<Statement>>),
    While {
        condition: Expression,
        body: Box<Statement>,
        line: usize,
    },
    Return {
        value: Option<Expression>,
        line: usize,
    },
    Import {
        module: String,
        target: ImportTarget,
        line: usize,
    },
}

#[derive(Debug, Clone)]
pub enum ImportTarget {
    /// `import maths` or `import maths as m`
    Module(String),
    /// `from maths import { floor, PI as pi }`, as `(field, binding)` pairs
    Fields(Vec<(String, String)>),
}

/// A binding target: a plain name, or a list/dictionary shape to destructure.
#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(String),
    List {
        elements: Vec<Pattern>,
        rest: Option<String>,
    },
    Dictionary {
        entries: Vec<(String, Pattern)>,
        rest: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Variable {
        name: String,
        line: usize,
    },
    Assign {
        name: String,
        value: Box<Expression>,
        line: usize,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
        line: usize,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        line: usize,
    },
    Logical(Box<Expression>, LogicalOperator, Box<Expression>),
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        line: usize,
    },
    Get {
        object: Box<Expression>,
        property: Property,
        line: usize,
    },
    Set {
        object: Box<Expression>,
        property: Property,
        value: Box<Expression>,
        line: usize,
    },
    List(Vec<Expression>),
    Dictionary(Vec<DictionaryEntry>),
    Function(Rc<FunctionLiteral>),
    Spread(Box<Expression>, usize),
    Try(Box<Expression>),
}

impl Expression {
    /// The source line of this node, for the variants that record one.
    pub fn line(&self) -> Option<usize> {
        match self {
            Expression::Variable { line, .. }
            | Expression::Assign { line, .. }
            | Expression::Binary { line, .. }
            | Expression::Unary { line, .. }
            | Expression::Call { line, .. }
            | Expression::Get { line, .. }
            | Expression::Set { line, .. }
            | Expression::Spread(_, line) => Some(*line),
            Expression::Function(function) => Some(function.line),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Property {
    Name(String),
    Key(Box<Expression>),
    Slice(Option<Box<Expression>>, Option<Box<Expression>>),
}

#[derive(Debug, Clone)]
pub enum DictionaryEntry {
    Named(String, Expression),
    Computed(Expression, Expression),
    Spread(Expression),
}

#[derive(Debug, Clone)]
pub struct FunctionLiteral {
    pub parameters: Vec<Pattern>,
    pub rest: Option<String>,
    pub body: FunctionBody,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Expression(Expression),
    Block(Vec<Statement>),
}

#[derive(Debug, Clone)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Plus,
    Minus,
    Multiply,
    Divide,
    Remainder,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOperator {
    And,
    Or,
    Nullish,
}

impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for statement in &self.0 {
            writeln!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Expression(expr) => write!(f, "{}", expr),
            Statement::Declaration {
                target,
                value,
                constant,
                ..
            } => {
                let keyword = if *constant { "const" } else { "let" };
                write!(f, "{keyword} {target} = {value}")
            }
            Statement::Block(statements) => {
                writeln!(f, "{{")?;
                for statement in statements {
                    writeln!(f, "{}", statement)?;
                }
                write!(f, "}}")
            }
            Statement::If(condition, then_branch, else_branch) => {
                write!(f, "if ({}) ", condition)?;
                write!(f, "{}", then_branch)?;
                if let Some(else_branch) = else_branch {
                    write!(f, " else {}", else_branch)?;
                }
                Ok(())
            }
            Statement::While { condition, body, .. } => {
                write!(f, "while ({}) ", condition)?;
                write!(f, "{}", body)
            }
            Statement::Return { value, .. } => {
                if let Some(expr) = value {
                    write!(f, "return {}", expr)
                } else {
                    write!(f, "return")
                }
            }
            Statement::Import { module, target, .. } => match target {
                ImportTarget::Module(alias) if alias == module => write!(f, "import {module}"),
                ImportTarget::Module(alias) => write!(f, "import {module} as {alias}"),
                ImportTarget::Fields(fields) => {
                    write!(f, "from {module} import {{ ")?;
                    write_separated(f, fields, |f, (field, binding)| {
                        if field == binding {
                            write!(f, "{field}")
                        } else {
                            write!(f, "{field} as {binding}")
                        }
                    })?;
                    write!(f, " }}")
                }
            },
        }
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Identifier(name) => write!(f, "{name}"),
            Pattern::List { elements, rest } => {
                write!(f, "[")?;
                write_separated(f, elements, |f, element| write!(f, "{element}"))?;
                if let Some(rest) = rest {
                    if !elements.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...{rest}")?;
                }
                write!(f, "]")
            }
            Pattern::Dictionary { entries, rest } => {
                write!(f, "{{ ")?;
                write_separated(f, entries, |f, (key, pattern)| match pattern {
                    Pattern::Identifier(name) if name == key => write!(f, "{key}"),
                    pattern => write!(f, "{key}: {pattern}"),
                })?;
                if let Some(rest) = rest {
                    if !entries.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...{rest}")?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Variable { name, .. } => write!(f, "{}", name),
            Expression::Assign { name, value, .. } => write!(f, "({} = {})", name, value),
            Expression::Binary {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::Unary {
                operator, operand, ..
            } => write!(f, "({}{})", operator, operand),
            Expression::Logical(left, operator, right) => {
                write!(f, "({} {} {})", left, operator, right)
            }
            Expression::Call {
                callee, arguments, ..
            } => {
                write!(f, "{}(", callee)?;
                write_separated(f, arguments, |f, argument| write!(f, "{argument}"))?;
                write!(f, ")")
            }
            Expression::Get {
                object, property, ..
            } => write!(f, "{}{}", object, property),
            Expression::Set {
                object,
                property,
                value,
                ..
            } => write!(f, "({}{} = {})", object, property, value),
            Expression::List(items) => {
                write!(f, "[")?;
                write_separated(f, items, |f, item| write!(f, "{item}"))?;
                write!(f, "]")
            }
            Expression::Dictionary(entries) => {
                write!(f, "{{ ")?;
                write_separated(f, entries, |f, entry| match entry {
                    DictionaryEntry::Named(key, value) => write!(f, "{key}: {value}"),
                    DictionaryEntry::Computed(key, value) => write!(f, "[{key}]: {value}"),
                    DictionaryEntry::Spread(value) => write!(f, "...{value}"),
                })?;
                write!(f, " }}")
            }
            Expression::Function(function) => {
                write!(f, "(")?;
                write_separated(f, &function.parameters, |f, parameter| {
                    write!(f, "{parameter}")
                })?;
                if let Some(rest) = &function.rest {
                    if !function.parameters.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "...{rest}")?;
                }
                write!(f, ") => ")?;
                match &function.body {
                    FunctionBody::Expression(expr) => write!(f, "{expr}"),
                    FunctionBody::Block(statements) => {
                        writeln!(f, "{{")?;
                        for statement in statements {
                            writeln!(f, "{}", statement)?;
                        }
                        write!(f, "}}")
                    }
                }
            }
            Expression::Spread(expr, _) => write!(f, "...{}", expr),
            Expression::Try(expr) => write!(f, "(try {})", expr),
        }
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::Name(name) => write!(f, ".{name}"),
            Property::Key(key) => write!(f, "[{key}]"),
            Property::Slice(start, end) => {
                write!(f, "[")?;
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                write!(f, ":")?;
                if let Some(end) = end {
                    write!(f, "{end}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Equal => write!(f, "=="),
            BinaryOperator::NotEqual => write!(f, "!="),
            BinaryOperator::LessThan => write!(f, "<"),
            BinaryOperator::LessThanOrEqual => write!(f, "<="),
            BinaryOperator::GreaterThan => write!(f, ">"),
            BinaryOperator::GreaterThanOrEqual => write!(f, ">="),
            BinaryOperator::Plus => write!(f, "+"),
            BinaryOperator::Minus => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
            BinaryOperator::Remainder => write!(f, "%"),
            BinaryOperator::Power => write!(f, "**"),
        }
    }
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "&&"),
            LogicalOperator::Or => write!(f, "||"),
            LogicalOperator::Nullish => write!(f, "??"),
        }
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Not => write!(f, "!"),
        }
    }
}

fn write_separated<T>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
    mut write_item: impl FnMut(&mut std::fmt::Formatter<'_>, &T) -> std::fmt::Result,
) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        write_item(f, item)?;
        if i != items.len() - 1 {
            write!(f, ", ")?;
        }
    }
    Ok(())
}
