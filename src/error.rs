use std::fmt::Write;

/// Every way a Bang program can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    // Tokenizing
    #[error("Unterminated string")]
    UnterminatedString,
    #[error("Unexpected character \"{0}\"")]
    UnexpectedCharacter(char),

    // Parsing
    #[error("Expected \"{expected}\" but found \"{found}\"")]
    Expected { expected: String, found: String },
    #[error("Unexpected \"{0}\"")]
    Unexpected(String),
    #[error("Expected an identifier but found \"{0}\"")]
    ExpectedIdentifier(String),
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Only one rest element is allowed and it must be the last element")]
    RestNotLast,

    // Bindings
    #[error("Variable \"{0}\" has already been declared")]
    AlreadyDeclared(String),
    #[error("Unknown variable \"{0}\"")]
    UndeclaredVariable(String),
    #[error("Cannot reassign constant \"{0}\"")]
    ConstantReassignment(String),

    // Types and operators
    #[error("Operator \"{operator}\" is not defined for types \"{left}\" and \"{right}\"")]
    InvalidBinary {
        operator: String,
        left: &'static str,
        right: &'static str,
    },
    #[error("Operator \"{operator}\" is not defined for type \"{operand}\"")]
    InvalidUnary {
        operator: String,
        operand: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Expected {expected} arguments but got {got} when calling \"{name}\"")]
    WrongArity {
        name: String,
        expected: String,
        got: usize,
    },
    #[error("Expected a {expected} argument but found \"{found}\"")]
    ExpectedArgument {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Value of type \"{0}\" is not callable")]
    NotAFunction(&'static str),
    #[error("Property \"{property}\" does not exist on type \"{type_name}\"")]
    UnknownProperty {
        property: String,
        type_name: &'static str,
    },
    #[error("Cannot set property \"{property}\" on type \"{type_name}\"")]
    CannotSetProperty {
        property: String,
        type_name: &'static str,
    },
    #[error("Index {index} is out of range for a list of length {length}")]
    IndexOutOfRange { index: f64, length: usize },
    #[error("Cannot spread a value of type \"{0}\" here")]
    InvalidSpread(&'static str),
    #[error("Cannot use a value of type \"{0}\" as a key")]
    InvalidKey(&'static str),
    #[error("Spread is only allowed in lists, dictionaries and call arguments")]
    MisplacedSpread,
    #[error("Cannot destructure a \"{found}\" as a {expected}")]
    InvalidDestructure {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Cannot mutate a frozen {0}")]
    Frozen(&'static str),
    #[error("Cannot build a string longer than {limit} bytes")]
    StringTooLong { limit: usize },

    // Libraries and control flow
    #[error("Unknown library \"{0}\"")]
    UnknownLibrary(String),
    #[error("Loop limit reached: infinite loop detected")]
    InfiniteLoop,
    #[error("Cannot return outside of a function")]
    ReturnOutsideFunction,
    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("{0}")]
    Message(String),
}

/// The single language-level error: what went wrong, where, and the source it
/// went wrong in.
///
/// A `line` of 0 means the line is unknown.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct LanguageError {
    pub kind: ErrorKind,
    pub line: usize,
    pub source_lines: Option<Vec<String>>,
}

impl LanguageError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            line: 0,
            source_lines: None,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Sets the line unless a more precise one has already been recorded.
    pub fn with_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if self.source_lines.is_none() {
            self.source_lines = Some(source.lines().map(str::to_string).collect());
        }
        self
    }

    /// Renders the message followed by up to `around` lines of source either
    /// side of the failing line, with the failing line marked.
    pub fn context(&self, around: usize) -> String {
        let mut output = String::new();
        if self.line == 0 {
            let _ = write!(output, "Error: {}", self.kind);
        } else {
            let _ = write!(output, "Error on line {}: {}", self.line, self.kind);
        }

        let Some(lines) = &self.source_lines else {
            return output;
        };
        if self.line == 0 || self.line > lines.len() {
            return output;
        }

        let first = self.line.saturating_sub(around).max(1);
        let last = (self.line + around).min(lines.len());
        output.push('\n');
        for number in first..=last {
            let marker = if number == self.line { ">" } else { " " };
            let _ = write!(output, "\n{marker} {number:4} | {}", lines[number - 1]);
        }
        output
    }
}

impl From<ErrorKind> for LanguageError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// A failure inside a collaborator supplied by the embedding application.
///
/// These are never caught by `try`; they abort evaluation and surface to the
/// embedder unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl From<std::io::Error> for HostError {
    fn from(error: std::io::Error) -> Self {
        HostError(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Language(#[from] LanguageError),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::Language(kind.into())
    }
}

impl Error {
    pub fn with_line(self, line: usize) -> Self {
        match self {
            Error::Language(error) => Error::Language(error.with_line(line)),
            host => host,
        }
    }

    pub fn with_source(self, source: &str) -> Self {
        match self {
            Error::Language(error) => Error::Language(error.with_source(source)),
            host => host,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_line_is_only_set_once() {
        let error = LanguageError::new(ErrorKind::DivisionByZero)
            .with_line(3)
            .with_line(7);
        assert_eq!(error.line, 3);
    }

    #[test]
    fn test_context_marks_failing_line() {
        let error = LanguageError::new(ErrorKind::UndeclaredVariable("b".to_string()))
            .with_line(2)
            .with_source("let a = 1\nb\nlet c = 3");
        let context = error.context(1);
        assert!(context.starts_with("Error on line 2: Unknown variable \"b\""));
        assert!(context.contains(">    2 | b"));
        assert!(context.contains("     1 | let a = 1"));
        assert!(context.contains("     3 | let c = 3"));
    }

    #[test]
    fn test_context_without_line() {
        let error = LanguageError::new(ErrorKind::InfiniteLoop).with_source("while (true) 1");
        assert_eq!(
            error.context(2),
            "Error: Loop limit reached: infinite loop detected"
        );
    }
}
