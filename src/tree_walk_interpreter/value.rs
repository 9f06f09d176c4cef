use std::{
    cell::{Cell, Ref, RefCell},
    cmp::Ordering,
    fmt::{Debug, Display},
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{
    ast::{BinaryOperator, UnaryOperator},
    error::{ErrorKind, LanguageError},
};

use super::callable::Function;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    List(Rc<List>),
    Dictionary(Rc<Dictionary>),
    Function(Rc<Function>),
    Error(Rc<LanguageError>),
    Unique(Rc<Unique>),
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(List::new(items)))
    }

    pub fn dictionary(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Dictionary(Rc::new(Dictionary::new(pairs.into_iter().collect())))
    }

    /// A dictionary that rejects mutation, used for library modules.
    pub fn frozen_dictionary(pairs: impl IntoIterator<Item = (String, Value)>) -> Self {
        let dictionary = Dictionary::new(pairs.into_iter().collect());
        dictionary.set_frozen(true);
        Value::Dictionary(Rc::new(dictionary))
    }

    pub fn function(function: Function) -> Self {
        Value::Function(Rc::new(function))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dictionary(_) => "dictionary",
            Value::Function(_) => "function",
            Value::Error(_) => "error",
            Value::Unique(_) => "unique",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(list) => list.len() != 0,
            Value::Dictionary(dictionary) => dictionary.len() != 0,
            Value::Function(_) | Value::Error(_) | Value::Unique(_) => true,
        }
    }

    /// The dictionary key a value stands for: strings as themselves, numbers
    /// in their printed form.
    pub fn to_key(&self) -> Result<String, ErrorKind> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(format_number(*n)),
            other => Err(ErrorKind::InvalidKey(other.type_name())),
        }
    }

    pub fn as_number(&self) -> Result<f64, ErrorKind> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(ErrorKind::ExpectedArgument {
                expected: "number",
                found: other.type_name(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&str, ErrorKind> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ErrorKind::ExpectedArgument {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    /// Ordering for `<` and friends and for sorting without a comparator.
    pub fn compare(&self, other: &Value) -> Result<Ordering, ErrorKind> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b).unwrap_or(Ordering::Equal)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            _ => Err(ErrorKind::InvalidBinary {
                operator: BinaryOperator::LessThan.to_string(),
                left: self.type_name(),
                right: other.type_name(),
            }),
        }
    }

    fn fmt_nested(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.items.borrow() == *b.items.borrow()
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let a = a.entries.borrow();
                let b = b.entries.borrow();
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| other == value))
            }
            (Value::Function(a), Value::Function(b)) => a.same_body(b),
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b),
            (Value::Unique(a), Value::Unique(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.items().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                write!(f, "]")
            }
            Value::Dictionary(dictionary) => {
                let entries = dictionary.entries.borrow();
                if entries.len() == 0 {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.fmt_nested(f)?;
                }
                write!(f, " }}")
            }
            Value::Function(function) => write!(f, "<function {}>", function.name),
            Value::Error(error) => write!(f, "<error: {}>", error.message()),
            Value::Unique(unique) => match &unique.description {
                Some(description) => write!(f, "<unique {}>", description),
                None => write!(f, "<unique>"),
            },
        }
    }
}

/// Numbers print without a trailing `.0` and with JavaScript-style names for
/// the non-finite values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// A list value. Items live behind a `RefCell` so every holder of the list
/// observes in-place mutation.
#[derive(Debug, Default)]
pub struct List {
    items: RefCell<Vec<Value>>,
    frozen: Cell<bool>,
}

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items),
            frozen: Cell::new(false),
        }
    }

    pub fn items(&self) -> Ref<'_, Vec<Value>> {
        self.items.borrow()
    }

    /// A copy of the current items, safe to hold while calling back into the
    /// interpreter.
    pub fn snapshot(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.borrow().get(index).cloned()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.set(frozen);
    }

    /// Freezing counts as a mutation, so a frozen value cannot be frozen again.
    pub fn freeze(&self) -> Result<(), ErrorKind> {
        if self.is_frozen() {
            return Err(ErrorKind::Frozen("list"));
        }
        self.set_frozen(true);
        Ok(())
    }

    /// Runs `f` against the items unless the list is frozen.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut Vec<Value>) -> T) -> Result<T, ErrorKind> {
        if self.is_frozen() {
            return Err(ErrorKind::Frozen("list"));
        }
        Ok(f(&mut self.items.borrow_mut()))
    }
}

/// String keys in insertion order with a hash index for lookup.
#[derive(Debug, Default, Clone)]
pub struct Entries {
    pairs: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
}

impl Entries {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.pairs[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Replaces the value of an existing key in place, otherwise appends.
    pub fn insert(&mut self, key: String, value: Value) {
        match self.index.get(&key) {
            Some(&i) => self.pairs[i].1 = value,
            None => {
                self.index.insert(key.clone(), self.pairs.len());
                self.pairs.push((key, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.pairs.remove(i);
        for position in self.index.values_mut() {
            if *position > i {
                *position -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.pairs.iter().map(|(key, value)| (key, value))
    }
}

impl FromIterator<(String, Value)> for Entries {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut entries = Entries::default();
        for (key, value) in iter {
            entries.insert(key, value);
        }
        entries
    }
}

#[derive(Debug, Default)]
pub struct Dictionary {
    entries: RefCell<Entries>,
    frozen: Cell<bool>,
}

impl Dictionary {
    pub fn new(entries: Entries) -> Self {
        Self {
            entries: RefCell::new(entries),
            frozen: Cell::new(false),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn pairs(&self) -> Vec<(String, Value)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> Entries {
        self.entries.borrow().clone()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.set(frozen);
    }

    /// Freezing counts as a mutation, so a frozen value cannot be frozen again.
    pub fn freeze(&self) -> Result<(), ErrorKind> {
        if self.is_frozen() {
            return Err(ErrorKind::Frozen("dictionary"));
        }
        self.set_frozen(true);
        Ok(())
    }

    pub fn set(&self, key: String, value: Value) -> Result<(), ErrorKind> {
        if self.is_frozen() {
            return Err(ErrorKind::Frozen("dictionary"));
        }
        self.entries.borrow_mut().insert(key, value);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<Option<Value>, ErrorKind> {
        if self.is_frozen() {
            return Err(ErrorKind::Frozen("dictionary"));
        }
        Ok(self.entries.borrow_mut().remove(key))
    }
}

/// An opaque token equal only to itself.
#[derive(Debug)]
pub struct Unique {
    pub description: Option<String>,
}

pub fn unary(operator: UnaryOperator, operand: &Value) -> Result<Value, ErrorKind> {
    match (operator, operand) {
        (UnaryOperator::Negate, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOperator::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
        (operator, operand) => Err(ErrorKind::InvalidUnary {
            operator: operator.to_string(),
            operand: operand.type_name(),
        }),
    }
}

pub fn binary(operator: BinaryOperator, left: &Value, right: &Value) -> Result<Value, ErrorKind> {
    use BinaryOperator as Op;

    let value = match (operator, left, right) {
        (Op::Equal, a, b) => Value::Boolean(a == b),
        (Op::NotEqual, a, b) => Value::Boolean(a != b),

        (Op::Plus, Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Op::Plus, Value::String(a), Value::String(b)) => Value::String(format!("{a}{b}")),
        (Op::Plus, Value::List(a), Value::List(b)) => {
            let mut items = a.snapshot();
            items.extend(b.snapshot());
            Value::list(items)
        }
        (Op::Plus, Value::Dictionary(a), Value::Dictionary(b)) => {
            let mut entries = a.snapshot();
            for (key, value) in b.pairs() {
                entries.insert(key, value);
            }
            Value::Dictionary(Rc::new(Dictionary::new(entries)))
        }

        (Op::Minus, Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (Op::Multiply, Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (Op::Multiply, Value::String(s), Value::Number(n))
        | (Op::Multiply, Value::Number(n), Value::String(s)) => Value::String(repeat(s, *n)?),
        (Op::Divide | Op::Remainder, Value::Number(_), Value::Number(b)) if *b == 0.0 => {
            return Err(ErrorKind::DivisionByZero)
        }
        (Op::Divide, Value::Number(a), Value::Number(b)) => Value::Number(a / b),
        (Op::Remainder, Value::Number(a), Value::Number(b)) => Value::Number(a % b),
        (Op::Power, Value::Number(a), Value::Number(b)) => Value::Number(a.powf(*b)),

        (Op::LessThan, Value::Number(a), Value::Number(b)) => Value::Boolean(a < b),
        (Op::LessThanOrEqual, Value::Number(a), Value::Number(b)) => Value::Boolean(a <= b),
        (Op::GreaterThan, Value::Number(a), Value::Number(b)) => Value::Boolean(a > b),
        (Op::GreaterThanOrEqual, Value::Number(a), Value::Number(b)) => Value::Boolean(a >= b),
        (Op::LessThan, Value::String(a), Value::String(b)) => Value::Boolean(a < b),
        (Op::LessThanOrEqual, Value::String(a), Value::String(b)) => Value::Boolean(a <= b),
        (Op::GreaterThan, Value::String(a), Value::String(b)) => Value::Boolean(a > b),
        (Op::GreaterThanOrEqual, Value::String(a), Value::String(b)) => Value::Boolean(a >= b),

        (operator, left, right) => {
            return Err(ErrorKind::InvalidBinary {
                operator: operator.to_string(),
                left: left.type_name(),
                right: right.type_name(),
            })
        }
    };

    Ok(value)
}

/// Largest string, in bytes, that `repeat` and padding will build.
pub const MAX_STRING_LENGTH: usize = 1 << 26;

pub fn repeat(s: &str, times: f64) -> Result<String, ErrorKind> {
    if times < 0.0 || !times.is_finite() {
        return Err(ErrorKind::Message(format!(
            "Cannot repeat a string {} times",
            format_number(times)
        )));
    }
    let times = times as usize;
    match s.len().checked_mul(times) {
        Some(length) if length <= MAX_STRING_LENGTH => Ok(s.repeat(times)),
        _ => Err(ErrorKind::StringTooLong {
            limit: MAX_STRING_LENGTH,
        }),
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("variadic", &self.variadic)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn test_truthiness() {
        for falsy in [
            Value::Null,
            Value::Boolean(false),
            Value::Number(0.0),
            Value::Number(f64::NAN),
            string(""),
            Value::list(vec![]),
            Value::dictionary(vec![]),
        ] {
            assert!(!falsy.is_truthy(), "{falsy} should be falsy");
        }
        for truthy in [Value::Number(-1.0), string("0"), Value::list(vec![Value::Null])] {
            assert!(truthy.is_truthy(), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_structural_equality() {
        let items = || vec![Value::Number(1.0), Value::Boolean(false), Value::Null, string("x")];
        assert_eq!(Value::list(items()), Value::list(items()));

        let mut changed = items();
        changed[3] = string("y");
        assert_ne!(Value::list(items()), Value::list(changed));

        let mut shorter = items();
        shorter.pop();
        assert_ne!(Value::list(items()), Value::list(shorter));

        let ab = || {
            Value::dictionary(vec![
                ("a".to_string(), Value::Number(1.0)),
                ("b".to_string(), Value::Number(2.0)),
            ])
        };
        assert_eq!(ab(), ab());
        assert_ne!(
            ab(),
            Value::dictionary(vec![("a".to_string(), Value::Number(1.0))])
        );
    }

    #[test]
    fn test_equality_needs_matching_types() {
        assert_ne!(Value::Number(0.0), Value::Boolean(false));
        assert_ne!(string("1"), Value::Number(1.0));
        assert_ne!(Value::Null, Value::Boolean(false));
    }

    #[test]
    fn test_unique_compares_by_identity() {
        let a = Value::Unique(Rc::new(Unique { description: None }));
        let b = Value::Unique(Rc::new(Unique { description: None }));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_arithmetic() {
        let number = Value::Number;
        assert_eq!(
            binary(BinaryOperator::Plus, &number(1.0), &number(2.0)).unwrap(),
            number(3.0)
        );
        assert_eq!(
            binary(BinaryOperator::Multiply, &string("ab"), &number(3.0)).unwrap(),
            string("ababab")
        );
        assert_eq!(
            binary(BinaryOperator::Remainder, &number(-7.0), &number(3.0)).unwrap(),
            number(-1.0)
        );
        assert_eq!(
            binary(BinaryOperator::Divide, &number(1.0), &number(0.0)).unwrap_err(),
            ErrorKind::DivisionByZero
        );
    }

    #[test]
    fn test_no_implicit_coercion() {
        let error = binary(BinaryOperator::Plus, &Value::Number(1.0), &string("")).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Operator \"+\" is not defined for types \"number\" and \"string\""
        );
    }

    #[test]
    fn test_concatenation_and_merge() {
        let joined = binary(
            BinaryOperator::Plus,
            &Value::list(vec![Value::Number(1.0)]),
            &Value::list(vec![Value::Number(2.0)]),
        )
        .unwrap();
        assert_eq!(joined.to_string(), "[1, 2]");

        let merged = binary(
            BinaryOperator::Plus,
            &Value::dictionary(vec![
                ("a".to_string(), Value::Number(1.0)),
                ("b".to_string(), Value::Number(2.0)),
            ]),
            &Value::dictionary(vec![("a".to_string(), Value::Number(3.0))]),
        )
        .unwrap();
        assert_eq!(merged.to_string(), "{ a: 3, b: 2 }");
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            unary(UnaryOperator::Not, &string("")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            unary(UnaryOperator::Negate, &string("a")).unwrap_err(),
            ErrorKind::InvalidUnary {
                operator: "-".to_string(),
                operand: "string"
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
        assert_eq!(Value::Number(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "Infinity");
        assert_eq!(
            Value::list(vec![string("a"), Value::Null, Value::list(vec![])]).to_string(),
            "[\"a\", null, []]"
        );
        assert_eq!(Value::dictionary(vec![]).to_string(), "{}");
    }

    #[test]
    fn test_frozen_list_rejects_mutation() {
        let list = List::new(vec![]);
        list.set_frozen(true);
        assert_eq!(
            list.mutate(|items| items.push(Value::Null)).unwrap_err(),
            ErrorKind::Frozen("list")
        );
        list.set_frozen(false);
        assert!(list.mutate(|items| items.push(Value::Null)).is_ok());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_freezing_twice_fails() {
        let list = List::new(vec![]);
        assert_eq!(list.freeze(), Ok(()));
        assert_eq!(list.freeze(), Err(ErrorKind::Frozen("list")));

        let dictionary = Dictionary::new(Entries::default());
        assert_eq!(dictionary.freeze(), Ok(()));
        assert_eq!(dictionary.freeze(), Err(ErrorKind::Frozen("dictionary")));
    }

    #[test]
    fn test_repeat_is_bounded() {
        assert_eq!(repeat("ab", 3.0), Ok("ababab".to_string()));
        assert_eq!(repeat("ab", 0.0), Ok(String::new()));
        assert!(matches!(
            repeat("ab", f64::INFINITY),
            Err(ErrorKind::Message(_))
        ));
        assert!(repeat("ab", -1.0).is_err());
        assert_eq!(
            repeat("ab", 1e15),
            Err(ErrorKind::StringTooLong {
                limit: MAX_STRING_LENGTH
            })
        );
        assert_eq!(
            binary(BinaryOperator::Multiply, &Value::Number(1e300), &string("ab")),
            Err(ErrorKind::StringTooLong {
                limit: MAX_STRING_LENGTH
            })
        );
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut entries: Entries = vec![
            ("b".to_string(), Value::Number(1.0)),
            ("a".to_string(), Value::Number(2.0)),
            ("c".to_string(), Value::Number(3.0)),
        ]
        .into_iter()
        .collect();
        entries.insert("b".to_string(), Value::Number(4.0));
        assert_eq!(entries.remove("a"), Some(Value::Number(2.0)));
        entries.insert("a".to_string(), Value::Number(5.0));

        let keys: Vec<_> = entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
        assert_eq!(entries.get("c"), Some(&Value::Number(3.0)));
    }
}
