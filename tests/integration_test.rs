use std::{cell::RefCell, collections::HashMap, rc::Rc};

use bang::{
    error::{ErrorKind, HostError},
    tree_walk_interpreter::{Fetch, FileSystem, Host, Request, Response, Value},
    Error, Interpreter, LanguageError,
};
use pretty_assertions::assert_eq;

fn test_valid_program(source: &str, expected_output: &str) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::new(output.clone());
    interpreter
        .run(source)
        .expect("Run should work on valid program");
    let output = String::from_utf8(output.take()).expect("Output should be valid UTF-8");
    assert_eq!(output, expected_output);
}

/// The printed value of every top-level statement.
fn results(source: &str) -> Vec<String> {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    interpreter
        .run(source)
        .expect("Run should work on valid program")
        .iter()
        .map(Value::to_string)
        .collect()
}

fn last_result(source: &str) -> String {
    results(source).pop().expect("Program should have statements")
}

fn language_error(source: &str) -> LanguageError {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    match interpreter.run(source) {
        Err(Error::Language(error)) => error,
        other => panic!("Expected a language error, got {other:?}"),
    }
}

#[test]
fn test_declarations_and_lookup() {
    assert_eq!(
        results("let a = 1\nconst b = \"two\"\na\nb"),
        vec!["null", "null", "1", "two"]
    );
    assert_eq!(
        language_error("let a = 1\nlet a = 2").message(),
        "Variable \"a\" has already been declared"
    );
    assert_eq!(
        language_error("missing").kind,
        ErrorKind::UndeclaredVariable("missing".to_string())
    );
}

#[test]
fn test_assignment_errors() {
    let error = language_error("const a = 1\na = 2");
    assert_eq!(error.kind, ErrorKind::ConstantReassignment("a".to_string()));
    assert_eq!(error.line, 2);

    assert_eq!(
        language_error("b = 1").kind,
        ErrorKind::UndeclaredVariable("b".to_string())
    );
}

#[test]
fn test_shadowing_in_blocks() {
    let source = r#"
let a = "outer"
if (true)
  let a = "inner"
  print(a)
print(a)
"#;
    test_valid_program(source, "inner\nouter\n");
}

#[test]
fn test_structural_equality() {
    let source = r#"
[1, false, null, "x"] == [1, false, null, "x"]
[1, false, null, "x"] == [1, false, null, "y"]
[1, false, null, "x"] == [1, false, null]
{ a: 1, b: 2 } == { a: 1, b: 2 }
{ a: 1, b: 2 } == { a: 1 }
1 == "1"
null == false
"#;
    assert_eq!(
        results(source),
        vec!["true", "false", "false", "true", "false", "false", "false"]
    );
}

#[test]
fn test_slices() {
    let source = r#"
let list = [1, 2, 3, 4, 5]
list[1:3]
list[-3:-1]
list[9:20]
list[:2]
list[3:]
"hello"[1:-1]
"#;
    assert_eq!(
        results(source)[1..],
        ["[2, 3]", "[3, 4]", "[]", "[1, 2]", "[4, 5]", "ell"]
    );
}

#[test]
fn test_indexing() {
    let source = r#"
let list = [1, 2, 3]
list[0]
list[-1]
list[5]
list[1] = 20
list
"abc"[1]
"#;
    assert_eq!(
        results(source)[1..],
        ["1", "3", "null", "20", "[1, 20, 3]", "b"]
    );
    assert_eq!(
        language_error("let list = [1]\nlist[3] = 0").message(),
        "Index 3 is out of range for a list of length 1"
    );
}

#[test]
fn test_closure() {
    let source = r#"
let makeCounter = () =>
  let count = 0
  return () =>
    count += 1
    return count

let counter = makeCounter()
print(counter())
print(counter())
let other = makeCounter()
print(other())
"#;
    test_valid_program(source, "1\n2\n1\n");
}

#[test]
fn test_closures_share_frames() {
    let source = r#"
let makeAccount = () =>
  let balance = 0
  return {
    deposit: (amount) => balance += amount,
    balance: () => balance,
  }

let account = makeAccount()
account.deposit(10)
account.deposit(5)
print(account.balance())
"#;
    test_valid_program(source, "15\n");
}

#[test]
fn test_lexical_scope() {
    let source = r#"
let a = "global"
let show = () => a
let run = () =>
  let a = "local"
  return show()
print(run())
"#;
    test_valid_program(source, "global\n");
}

#[test]
fn test_recursion() {
    let source = r#"
let fib = (n) =>
  if (n <= 1)
    return n
  return fib(n - 1) + fib(n - 2)

print([0, 1, 2, 3, 4, 5, 6, 7, 8, 9].map(fib))
"#;
    test_valid_program(source, "[0, 1, 1, 2, 3, 5, 8, 13, 21, 34]\n");
}

#[test]
fn test_if_else_chain() {
    let source = r#"
let describe = (n) =>
  if (n > 0)
    return "positive"
  else if (n < 0)
    return "negative"
  return "zero"

print(describe(5), describe(-1), describe(0))
"#;
    test_valid_program(source, "positive negative zero\n");
}

#[test]
fn test_try() {
    assert_eq!(last_result("try (1 + 2)"), "[3, null]");
    assert_eq!(
        last_result("try (1 + \"\")"),
        "[null, <error: Operator \"+\" is not defined for types \"number\" and \"string\">]"
    );

    let source = r#"
let [_, error] = try undefinedName
error.message
error.line
"#;
    assert_eq!(
        results(source)[1..],
        ["Unknown variable \"undefinedName\"", "2"]
    );
}

#[test]
fn test_try_inside_functions() {
    let source = r#"
let safeDivide = (a, b) =>
  let [result, error] = try (a / b)
  return error ?? result

print(safeDivide(6, 3))
print(safeDivide(1, 0))
"#;
    test_valid_program(source, "2\n<error: Division by zero>\n");
}

#[test]
fn test_loop_without_condition_variables_trips() {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    let error = interpreter
        .run("let a = 0; while (true) a += 1")
        .unwrap_err();
    assert_eq!(
        error,
        Error::Language(
            LanguageError::new(ErrorKind::InfiniteLoop)
                .with_line(1)
                .with_source("let a = 0; while (true) a += 1")
        )
    );
    assert_eq!(interpreter.get("a"), Some(Value::Number(1000.0)));
}

#[test]
fn test_loop_with_progress_completes() {
    assert_eq!(last_result("let a = 0; while (a < 1001) a += 1; a"), "1001");
}

#[test]
fn test_loop_only_watches_condition_names() {
    let error = language_error("let a = 0\nlet b = 0\nwhile (a < 1) b += 1");
    assert_eq!(error.kind, ErrorKind::InfiniteLoop);
    assert_eq!(error.line, 3);

    let source = r#"
let i = 0
let step = () => i += 1
while (i < 2000) step()
i
"#;
    assert_eq!(last_result(source), "2000");
}

#[test]
fn test_loop_body_block() {
    let source = r#"
let i = 0
let total = 0
while (i < 5)
  i += 1
  if (i % 2 == 0)
    total += i
print(total)
"#;
    test_valid_program(source, "6\n");
}

#[test]
fn test_return_outside_function() {
    assert_eq!(
        language_error("return 1").kind,
        ErrorKind::ReturnOutsideFunction
    );
    let error = language_error("let a = 1\nif (true)\n  return a");
    assert_eq!(error.kind, ErrorKind::ReturnOutsideFunction);
    assert_eq!(error.line, 3);
    assert!(error.context(0).starts_with("Error on line 3"));
}

fn countdown_interpreter(max_call_depth: usize) -> Interpreter {
    let host = Host::new()
        .with_stdout(Rc::new(RefCell::new(Vec::new())))
        .with_max_call_depth(max_call_depth);
    let mut interpreter = Interpreter::with_host(host);
    let source = r#"
let countdown = (n) =>
  if (n == 0) return 0
  return countdown(n - 1)
"#;
    interpreter
        .run(source)
        .expect("Run should work on valid program");
    interpreter
}

#[test]
fn test_call_depth_limit() {
    let mut interpreter = countdown_interpreter(10);
    assert_eq!(interpreter.run("countdown(5)"), Ok(vec![Value::Number(0.0)]));

    let Err(Error::Language(error)) = interpreter.run("countdown(20)") else {
        panic!("Deep recursion should be a language error");
    };
    assert_eq!(error.kind, ErrorKind::CallDepthExceeded(10));

    let results = interpreter
        .run("let [_, error] = try countdown(20)\nerror.message\ncountdown(9)")
        .expect("Run should work on valid program");
    assert_eq!(
        results[1..],
        [
            Value::String("Maximum call depth of 10 exceeded".to_string()),
            Value::Number(0.0)
        ]
    );
}

#[test]
fn test_runaway_recursion_is_an_error() {
    let kind = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(|| language_error("let f = (n) => f(n + 1)\nf(0)").kind)
        .expect("Thread should spawn")
        .join()
        .expect("Recursion should not overflow the stack");
    assert_eq!(
        kind,
        ErrorKind::CallDepthExceeded(bang::tree_walk_interpreter::DEFAULT_MAX_CALL_DEPTH)
    );
}

#[test]
fn test_error_lines_and_context() {
    let error = language_error("let a = 1\nlet b = a + c\nlet d = 4");
    assert_eq!(error.line, 2);
    assert_eq!(
        error.context(1),
        "Error on line 2: Unknown variable \"c\"\n\n     1 | let a = 1\n>    2 | let b = a + c\n     3 | let d = 4"
    );

    let error = language_error("let a = 1\nlet s = \"unterminated");
    assert_eq!(error.kind, ErrorKind::UnterminatedString);
    assert_eq!(error.line, 2);

    let error = language_error("let a = 1\n\nlet = 2");
    assert_eq!(error.line, 3);
}

#[test]
fn test_tokenizing_is_deterministic() {
    let source = "let a = [1, 2]\nwhile (a.length < 5)\n  a.push(.5)\n";
    assert_eq!(
        bang::tokenizer::tokens(source).unwrap(),
        bang::tokenizer::tokens(source).unwrap()
    );
}

#[test]
fn test_freezing() {
    assert_eq!(
        language_error("[].freeze().push(1)").message(),
        "Cannot mutate a frozen list"
    );
    assert_eq!(last_result("[].freeze().unfreeze().push(1)"), "[1]");
    assert_eq!(
        language_error("[].freeze().freeze()").kind,
        ErrorKind::Frozen("list")
    );
    assert_eq!(
        language_error("{}.freeze().freeze()").kind,
        ErrorKind::Frozen("dictionary")
    );

    let source = r#"
let settings = { debug: true }.freeze()
let [_, error] = try (settings.debug = false)
error.message
settings.isFrozen()
settings.copy().isFrozen()
"#;
    assert_eq!(
        results(source)[2..],
        ["Cannot mutate a frozen dictionary", "true", "false"]
    );
}

#[test]
fn test_destructuring() {
    let source = r#"
let [first, ...others] = [1, 2, 3]
let { a, b: renamed, ...remaining } = { a: 1, b: 2, c: 3, d: 4 }
let [x, y, z] = [1]
[first, others, a, renamed, remaining, y]
"#;
    assert_eq!(
        last_result(source),
        "[1, [2, 3], 1, 2, { c: 3, d: 4 }, null]"
    );
    assert_eq!(
        language_error("let [a] = 5").message(),
        "Cannot destructure a \"number\" as a list"
    );
}

#[test]
fn test_parameter_destructuring() {
    let source = r#"
let area = ({ width, height }) => width * height
let head = ([first]) => first
print(area({ width: 3, height: 4, colour: "red" }), head(["a", "b"]))
"#;
    test_valid_program(source, "12 a\n");
}

#[test]
fn test_spread_and_variadics() {
    let source = r#"
let sum = (...numbers) => numbers.reduce((a, b) => a + b, 0)
let values = [1, 2, 3]
sum(...values, 4)
sum()
[0, ...values]
{ ...{ a: 1, b: 1 }, b: 2 }
"#;
    assert_eq!(
        results(source)[2..],
        ["10", "0", "[0, 1, 2, 3]", "{ a: 1, b: 2 }"]
    );
    assert_eq!(
        language_error("let f = (...xs) => xs\nf(...5)").message(),
        "Cannot spread a value of type \"number\" here"
    );
}

#[test]
fn test_arity() {
    assert_eq!(
        language_error("let f = (a) => a\nf(1, 2)").message(),
        "Expected 1 arguments but got 2 when calling \"f\""
    );
    assert_eq!(
        language_error("let f = (a, ...rest) => a\nf()").message(),
        "Expected at least 1 arguments but got 0 when calling \"f\""
    );
    assert_eq!(
        language_error("let n = 1\nn()").message(),
        "Value of type \"number\" is not callable"
    );
}

#[test]
fn test_functions_are_values() {
    let source = r#"
let double = (x) => x * 2
let alias = double
[double.name, double.arity, ((x) => x).name, alias == double, double == ((x) => x * 2)]
"#;
    assert_eq!(
        last_result(source),
        "[\"double\", 1, \"anonymous\", true, false]"
    );
}

#[test]
fn test_logical_operators() {
    let source = r#"
null ?? 5
0 ?? 5
0 || "fallback"
1 && 2
false and true
"" or null
let x = null
x ??= 3
"#;
    assert_eq!(
        results(source),
        vec!["5", "0", "fallback", "2", "false", "null", "null", "3"]
    );
}

#[test]
fn test_operators() {
    let source = r#"
2 ** 3 ** 2
-7 % 3
"ab" * 3
[1] + [2]
{ a: 1 } + { b: 2 }
"b" > "a"
!""
"#;
    assert_eq!(
        results(source),
        vec!["512", "-1", "ababab", "[1, 2]", "{ a: 1, b: 2 }", "true", "true"]
    );
    assert_eq!(language_error("1 / 0").message(), "Division by zero");
    assert_eq!(
        language_error("-\"a\"").message(),
        "Operator \"-\" is not defined for type \"string\""
    );
}

#[test]
fn test_string_properties() {
    let source = r#"
"Hello".length
"Hello".toUpperCase()
"a,b,c".split(",")
"5".padStart(3, "0")
"  trim me ".trim()
"banana".count("an")
"banana".indexOf("nan")
" 42 ".toNumber()
"#;
    assert_eq!(
        results(source),
        vec![
            "5",
            "HELLO",
            "[\"a\", \"b\", \"c\"]",
            "005",
            "trim me",
            "2",
            "2",
            "42"
        ]
    );
}

#[test]
fn test_oversized_strings_are_errors() {
    let too_long = ErrorKind::StringTooLong {
        limit: bang::tree_walk_interpreter::MAX_STRING_LENGTH,
    };
    assert_eq!(language_error("\"ab\" * 10 ** 300").kind, too_long);
    assert_eq!(language_error("\"ab\".repeat(10 ** 300)").kind, too_long);
    assert_eq!(language_error("\"a\".padEnd(10 ** 9)").kind, too_long);
    assert_eq!(
        language_error("import maths\n\"a\".padStart(maths.INFINITY)").kind,
        too_long
    );
    assert_eq!(
        language_error("import maths\n\"ab\".repeat(maths.INFINITY)").message(),
        "Cannot repeat a string Infinity times"
    );
    assert_eq!(
        language_error("import maths\n\"ab\" * maths.INFINITY").message(),
        "Cannot repeat a string Infinity times"
    );
    assert_eq!(last_result("\"ab\".padStart(5, \"-\")"), "---ab");
}

#[test]
fn test_number_keys_are_canonical() {
    let source = r#"
{ 1_000: "k" }[1000]
{ .5: "half" }[0.5]
{ 1.50: "x" }.keys()
{ [1.50]: "x" }.keys()
"#;
    assert_eq!(results(source), ["k", "half", "[\"1.5\"]", "[\"1.5\"]"]);
}

#[test]
fn test_list_properties() {
    let source = r#"
let list = [3, 1, 2]
[10, 20].map((x, i) => x + i)
list.filter((x) => x > 1)
list.find((x) => x < 3)
list.findIndex((x) => x == 7)
list.every((x) => x > 0)
list.some((x) => x > 2)
list.includes(2)
list.join("-")
list.copy().sort()
list.sort((a, b) => b - a)
list.pop()
list.length
"#;
    assert_eq!(
        results(source)[1..],
        [
            "[10, 21]",
            "[3, 2]",
            "1",
            "-1",
            "true",
            "true",
            "true",
            "3-1-2",
            "[1, 2, 3]",
            "[3, 2, 1]",
            "1",
            "2"
        ]
    );
}

#[test]
fn test_dictionary_properties() {
    let source = r#"
let d = { a: 1 }
d.set("b", 2)
d.keys()
d.values()
d.entries()
d.has("a")
d.get("zzz", "fallback")
d.delete("a")
d
d[1] = "one"
d["1"]
d.length
"#;
    assert_eq!(
        results(source)[1..],
        [
            "{ a: 1, b: 2 }",
            "[\"a\", \"b\"]",
            "[1, 2]",
            "[[\"a\", 1], [\"b\", 2]]",
            "true",
            "fallback",
            "1",
            "{ b: 2 }",
            "one",
            "one",
            "2"
        ]
    );
    assert_eq!(
        language_error("true.nope").message(),
        "Property \"nope\" does not exist on type \"boolean\""
    );
}

#[test]
fn test_number_properties() {
    let source = r#"
let n = 3.14159
n.toFixed(2)
n.isInteger()
(4).isInteger()
n.toString()
"#;
    assert_eq!(results(source)[1..], ["3.14", "false", "true", "3.14159"]);
}

#[test]
fn test_imports() {
    let source = r#"
import maths
from maths import { floor, PI as pi, nope }
import type as typeOf
print(maths.sqrt(16), floor(2.7), pi > 3, nope, typeOf([]))
print(maths.max(1, 5, 3), maths.min(), maths.round(2.5))
"#;
    test_valid_program(source, "4 2 true null list\n5 Infinity 3\n");

    assert_eq!(
        language_error("import maths\nmaths.PI = 3").message(),
        "Cannot mutate a frozen dictionary"
    );
    assert_eq!(
        language_error("import maths\nmaths = 1").kind,
        ErrorKind::ConstantReassignment("maths".to_string())
    );
}

#[test]
fn test_unknown_library() {
    let error = language_error("let a = 1\nimport file");
    assert_eq!(error.kind, ErrorKind::UnknownLibrary("file".to_string()));
    assert_eq!(error.line, 2);
    assert_eq!(
        language_error("import fetch").kind,
        ErrorKind::UnknownLibrary("fetch".to_string())
    );
    assert_eq!(
        language_error("import nonsense").kind,
        ErrorKind::UnknownLibrary("nonsense".to_string())
    );
}

#[test]
fn test_json() {
    let source = r#"
import json
let data = json.parse('{"b": 1, "a": [true, null]}')
print(data.a[0], data.b, data.keys())
print(json.stringify({ x: 1, y: [1.5, "s"], f: () => 1 }))
print(json.stringify({ a: [1] }, 2))
"#;
    test_valid_program(
        source,
        "true 1 [\"b\", \"a\"]\n{\"x\":1,\"y\":[1.5,\"s\"],\"f\":null}\n{\n  \"a\": [\n    1\n  ]\n}\n",
    );

    let error = language_error("import json\njson.parse('{')");
    assert!(error.message().starts_with("Invalid JSON"));
}

#[test]
fn test_regex() {
    let source = r##"
import regex
let digits = regex("[0-9]+")
print(digits.test("a1"), digits.find("ab12c3"), digits.findAll("ab12c3"))
print(digits.replace("a1b22", "#"), digits.replaceAll("a1b22", "#"), digits.split("a1b22c"))
print(regex("([a-z]+)-([0-9]+)").captures("ab-12"), digits.find("none"), digits.pattern)
"##;
    test_valid_program(
        source,
        "true 12 [\"12\", \"3\"]\na#b22 a#b# [\"a\", \"b\", \"c\"]\n[\"ab-12\", \"ab\", \"12\"] null [0-9]+\n",
    );

    let error = language_error("import regex\nregex(\"(\")");
    assert!(error.message().starts_with("Invalid regular expression"));
}

#[test]
fn test_unique() {
    let source = r#"
import unique
let a = unique("tag")
let b = unique("tag")
[a == a, a == b, a.description, unique().description]
"#;
    assert_eq!(last_result(source), "[true, false, \"tag\", null]");
}

#[derive(Default)]
struct MemoryFileSystem {
    files: RefCell<HashMap<String, String>>,
}

impl FileSystem for MemoryFileSystem {
    fn read(&self, path: &str) -> Result<String, HostError> {
        self.files
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| HostError(format!("no such file: {path}")))
    }

    fn write(&self, path: &str, contents: &str) -> Result<(), HostError> {
        self.files
            .borrow_mut()
            .insert(path.to_string(), contents.to_string());
        Ok(())
    }

    fn append(&self, path: &str, contents: &str) -> Result<(), HostError> {
        self.files
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .push_str(contents);
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), HostError> {
        self.files.borrow_mut().remove(path);
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> Result<(), HostError> {
        let contents = self.read(from)?;
        self.write(to, &contents)
    }

    fn mkdir(&self, _path: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn rmdir(&self, _path: &str) -> Result<(), HostError> {
        Ok(())
    }

    fn list(&self, _path: &str) -> Result<Vec<String>, HostError> {
        let mut names: Vec<_> = self.files.borrow().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &str) -> Result<bool, HostError> {
        Ok(self.files.borrow().contains_key(path))
    }
}

#[test]
fn test_file_module() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let file_system = Rc::new(MemoryFileSystem::default());
    let host = Host::new()
        .with_stdout(output.clone())
        .with_file_system(file_system.clone());
    let mut interpreter = Interpreter::with_host(host);

    let source = r#"
import file
file.write("notes.txt", "hello")
file.append("notes.txt", " world")
file.copy("notes.txt", "backup.txt")
print(file.read("backup.txt"), file.exists("notes.txt"), file.exists("other"))
file.remove("notes.txt")
print(file.list("."))
"#;
    interpreter.run(source).unwrap();
    assert_eq!(
        String::from_utf8(output.take()).unwrap(),
        "hello world true false\n[\"backup.txt\"]\n"
    );
    assert_eq!(
        file_system.files.borrow().get("backup.txt").map(String::as_str),
        Some("hello world")
    );
}

#[test]
fn test_host_errors_are_not_caught() {
    let host = Host::new()
        .with_stdout(Rc::new(RefCell::new(Vec::new())))
        .with_file_system(Rc::new(MemoryFileSystem::default()));
    let mut interpreter = Interpreter::with_host(host);

    let error = interpreter
        .run("import file\ntry file.read(\"missing\")")
        .unwrap_err();
    assert_eq!(
        error,
        Error::Host(HostError("no such file: missing".to_string()))
    );
}

struct RecordingFetch {
    requests: RefCell<Vec<Request>>,
}

impl Fetch for RecordingFetch {
    fn fetch(&self, request: Request) -> Result<Response, HostError> {
        self.requests.borrow_mut().push(request);
        Ok(Response {
            status: 201,
            body: "created".to_string(),
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
        })
    }
}

#[test]
fn test_fetch_module() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let fetch = Rc::new(RecordingFetch {
        requests: RefCell::new(Vec::new()),
    });
    let host = Host::new()
        .with_stdout(output.clone())
        .with_fetch(fetch.clone());
    let mut interpreter = Interpreter::with_host(host);

    let source = r#"
import fetch
let options = { method: "post", body: "x", headers: { accept: "text/plain" } }
let response = fetch("https://example.com/items", options)
print(response.status, response.ok, response.body, response.headers["content-type"])
"#;
    interpreter.run(source).unwrap();
    assert_eq!(
        String::from_utf8(output.take()).unwrap(),
        "201 true created text/plain\n"
    );
    assert_eq!(
        fetch.requests.borrow().as_slice(),
        [Request {
            url: "https://example.com/items".to_string(),
            method: "POST".to_string(),
            body: Some("x".to_string()),
            headers: vec![("accept".to_string(), "text/plain".to_string())],
        }]
    );
}

#[test]
fn test_host_values_and_functions() {
    let output = Rc::new(RefCell::new(Vec::new()));
    let host = Host::new()
        .with_stdout(output.clone())
        .with_value("answer", Value::Number(42.0))
        .with_function("double", 1, |arguments| match &arguments[0] {
            Value::Number(n) => Ok(Value::Number(n * 2.0)),
            other => Err(HostError(format!("cannot double a {}", other.type_name()))),
        });
    let mut interpreter = Interpreter::with_host(host);

    interpreter
        .run("print(double(answer))\nlet answer = 1\nprint(answer)")
        .unwrap();
    assert_eq!(String::from_utf8(output.take()).unwrap(), "84\n1\n");

    assert_eq!(
        interpreter.run("try double(\"x\")").unwrap_err(),
        Error::Host(HostError("cannot double a string".to_string()))
    );
}

#[test]
fn test_bindings_after_run() {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    interpreter
        .run("let b = 2\nlet a = 1\nconst result = a + b")
        .unwrap();
    assert_eq!(
        interpreter.bindings(),
        vec![
            ("a".to_string(), Value::Number(1.0)),
            ("b".to_string(), Value::Number(2.0)),
            ("result".to_string(), Value::Number(3.0)),
        ]
    );
}

#[test]
fn test_state_carries_across_runs() {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    interpreter.run("let total = 1").unwrap();
    interpreter.run("total += 41").unwrap();
    assert!(interpreter.run("missing").is_err());
    assert_eq!(
        interpreter.run("total").unwrap(),
        vec![Value::Number(42.0)]
    );
}

#[test]
fn test_call_from_host() {
    let mut interpreter = Interpreter::new(Rc::new(RefCell::new(Vec::new())));
    interpreter.run("let add = (a, b) => a + b").unwrap();
    let Some(Value::Function(add)) = interpreter.get("add") else {
        panic!("add should be a function");
    };
    assert_eq!(
        interpreter
            .call(&add, vec![Value::Number(1.0), Value::Number(2.0)])
            .unwrap(),
        Value::Number(3.0)
    );
}
