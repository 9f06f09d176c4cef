use std::rc::Rc;

use crate::{
    error::Error,
    tree_walk_interpreter::{callable::Function, host::FileSystem, Value},
};

use super::entry;

type Operation = fn(&dyn FileSystem, &[Value]) -> Result<Value, Error>;

/// The `file` module over whichever file system the host supplied. Failures
/// of the file system itself surface as host errors.
pub fn module(file_system: Rc<dyn FileSystem>) -> Value {
    let function = |name: &str, arity: usize, f: Operation| {
        let file_system = file_system.clone();
        entry(
            name,
            Function::builtin(name, arity, move |_, arguments| {
                f(file_system.as_ref(), &arguments)
            }),
        )
    };

    Value::frozen_dictionary([
        function("read", 1, |fs, arguments| {
            Ok(Value::String(fs.read(arguments[0].as_str()?)?))
        }),
        function("write", 2, |fs, arguments| {
            fs.write(arguments[0].as_str()?, arguments[1].as_str()?)?;
            Ok(Value::Null)
        }),
        function("append", 2, |fs, arguments| {
            fs.append(arguments[0].as_str()?, arguments[1].as_str()?)?;
            Ok(Value::Null)
        }),
        function("remove", 1, |fs, arguments| {
            fs.remove(arguments[0].as_str()?)?;
            Ok(Value::Null)
        }),
        function("copy", 2, |fs, arguments| {
            fs.copy(arguments[0].as_str()?, arguments[1].as_str()?)?;
            Ok(Value::Null)
        }),
        function("mkdir", 1, |fs, arguments| {
            fs.mkdir(arguments[0].as_str()?)?;
            Ok(Value::Null)
        }),
        function("rmdir", 1, |fs, arguments| {
            fs.rmdir(arguments[0].as_str()?)?;
            Ok(Value::Null)
        }),
        function("list", 1, |fs, arguments| {
            let names = fs.list(arguments[0].as_str()?)?;
            Ok(Value::list(names.into_iter().map(Value::String).collect()))
        }),
        function("exists", 1, |fs, arguments| {
            Ok(Value::Boolean(fs.exists(arguments[0].as_str()?)?))
        }),
    ])
}
