pub mod ast;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod tree_walk_interpreter;

pub use error::{Error, LanguageError};
pub use tree_walk_interpreter::Interpreter;
