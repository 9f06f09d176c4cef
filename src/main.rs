use std::{io::Write, rc::Rc, sync::Once};

use bang::{
    tree_walk_interpreter::{Host, HttpFetch, NativeFileSystem, Value},
    Error, Interpreter,
};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Withhold file system access from scripts
    #[arg(long, global = true)]
    no_fs: bool,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Repl)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a script file
    Run(FileArgs),
    /// Print the token stream of a script file
    Tokens(FileArgs),
    Repl,
}

#[derive(Debug, Args)]
struct FileArgs {
    file: String,
}

static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();
    let args = Cli::parse();

    let succeeded = match args.command() {
        Command::Repl => {
            repl_command(&args);
            true
        }
        Command::Run(file) => run_command(&args, file),
        Command::Tokens(file) => tokens_command(file),
    };

    if !succeeded {
        std::process::exit(1);
    }
}

fn interpreter(args: &Cli) -> Interpreter {
    let mut host = Host::new().with_fetch(Rc::new(HttpFetch));
    if !args.no_fs {
        host = host.with_file_system(Rc::new(NativeFileSystem));
    }
    Interpreter::with_host(host)
}

fn read_source(file: &str) -> Option<String> {
    match std::fs::read_to_string(file) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Could not read {file}: {e}");
            None
        }
    }
}

fn report(error: &Error) {
    match error {
        Error::Language(error) => eprintln!("{}", error.context(2)),
        Error::Host(error) => eprintln!("Host error: {error}"),
    }
}

fn run_command(args: &Cli, file: &FileArgs) -> bool {
    let Some(source) = read_source(&file.file) else {
        return false;
    };

    match interpreter(args).run(&source) {
        Ok(_) => true,
        Err(e) => {
            report(&e);
            false
        }
    }
}

fn tokens_command(file: &FileArgs) -> bool {
    let Some(source) = read_source(&file.file) else {
        return false;
    };

    let tokens = match bang::tokenizer::tokens(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}", e.with_source(&source).context(2));
            return false;
        }
    };

    let mut line = 0;
    for token in tokens {
        if token.line != line {
            print!("{:4} ", token.line);
            line = token.line;
        } else {
            print!("   | ");
        }
        println!("{:<16} {}", format!("{:?}", token.kind), token.text);
    }
    true
}

fn repl_command(args: &Cli) {
    println!("Welcome to the Bang REPL!");
    println!("EOF to exit. (Ctrl+D on *nix, Ctrl+Z on Windows)");

    let mut interpreter = interpreter(args);

    loop {
        let Some(source) = read_entry() else {
            break;
        };
        if source.trim().is_empty() {
            continue;
        }

        match interpreter.run(&source) {
            Ok(results) => {
                for result in results.iter().filter(|value| **value != Value::Null) {
                    println!("{result}");
                }
            }
            Err(e) => report(&e),
        }
    }
}

/// Reads one entry. An entry whose line opens a block keeps reading indented
/// lines until a blank line.
fn read_entry() -> Option<String> {
    let mut source = String::new();
    let mut prompt = "> ";

    loop {
        print!("{prompt}");
        if std::io::stdout().flush().is_err() {
            return None;
        }

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => return (!source.is_empty()).then_some(source),
            Ok(_) => {}
        }

        let finished = line.trim().is_empty() || (source.is_empty() && !opens_block(&line));
        source.push_str(&line);
        if finished {
            return Some(source);
        }
        prompt = ". ";
    }
}

fn opens_block(line: &str) -> bool {
    let line = line.trim_end();
    line.ends_with("=>") || line.ends_with("else") || {
        let start = line.trim_start();
        (start.starts_with("if") || start.starts_with("while")) && line.ends_with(')')
    }
}
