use std::{cell::RefCell, fmt::Debug, path::Path, rc::Rc};

use crate::error::HostError;

use super::{callable::Function, Value};

/// File access offered to scripts through `import file`.
pub trait FileSystem {
    fn read(&self, path: &str) -> Result<String, HostError>;
    fn write(&self, path: &str, contents: &str) -> Result<(), HostError>;
    fn append(&self, path: &str, contents: &str) -> Result<(), HostError>;
    fn remove(&self, path: &str) -> Result<(), HostError>;
    fn copy(&self, from: &str, to: &str) -> Result<(), HostError>;
    fn mkdir(&self, path: &str) -> Result<(), HostError>;
    fn rmdir(&self, path: &str) -> Result<(), HostError>;
    fn list(&self, path: &str) -> Result<Vec<String>, HostError>;
    fn exists(&self, path: &str) -> Result<bool, HostError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// Network access offered to scripts through `import fetch`.
pub trait Fetch {
    fn fetch(&self, request: Request) -> Result<Response, HostError>;
}

/// Nested closure calls allowed before a call fails, sized to stay well inside
/// a main thread's stack.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Capabilities and pre-defined bindings supplied by the embedding
/// application.
#[derive(Clone)]
pub struct Host {
    pub(super) stdout: Rc<RefCell<dyn std::io::Write>>,
    pub(super) file_system: Option<Rc<dyn FileSystem>>,
    pub(super) fetch: Option<Rc<dyn Fetch>>,
    pub(super) globals: Vec<(String, Value)>,
    pub(super) max_call_depth: usize,
}

impl Default for Host {
    fn default() -> Self {
        Self {
            stdout: Rc::new(RefCell::new(std::io::stdout())),
            file_system: None,
            fetch: None,
            globals: Vec::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("file_system", &self.file_system.is_some())
            .field("fetch", &self.fetch.is_some())
            .field("max_call_depth", &self.max_call_depth)
            .field(
                "globals",
                &self.globals.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stdout(mut self, stdout: Rc<RefCell<dyn std::io::Write>>) -> Self {
        self.stdout = stdout;
        self
    }

    pub fn with_file_system(mut self, file_system: Rc<dyn FileSystem>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    pub fn with_fetch(mut self, fetch: Rc<dyn Fetch>) -> Self {
        self.fetch = Some(fetch);
        self
    }

    /// Sets how deeply closures may call each other. Embedders running on a
    /// larger stack can allow more.
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    /// Pre-defines `name` as a constant visible to every program.
    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.globals.push((name.to_string(), value));
        self
    }

    /// Pre-defines a host function. Its failures abort evaluation as host
    /// errors and cannot be caught with `try`.
    pub fn with_function(
        self,
        name: &str,
        arity: usize,
        f: impl Fn(Vec<Value>) -> Result<Value, HostError> + 'static,
    ) -> Self {
        let function = Function::builtin(name, arity, move |_, arguments| Ok(f(arguments)?));
        self.with_value(name, Value::function(function))
    }
}

/// The process's own file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {
    fn read(&self, path: &str) -> Result<String, HostError> {
        Ok(std::fs::read_to_string(path)?)
    }

    fn write(&self, path: &str, contents: &str) -> Result<(), HostError> {
        Ok(std::fs::write(path, contents)?)
    }

    fn append(&self, path: &str, contents: &str) -> Result<(), HostError> {
        use std::io::Write;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(file.write_all(contents.as_bytes())?)
    }

    fn remove(&self, path: &str) -> Result<(), HostError> {
        Ok(std::fs::remove_file(path)?)
    }

    fn copy(&self, from: &str, to: &str) -> Result<(), HostError> {
        std::fs::copy(from, to)?;
        Ok(())
    }

    fn mkdir(&self, path: &str) -> Result<(), HostError> {
        Ok(std::fs::create_dir_all(path)?)
    }

    fn rmdir(&self, path: &str) -> Result<(), HostError> {
        Ok(std::fs::remove_dir_all(path)?)
    }

    fn list(&self, path: &str) -> Result<Vec<String>, HostError> {
        let mut names = std::fs::read_dir(path)?
            .map(|entry| Ok(entry?.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, std::io::Error>>()?;
        names.sort();
        Ok(names)
    }

    fn exists(&self, path: &str) -> Result<bool, HostError> {
        Ok(Path::new(path).exists())
    }
}

/// Blocking HTTP through `ureq`. Error statuses are returned as responses.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFetch;

impl Fetch for HttpFetch {
    fn fetch(&self, request: Request) -> Result<Response, HostError> {
        let mut call = ureq::request(&request.method, &request.url);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(error) => return Err(HostError(error.to_string())),
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();
        let body = response.into_string()?;

        Ok(Response {
            status,
            body,
            headers,
        })
    }
}
